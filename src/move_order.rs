//! Ranking of candidate columns at a search node

use crate::bitboard::Layout;
use crate::evaluation::Evaluator;
use crate::move_cache::MoveCache;
use crate::MAX_WIDTH;

/// An ordered list of columns to explore, best first
#[derive(Copy, Clone, Debug)]
pub struct ColumnOrder {
    columns: [u8; MAX_WIDTH],
    size: usize,
}

impl ColumnOrder {
    pub fn new() -> Self {
        Self {
            columns: [0; MAX_WIDTH],
            size: 0,
        }
    }

    pub fn single(column: usize) -> Self {
        let mut order = Self::new();
        order.push(column);
        order
    }

    pub fn push(&mut self, column: usize) {
        self.columns[self.size] = column as u8;
        self.size += 1;
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns[..self.size].iter().map(|&column| column as usize)
    }
}

impl Default for ColumnOrder {
    fn default() -> Self {
        Self::new()
    }
}

/// Orders moves so that alpha-beta sees the most promising branches first
///
/// Immediate wins and forced blocks are returned as single-column orders,
/// everything else is ranked by the evaluator's move score.
pub struct MoveOrderer {
    layout: Layout,
    evaluator: Evaluator,
    cache: MoveCache,
}

impl MoveOrderer {
    pub fn new(layout: Layout, evaluator: Evaluator) -> Self {
        Self::with_cache(layout, evaluator, MoveCache::new())
    }

    pub fn with_cache(layout: Layout, evaluator: Evaluator, cache: MoveCache) -> Self {
        Self {
            layout,
            evaluator,
            cache,
        }
    }

    pub fn cache(&self) -> &MoveCache {
        &self.cache
    }

    /// Returns the columns to explore for `this`, the side to move
    pub fn priority_order(&mut self, this: u64, that: u64, common: u64) -> ColumnOrder {
        if let Some(order) = self.cache.get(this, that) {
            return order;
        }
        let order = self.compute_order(this, that, common);
        self.cache.set(this, that, order);
        order
    }

    fn compute_order(&self, this: u64, that: u64, common: u64) -> ColumnOrder {
        let actions = self.layout.actions(common);

        let mut block = None;
        for (column, action) in actions.valid() {
            // take the win
            if self.layout.has_four_connected(this | action) {
                return ColumnOrder::single(column);
            }
            if block.is_none() && self.layout.has_four_connected(that | action) {
                block = Some(column);
            }
        }
        if let Some(column) = block {
            return ColumnOrder::single(column);
        }

        let mut scores = [None; MAX_WIDTH];
        for (column, action) in actions.valid() {
            scores[column] = Some(self.evaluator.move_score(this, that, action, column));
        }

        // selection sort: every pass takes the best remaining column, leftmost on ties
        let mut order = ColumnOrder::new();
        loop {
            let mut best: Option<(usize, i32)> = None;
            for (column, score) in scores.iter().enumerate().take(self.layout.width()) {
                if let Some(score) = *score {
                    if best.map_or(true, |(_, max)| score > max) {
                        best = Some((column, score));
                    }
                }
            }
            match best {
                Some((column, _)) => {
                    scores[column] = None;
                    order.push(column);
                }
                None => break,
            }
        }
        order
    }
}
