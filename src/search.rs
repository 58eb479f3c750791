//! Depth-limited alpha-beta search over the game tree

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bitboard::Layout;
use crate::evaluation::Evaluator;
use crate::move_cache::MoveCache;
use crate::move_order::MoveOrderer;
use crate::MAX_BITS;

/// Utility of a position won by the maximising side at the root
///
/// Wins found deeper in the tree score less, see [`Searcher`].
pub const WIN: i32 = 1 << 30;
/// Utility of a position won by the minimising side at the root
pub const LOSS: i32 = -WIN;
/// Utility of a full board without four connected
pub const TIE: i32 = 0;

/// Checks whether a search value is a proven win or loss rather than an estimate
pub fn is_proven(value: i32) -> bool {
    value > WIN - MAX_BITS as i32 || value < LOSS + MAX_BITS as i32
}

/// Cooperative cancellation signal, checked at every search node
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Best root column of the pass in progress, written by the search worker only
#[derive(Debug)]
pub struct RootProgress(AtomicUsize);

impl RootProgress {
    const NONE: usize = usize::MAX;

    pub fn new() -> Self {
        Self(AtomicUsize::new(Self::NONE))
    }

    pub fn store(&self, column: usize) {
        self.0.store(column, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(Self::NONE, Ordering::Release);
    }

    pub fn load(&self) -> Option<usize> {
        match self.0.load(Ordering::Acquire) {
            Self::NONE => None,
            column => Some(column),
        }
    }
}

impl Default for RootProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimax searcher with alpha-beta pruning
///
/// # Notes
/// The maximising side is the side to move at the root. Values are taken from
/// its perspective: terminal positions score [`WIN`] minus the depth at which
/// they were reached, [`LOSS`] plus that depth, or [`TIE`]. The search
/// therefore prefers the quickest forced win and the slowest forced loss.
/// Below the depth cutoff positions are scored by the static [`Evaluator`],
/// whose values always lie strictly between the two utilities.
///
/// The move order cache lives as long as the `Searcher`, so one searcher
/// should serve exactly one decision.
pub struct Searcher {
    layout: Layout,
    evaluator: Evaluator,
    orderer: MoveOrderer,
    max_moves_first: bool,
    cancel: CancelToken,
    progress: Option<Arc<RootProgress>>,
    best_at_root: Option<(usize, i32)>,

    /// The number of nodes searched by this `Searcher` so far (for diagnostics only)
    pub node_count: u64,
}

impl Searcher {
    /// Creates a new `Searcher`; `max_moves_first` tells whether the maximising side opened the game
    pub fn new(layout: Layout, evaluator: Evaluator, max_moves_first: bool, cancel: CancelToken) -> Self {
        Self {
            layout,
            evaluator,
            orderer: MoveOrderer::new(layout, evaluator),
            max_moves_first,
            cancel,
            progress: None,
            best_at_root: None,
            node_count: 0,
        }
    }

    /// Replaces the move order cache with an empty one of `capacity` slots
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.orderer = MoveOrderer::with_cache(self.layout, self.evaluator, MoveCache::with_capacity(capacity));
        self
    }

    /// Publishes every improvement of the best root column to `progress`
    pub fn with_root_progress(mut self, progress: Arc<RootProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn orderer(&self) -> &MoveOrderer {
        &self.orderer
    }

    /// The best root column and value of the latest pass, complete or not
    pub fn best_at_root(&self) -> Option<(usize, i32)> {
        self.best_at_root
    }

    /// Runs one full pass from the root with the given depth cutoff
    ///
    /// Returns the value of the position and the best column, or `None` if
    /// the search was cancelled before the pass completed.
    pub fn search(&mut self, max: u64, min: u64, cutoff: usize) -> Option<(i32, usize)> {
        self.best_at_root = None;
        if let Some(progress) = &self.progress {
            progress.reset();
        }

        let value = self.max_value(max, min, max | min, i32::MIN, i32::MAX, 0, cutoff)?;
        let (column, _) = self.best_at_root?;
        Some((value, column))
    }

    // value of a finished game, `None` while it is still in progress
    fn utility(&self, max: u64, min: u64, common: u64, depth: usize) -> Option<i32> {
        if self.layout.has_four_connected(max) {
            Some(WIN - depth as i32)
        } else if self.layout.has_four_connected(min) {
            Some(LOSS + depth as i32)
        } else if self.layout.is_tie(common) {
            Some(TIE)
        } else {
            None
        }
    }

    fn record_root(&mut self, column: usize, value: i32) {
        self.best_at_root = Some((column, value));
        if let Some(progress) = &self.progress {
            progress.store(column);
        }
    }

    /// Value of a node where the maximising side is to move
    #[allow(clippy::too_many_arguments)]
    pub fn max_value(
        &mut self,
        max: u64,
        min: u64,
        common: u64,
        mut alpha: i32,
        beta: i32,
        depth: usize,
        cutoff: usize,
    ) -> Option<i32> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.node_count += 1;

        if let Some(utility) = self.utility(max, min, common, depth) {
            return Some(utility);
        }
        if depth >= cutoff {
            return Some(self.evaluator.evaluate(max, min, self.max_moves_first));
        }

        let actions = self.layout.actions(common);
        let order = self.orderer.priority_order(max, min, common);

        let mut v = i32::MIN;
        for column in order.iter() {
            let action = actions.get(column);
            let value = self.min_value(max | action, min, common | action, alpha, beta, depth + 1, cutoff)?;

            if value > v {
                v = value;
                if depth == 0 {
                    self.record_root(column, v);
                }
                // the minimising side will not allow this branch
                if v >= beta {
                    return Some(v);
                }
                alpha = alpha.max(v);
            }
        }
        Some(v)
    }

    /// Value of a node where the minimising side is to move
    #[allow(clippy::too_many_arguments)]
    pub fn min_value(
        &mut self,
        max: u64,
        min: u64,
        common: u64,
        alpha: i32,
        mut beta: i32,
        depth: usize,
        cutoff: usize,
    ) -> Option<i32> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.node_count += 1;

        if let Some(utility) = self.utility(max, min, common, depth) {
            return Some(utility);
        }
        if depth >= cutoff {
            return Some(self.evaluator.evaluate(max, min, self.max_moves_first));
        }

        let actions = self.layout.actions(common);
        let order = self.orderer.priority_order(min, max, common);

        let mut v = i32::MAX;
        for column in order.iter() {
            let action = actions.get(column);
            let value = self.max_value(max, min | action, common | action, alpha, beta, depth + 1, cutoff)?;

            if value < v {
                v = value;
                // the maximising side will not allow this branch
                if v <= alpha {
                    return Some(v);
                }
                beta = beta.min(v);
            }
        }
        Some(v)
    }
}
