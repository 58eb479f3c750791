//! Tunables of the engine

use std::time::Duration;

use crate::move_cache::DEFAULT_CACHE_SIZE;

/// Which static evaluation the search uses at its horizon
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Heuristic {
    /// Parity-weighted threats on top of the line patterns
    Threats,
    /// Line patterns only
    Patterns,
    /// Every four-cell window scored by its own pieces and by how many of its
    /// empty cells can be played right now
    Windows,
    /// Every non-terminal position scores 0
    Blind,
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic::Threats
    }
}

#[derive(Copy, Clone, Debug)]
pub struct EngineConfig {
    pub heuristic: Heuristic,
    /// The shallowest depth cutoff a decision starts at
    pub min_cutoff: usize,
    /// Plies added to the cutoff after every completed pass
    pub cutoff_step: usize,
    /// How far below the previous decision's final cutoff the next one starts
    pub reuse_margin: usize,
    /// A finished search is not returned before this much time has passed
    pub min_wait: Duration,
    /// Answer an empty board with the centre column without searching
    pub open_in_center: bool,
    /// Slots in the move order cache of every decision
    pub move_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heuristic: Heuristic::default(),
            min_cutoff: 2,
            cutoff_step: 2,
            reuse_margin: 2,
            min_wait: Duration::from_millis(0),
            open_in_center: true,
            move_cache_size: DEFAULT_CACHE_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_min_cutoff(mut self, min_cutoff: usize) -> Self {
        self.min_cutoff = min_cutoff.max(1);
        self
    }

    pub fn with_cutoff_step(mut self, cutoff_step: usize) -> Self {
        self.cutoff_step = cutoff_step.max(1);
        self
    }

    pub fn with_reuse_margin(mut self, reuse_margin: usize) -> Self {
        self.reuse_margin = reuse_margin;
        self
    }

    pub fn with_min_wait(mut self, min_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self
    }

    pub fn with_open_in_center(mut self, open_in_center: bool) -> Self {
        self.open_in_center = open_in_center;
        self
    }

    pub fn with_move_cache_size(mut self, move_cache_size: usize) -> Self {
        self.move_cache_size = move_cache_size.max(1);
        self
    }

    /// The cutoff the next decision starts at, given the previous decision's final cutoff
    pub fn start_cutoff(&self, last_cutoff: Option<usize>) -> usize {
        let min_cutoff = self.min_cutoff.max(1);
        match last_cutoff {
            Some(last) if last > min_cutoff + self.reuse_margin => {
                let start = last - self.reuse_margin;
                // stay on the schedule's parity so passes keep alternating full rounds
                let step = self.cutoff_step.max(1);
                start - (start - min_cutoff) % step
            }
            _ => min_cutoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_cutoff_schedule() {
        let config = EngineConfig::default();
        assert_eq!(config.start_cutoff(None), 2);
        assert_eq!(config.start_cutoff(Some(3)), 2);
        assert_eq!(config.start_cutoff(Some(10)), 8);
        assert_eq!(config.start_cutoff(Some(11)), 8);

        let config = config.with_min_cutoff(1).with_reuse_margin(0);
        assert_eq!(config.start_cutoff(Some(7)), 7);
    }
}
