//! The engine behind the game loop and its time-boxed decision making

use log::{debug, info, warn};

use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::bitboard::{BitBoard, Layout, Outcome, Player};
use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::evaluation::Evaluator;
use crate::search::{is_proven, CancelToken, RootProgress, Searcher};

/// The operations a game loop needs from a playing engine
pub trait GameLogic {
    /// Drops a piece for the player
    ///
    /// # Panics
    /// Panics if the column is out of range or full
    fn play(&mut self, column: usize, player: Player);

    fn outcome(&self) -> Outcome;

    /// Chooses a column for the side to move within the time budget
    fn choose_move(&mut self, budget: Duration) -> Result<usize, EngineError>;
}

/// How the column of a decision was obtained
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// The empty board is answered with the centre column
    Opening,
    /// The deepest completed pass
    Completed,
    /// The best root column of a pass cut short by the deadline
    Partial,
    /// No pass got far enough, the first legal column was taken
    Fallback,
}

/// Diagnostics of a decision
#[derive(Copy, Clone, Debug)]
pub struct SearchReport {
    pub column: usize,
    pub decision: Decision,
    /// Value of the deepest completed pass
    pub value: Option<i32>,
    /// Cutoff of the deepest completed pass
    pub cutoff: Option<usize>,
    /// The remaining number of moves in the game, the deepest useful cutoff
    pub max_cutoff: usize,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    /// Checks whether no deeper pass could have changed the decision
    pub fn is_exhaustive(&self) -> bool {
        match (self.cutoff, self.value) {
            (Some(cutoff), Some(value)) => cutoff >= self.max_cutoff || is_proven(value),
            _ => false,
        }
    }
}

enum Message {
    // a pass finished at the given cutoff
    Completed {
        cutoff: usize,
        column: usize,
        value: i32,
        nodes: u64,
    },
    // no deeper pass can change the result
    Finished,
}

// everything the search worker takes with it
struct Job {
    layout: Layout,
    evaluator: Evaluator,
    max: u64,
    min: u64,
    max_moves_first: bool,
    start_cutoff: usize,
    max_cutoff: usize,
    cutoff_step: usize,
    cache_size: usize,
}

impl Job {
    // iterative deepening: passes at growing cutoffs until cancelled or nothing is left to learn
    fn run(self, cancel: CancelToken, progress: Arc<RootProgress>, tx: Sender<Message>) -> u64 {
        let mut searcher = Searcher::new(self.layout, self.evaluator, self.max_moves_first, cancel.clone())
            .with_cache_capacity(self.cache_size)
            .with_root_progress(progress);

        let mut cutoff = self.start_cutoff.min(self.max_cutoff);
        while !cancel.is_cancelled() {
            let (value, column) = match searcher.search(self.max, self.min, cutoff) {
                Some(result) => result,
                // interrupted, the pass is abandoned
                None => break,
            };
            let message = Message::Completed {
                cutoff,
                column,
                value,
                nodes: searcher.node_count,
            };
            if tx.send(message).is_err() {
                break;
            }
            if cutoff >= self.max_cutoff || is_proven(value) {
                let _ = tx.send(Message::Finished);
                break;
            }
            cutoff = (cutoff + self.cutoff_step).min(self.max_cutoff);
        }
        searcher.node_count
    }
}

/// A game session: the board, the engine's settings and what it learnt from the last decision
///
/// # Notes
/// Every decision runs on a fresh worker thread with a fresh move order
/// cache. The calling thread waits for the worker's results until the
/// deadline, then cancels the worker and plays the column of the deepest
/// completed pass.
pub struct Engine {
    board: BitBoard,
    config: EngineConfig,
    last_cutoff: Option<usize>,
    last_report: Option<SearchReport>,
}

impl Engine {
    /// Starts a session on an empty `width` x `height` board
    pub fn new(
        width: usize,
        height: usize,
        first_player: Player,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_board(BitBoard::new(width, height, first_player)?, config))
    }

    /// Starts a session on an existing position
    pub fn from_board(board: BitBoard, config: EngineConfig) -> Self {
        Self {
            board,
            config,
            last_cutoff: None,
            last_report: None,
        }
    }

    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Diagnostics of the latest decision
    pub fn last_report(&self) -> Option<&SearchReport> {
        self.last_report.as_ref()
    }

    pub fn play_checked(&mut self, column: usize, player: Player) -> Result<(), EngineError> {
        self.board.play_checked(column, player)
    }

    // the centre column if it is free, otherwise the leftmost free column
    fn fallback_column(&self) -> usize {
        let layout = self.board.layout();
        if self.board.playable(layout.center()) {
            layout.center()
        } else {
            self.board.actions().first_valid().unwrap_or_else(|| layout.center())
        }
    }

    fn decide(&mut self, budget: Duration) -> SearchReport {
        let start = Instant::now();
        let deadline = start
            .checked_add(budget)
            .unwrap_or_else(|| start + Duration::from_secs(u32::MAX as u64));
        let layout = *self.board.layout();
        let max_cutoff = layout.width() * layout.height() - self.board.num_moves();

        if self.config.open_in_center && self.board.is_empty() {
            return SearchReport {
                column: layout.center(),
                decision: Decision::Opening,
                value: None,
                cutoff: None,
                max_cutoff,
                nodes: 0,
                elapsed: start.elapsed(),
            };
        }

        let side = self.board.side_to_move();
        let job = Job {
            layout,
            evaluator: Evaluator::new(layout, self.config.heuristic),
            max: self.board.plane(side),
            min: self.board.plane(side.other()),
            max_moves_first: side == self.board.first_player(),
            start_cutoff: self.config.start_cutoff(self.last_cutoff),
            max_cutoff,
            cutoff_step: self.config.cutoff_step.max(1),
            cache_size: self.config.move_cache_size,
        };
        debug!(
            "searching for {:?} with {:?} from cutoff {} (at most {})",
            side,
            job.evaluator.heuristic(),
            job.start_cutoff,
            max_cutoff
        );

        let cancel = CancelToken::new();
        let progress = Arc::new(RootProgress::new());
        let (tx, rx) = channel();
        let worker = {
            let cancel = cancel.clone();
            let progress = progress.clone();
            thread::spawn(move || job.run(cancel, progress, tx))
        };

        // (cutoff, column, value) of the deepest completed pass
        let mut completed: Option<(usize, usize, i32)> = None;
        let mut nodes = 0;
        let on_completed = |completed: &mut Option<(usize, usize, i32)>, message: Message| {
            if let Message::Completed {
                cutoff,
                column,
                value,
                nodes,
            } = message
            {
                debug!(
                    "cutoff {} complete: column {}, value {}, {} nodes after {:?}",
                    cutoff,
                    column,
                    value,
                    nodes,
                    start.elapsed()
                );
                *completed = Some((cutoff, column, value));
            }
        };

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(Message::Finished) => {
                    // hold a finished result until the safety wait is over
                    let release = start
                        .checked_add(self.config.min_wait)
                        .map_or(deadline, |release| release.min(deadline));
                    let now = Instant::now();
                    if release > now {
                        thread::sleep(release - now);
                    }
                    break;
                }
                Ok(message) => on_completed(&mut completed, message),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        cancel.cancel();
        match worker.join() {
            Ok(count) => nodes = count,
            Err(_) => warn!("search worker panicked, using the results it published"),
        }
        // passes that completed while the worker was being stopped still count
        for message in rx.try_iter() {
            on_completed(&mut completed, message);
        }

        let (column, decision) = match (completed, progress.load()) {
            (Some((_, column, _)), _) => (column, Decision::Completed),
            (None, Some(column)) => {
                warn!("no pass completed in {:?}, playing the best column found so far", budget);
                (column, Decision::Partial)
            }
            (None, None) => {
                warn!("no column searched in {:?}, falling back to a legal column", budget);
                (self.fallback_column(), Decision::Fallback)
            }
        };

        let report = SearchReport {
            column,
            decision,
            value: completed.map(|(_, _, value)| value),
            cutoff: completed.map(|(cutoff, _, _)| cutoff),
            max_cutoff,
            nodes,
            elapsed: start.elapsed(),
        };
        if let Some(cutoff) = report.cutoff {
            self.last_cutoff = Some(cutoff);
        }
        info!(
            "{:?} plays column {} ({:?}, cutoff {:?}/{}, {} nodes, {:?})",
            side, report.column, report.decision, report.cutoff, max_cutoff, report.nodes, report.elapsed
        );
        report
    }
}

impl GameLogic for Engine {
    fn play(&mut self, column: usize, player: Player) {
        self.board.play(column, player);
    }

    fn outcome(&self) -> Outcome {
        self.board.outcome()
    }

    fn choose_move(&mut self, budget: Duration) -> Result<usize, EngineError> {
        let outcome = self.board.outcome();
        if outcome.is_finished() {
            return Err(EngineError::GameFinished(outcome));
        }
        let report = self.decide(budget);
        self.last_report = Some(report);
        Ok(report.column)
    }
}
