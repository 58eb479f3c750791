//! A time-boxed decision engine for the board game 'Connect 4' and its
//! gravity-constrained variants on any board that fits a 64-bit register
//!
//! The engine runs an alpha-beta game tree search with iterative deepening
//! on a background worker, ordering moves with a heuristic evaluator and
//! returning the best move found before the deadline.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_engine::{Engine, EngineConfig, GameLogic, Player};
//! use std::time::Duration;
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let mut engine = Engine::new(7, 6, Player::One, EngineConfig::default())?;
//!
//! // an empty board is answered with the centre column without searching
//! assert_eq!(engine.choose_move(Duration::from_millis(100))?, 3);
//!
//! engine.play(3, Player::One);
//! let column = engine.choose_move(Duration::from_millis(100))?;
//! assert!(column < 7);
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod config;

pub mod bitboard;

pub mod evaluation;

pub mod move_cache;

pub mod move_order;

pub mod search;

pub mod engine;


pub use bitboard::{BitBoard, Layout, Outcome, Player};
pub use config::{EngineConfig, Heuristic};
pub use engine::{Decision, Engine, GameLogic, SearchReport};
pub use error::{ConfigError, EngineError};

/// The default width of the game board in tiles
pub const DEFAULT_WIDTH: usize = 7;

/// The default height of the game board in tiles
pub const DEFAULT_HEIGHT: usize = 6;

/// Bits available in one bit plane, sentinel rows included
pub const MAX_BITS: usize = 64;

/// The widest possible board (one playable row and a sentinel per column)
pub const MAX_WIDTH: usize = MAX_BITS / 2;

// ensure that the default dimensions fit in a u64 for the bitboard representation
const_assert!(DEFAULT_WIDTH * (DEFAULT_HEIGHT + 1) <= MAX_BITS);

// the engine is handed to whichever thread runs the game loop
assert_impl_all!(engine::Engine: Send);
