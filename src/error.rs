use crate::bitboard::Outcome;
use crate::MAX_BITS;

/// Errors raised while setting up a board layout.
///
/// A layout that fails to build must not be used; there is no partially
/// initialised engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("board dimensions must be non-zero (got {width}x{height})")]
    ZeroDimension { width: usize, height: usize },

    #[error("board {width}x{height} does not fit in {} bits with sentinel rows", MAX_BITS)]
    BoardTooLarge { width: usize, height: usize },
}

/// Contract violations detected by the checked entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("column {column} is out of range (board has {width} columns)")]
    ColumnOutOfRange { column: usize, width: usize },

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("the game is already over ({0:?})")]
    GameFinished(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::BoardTooLarge {
            width: 9,
            height: 7,
        };
        assert_eq!(
            err.to_string(),
            "board 9x7 does not fit in 64 bits with sentinel rows"
        );
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::ColumnOutOfRange {
            column: 8,
            width: 7,
        };
        assert_eq!(
            err.to_string(),
            "column 8 is out of range (board has 7 columns)"
        );
        assert_eq!(
            EngineError::GameFinished(Outcome::Tie).to_string(),
            "the game is already over (Tie)"
        );
    }
}
