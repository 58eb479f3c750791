//! Static scoring of positions and candidate moves
//!
//! Scores are built from pattern counts packed into disjoint bit ranges of a
//! single integer, so that a higher-order feature always outweighs any
//! combination of lower-order ones. Every count saturates at the width of
//! its field.

use crate::bitboard::{shl, shr, Layout};
use crate::config::Heuristic;

/// Every static evaluation lies strictly between `-EVAL_BOUND` and `EVAL_BOUND`
pub const EVAL_BOUND: i32 = 1 << 29;

/// Weight of a threat on the row parity that favours its owner
const GOOD_THREAT_WEIGHT: u32 = 2;

// one feature's slot in a packed score
#[derive(Copy, Clone, Debug)]
struct Field {
    shift: u32,
    bits: u32,
}

impl Field {
    const fn new(shift: u32, bits: u32) -> Self {
        Self { shift, bits }
    }

    const fn unused() -> Self {
        Self { shift: 0, bits: 0 }
    }

    fn pack(self, count: u32) -> i32 {
        if self.bits == 0 {
            return 0;
        }
        let max = (1 << self.bits) - 1;
        (count.min(max) << self.shift) as i32
    }
}

// packing of the horizon evaluation of one side, lowest order first
#[derive(Copy, Clone, Debug)]
struct Weights {
    position: Field,
    pairs: Field,
    free_ended_pairs: Field,
    double_free_ended_pairs: Field,
    trebles: Field,
    free_ended_trebles: Field,
    trebles_with_holes: Field,
    threats: Field,
}

impl Weights {
    fn for_heuristic(heuristic: Heuristic) -> Self {
        let patterns = Self {
            position: Field::new(0, 5),
            pairs: Field::new(5, 4),
            free_ended_pairs: Field::new(9, 4),
            double_free_ended_pairs: Field::new(13, 3),
            trebles: Field::new(16, 3),
            free_ended_trebles: Field::new(19, 3),
            trebles_with_holes: Field::new(22, 3),
            threats: Field::unused(),
        };
        match heuristic {
            Heuristic::Threats => Self {
                threats: Field::new(25, 4),
                ..patterns
            },
            Heuristic::Patterns => patterns,
            // neither packs fields
            Heuristic::Windows | Heuristic::Blind => Self {
                position: Field::unused(),
                pairs: Field::unused(),
                free_ended_pairs: Field::unused(),
                double_free_ended_pairs: Field::unused(),
                trebles: Field::unused(),
                free_ended_trebles: Field::unused(),
                trebles_with_holes: Field::unused(),
                threats: Field::unused(),
            },
        }
    }
}

// packing of the move-ordering score of a candidate move
const MOVE_COLUMN: Field = Field::new(0, 4);
const MOVE_PAIRS: Field = Field::new(4, 4);
const MOVE_FREE_ENDED_PAIRS: Field = Field::new(8, 4);
const MOVE_TREBLES: Field = Field::new(12, 3);
const MOVE_FREE_ENDED_TREBLES: Field = Field::new(15, 3);
const MOVE_THREATS: Field = Field::new(18, 3);
const MOVE_BLOCKS: Field = Field::new(21, 2);
const MOVE_WINS: Field = Field::new(23, 2);

// cells not claimed by the opponent and not a sentinel
fn free_cells(layout: &Layout, opponent: u64) -> u64 {
    layout.all1() ^ (opponent | layout.top())
}

/// Adjacent pairs along every direction
pub fn pairs(layout: &Layout, plane: u64) -> u32 {
    layout
        .directions()
        .iter()
        .map(|&shift| (plane & shr(plane, shift)).count_ones())
        .sum()
}

/// Three in a line along every direction
pub fn trebles(layout: &Layout, plane: u64) -> u32 {
    layout
        .directions()
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            (a & shr(a, shift)).count_ones()
        })
        .sum()
}

/// Four in a line along every direction
pub fn quads(layout: &Layout, plane: u64) -> u32 {
    layout
        .directions()
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            (a & shr(a, 2 * shift)).count_ones()
        })
        .sum()
}

/// Pairs with a free cell beyond either end
///
/// Vertical pairs only count their upper end, the cell below a pair is never
/// playable.
pub fn free_ended_pairs(layout: &Layout, plane: u64, opponent: u64) -> u32 {
    let free = free_cells(layout, opponent);
    let directions = layout.directions();

    let above: u32 = directions
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            (a & shr(free, 2 * shift)).count_ones()
        })
        .sum();
    let below: u32 = directions[..3]
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            (free & shr(a, shift)).count_ones()
        })
        .sum();
    above + below
}

/// Non-vertical pairs with free cells beyond both ends
pub fn double_free_ended_pairs(layout: &Layout, plane: u64, opponent: u64) -> u32 {
    let free = free_cells(layout, opponent);
    layout.directions()[..3]
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            (a & shr(free, 2 * shift) & shl(free, shift)).count_ones()
        })
        .sum()
}

/// Trebles with a free cell beyond either end
pub fn free_ended_trebles(layout: &Layout, plane: u64, opponent: u64) -> u32 {
    let free = free_cells(layout, opponent);
    let directions = layout.directions();

    let trebles_along = |shift: usize| {
        let a = plane & shr(plane, shift);
        a & shr(a, shift)
    };
    let above: u32 = directions
        .iter()
        .map(|&shift| (trebles_along(shift) & shr(free, 3 * shift)).count_ones())
        .sum();
    let below: u32 = directions[..3]
        .iter()
        .map(|&shift| (free & shr(trebles_along(shift), shift)).count_ones())
        .sum();
    above + below
}

/// Non-vertical patterns `XX_X` and `X_XX` whose hole is empty
pub fn trebles_with_holes(layout: &Layout, plane: u64, opponent: u64) -> u32 {
    let empty = layout.playable() & !(plane | opponent);
    layout.directions()[..3]
        .iter()
        .map(|&shift| {
            let a = plane & shr(plane, shift);
            let left = a & shr(empty, 2 * shift) & shr(plane, 3 * shift);
            let right = plane & shr(empty, shift) & shr(a, 2 * shift);
            left.count_ones() + right.count_ones()
        })
        .sum()
}

/// Distance of a column from the nearest edge
pub fn centrality(layout: &Layout, column: usize) -> u32 {
    column.min(layout.width() - 1 - column) as u32
}

/// Threat cells of the plane weighted by row parity
///
/// The first player profits from threats on odd rows (counted from 1 at the
/// bottom), the second player from threats on even rows.
pub fn threat_parity(layout: &Layout, plane: u64, common: u64, moves_first: bool) -> u32 {
    let threats = layout.winning_cells(plane, common);
    let (good_rows, other_rows) = if moves_first {
        (layout.odd(), layout.even())
    } else {
        (layout.even(), layout.odd())
    };
    GOOD_THREAT_WEIGHT * (threats & good_rows).count_ones() + (threats & other_rows).count_ones()
}

// value of a window holding `own` pieces of one side and none of the other,
// by how many of its empty cells are playable right now
fn window_value(own: u32, reachable: u32) -> u32 {
    match (own, reachable) {
        (1, 3) => 300,
        (1, 2) => 200,
        (1, 1) => 100,
        (1, 0) => 50,
        (2, 2) => 500,
        (2, 1) => 400,
        (2, 0) => 200,
        (3, 1) => 800,
        (3, 0) => 600,
        _ => 0,
    }
}

/// Sum of the window values of every four-cell window the plane holds alone
pub fn window_score(layout: &Layout, plane: u64, opponent: u64) -> u32 {
    let playable = layout.playable();
    let common = plane | opponent;
    // the cells the next piece of each column would take
    let reachable = (common + layout.bottom()) & playable;

    let mut score = 0;
    for &shift in layout.directions().iter() {
        // lowest cell of every window lying fully on the board
        let mut starts = playable & shr(playable, shift) & shr(playable, 2 * shift) & shr(playable, 3 * shift);
        while starts != 0 {
            let start = starts & starts.wrapping_neg();
            starts &= starts - 1;

            let window = start | shl(start, shift) | shl(start, 2 * shift) | shl(start, 3 * shift);
            if window & opponent != 0 {
                continue;
            }
            let own = (window & plane).count_ones();
            score += window_value(own, (window & reachable).count_ones());
        }
    }
    score
}

#[derive(Copy, Clone, Debug)]
pub struct Evaluator {
    layout: Layout,
    heuristic: Heuristic,
    weights: Weights,
}

impl Evaluator {
    pub fn new(layout: Layout, heuristic: Heuristic) -> Self {
        Self {
            layout,
            heuristic,
            weights: Weights::for_heuristic(heuristic),
        }
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    /// Scores a non-terminal position for `this` against `that`
    ///
    /// The result is antisymmetric in the two sides and bounded by [`EVAL_BOUND`].
    pub fn evaluate(&self, this: u64, that: u64, this_moves_first: bool) -> i32 {
        match self.heuristic {
            Heuristic::Blind => return 0,
            Heuristic::Windows => {
                let layout = &self.layout;
                return window_score(layout, this, that) as i32 - window_score(layout, that, this) as i32;
            }
            Heuristic::Threats | Heuristic::Patterns => {}
        }
        self.side_score(this, that, this_moves_first) - self.side_score(that, this, !this_moves_first)
    }

    fn side_score(&self, plane: u64, opponent: u64, moves_first: bool) -> i32 {
        let layout = &self.layout;
        let weights = &self.weights;

        let mut score = weights.position.pack(layout.line_weight(plane) >> 3)
            + weights.pairs.pack(pairs(layout, plane))
            + weights.free_ended_pairs.pack(free_ended_pairs(layout, plane, opponent))
            + weights
                .double_free_ended_pairs
                .pack(double_free_ended_pairs(layout, plane, opponent))
            + weights.trebles.pack(trebles(layout, plane))
            + weights.free_ended_trebles.pack(free_ended_trebles(layout, plane, opponent))
            + weights.trebles_with_holes.pack(trebles_with_holes(layout, plane, opponent));
        if self.heuristic == Heuristic::Threats {
            score += weights
                .threats
                .pack(threat_parity(layout, plane, plane | opponent, moves_first));
        }
        score
    }

    /// Scores dropping `action` into `column` for `this`, higher is more promising
    pub fn move_score(&self, this: u64, that: u64, action: u64, column: usize) -> i32 {
        let layout = &self.layout;
        let next_this = this | action;
        let next_that = that | action;

        // check for four connected and for blocking four connected
        MOVE_WINS.pack(quads(layout, next_this))
            + MOVE_BLOCKS.pack(quads(layout, next_that))
            // open ends of 3-alignments
            + MOVE_THREATS.pack(layout.winning_cells(next_this, next_this | that).count_ones())
            + MOVE_FREE_ENDED_TREBLES.pack(free_ended_trebles(layout, next_this, that))
            + MOVE_TREBLES.pack(trebles(layout, next_this))
            + MOVE_FREE_ENDED_PAIRS.pack(free_ended_pairs(layout, next_this, that))
            + MOVE_PAIRS.pack(pairs(layout, next_this))
            + MOVE_COLUMN.pack(centrality(layout, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitboard::{BitBoard, Player};
    use anyhow::Result;

    fn standard() -> Layout {
        Layout::new(7, 6).unwrap()
    }

    #[test]
    fn counts_simple_patterns() {
        let layout = standard();
        let pair = layout.cell(0, 0) | layout.cell(1, 0);
        assert_eq!(pairs(&layout, pair), 1);
        assert_eq!(trebles(&layout, pair), 0);

        let stack = layout.cell(3, 0) | layout.cell(3, 1) | layout.cell(3, 2);
        assert_eq!(pairs(&layout, stack), 2);
        assert_eq!(trebles(&layout, stack), 1);
        assert_eq!(quads(&layout, stack), 0);
        assert_eq!(quads(&layout, stack | layout.cell(3, 3)), 1);
    }

    #[test]
    fn free_ends_respect_opponent() {
        let layout = standard();
        let stack = layout.cell(3, 0) | layout.cell(3, 1) | layout.cell(3, 2);
        assert_eq!(free_ended_trebles(&layout, stack, 0), 1);
        assert_eq!(free_ended_trebles(&layout, stack, layout.cell(3, 3)), 0);

        // a horizontal pair in the middle of the bottom row is open on both sides
        let pair = layout.cell(2, 0) | layout.cell(3, 0);
        assert_eq!(double_free_ended_pairs(&layout, pair, 0), 1);
        assert_eq!(double_free_ended_pairs(&layout, pair, layout.cell(1, 0)), 0);
        assert_eq!(free_ended_pairs(&layout, pair, layout.cell(1, 0)), 1);
    }

    #[test]
    fn hole_patterns() {
        let layout = standard();
        let plane = layout.cell(0, 0) | layout.cell(1, 0) | layout.cell(3, 0);
        assert_eq!(trebles_with_holes(&layout, plane, 0), 1);
        assert_eq!(trebles_with_holes(&layout, plane, layout.cell(2, 0)), 0);

        let mirrored = layout.cell(3, 0) | layout.cell(5, 0) | layout.cell(6, 0);
        assert_eq!(trebles_with_holes(&layout, mirrored, 0), 1);
    }

    #[test]
    fn centrality_peaks_in_the_middle() {
        let layout = standard();
        let scores: Vec<u32> = (0..7).map(|x| centrality(&layout, x)).collect();
        assert_eq!(scores, vec![0, 1, 2, 3, 2, 1, 0]);
    }

    #[test]
    fn threats_weighted_by_parity() {
        let layout = standard();
        // three on the bottom row threaten (3, 0), an odd row
        let plane = layout.cell(0, 0) | layout.cell(1, 0) | layout.cell(2, 0);
        assert_eq!(threat_parity(&layout, plane, plane, true), 2);
        assert_eq!(threat_parity(&layout, plane, plane, false), 1);

        // three on the second row threaten (3, 1), an even row
        let plane = layout.cell(0, 1) | layout.cell(1, 1) | layout.cell(2, 1);
        let common = plane | layout.bottom() & (layout.column_mask(0) | layout.column_mask(1) | layout.column_mask(2));
        assert_eq!(threat_parity(&layout, plane, common, true), 1);
        assert_eq!(threat_parity(&layout, plane, common, false), 2);
    }

    #[test]
    fn evaluation_is_antisymmetric_and_bounded() -> Result<()> {
        let layout = standard();
        for heuristic in &[Heuristic::Threats, Heuristic::Patterns, Heuristic::Windows] {
            let evaluator = Evaluator::new(layout, *heuristic);
            assert_eq!(evaluator.heuristic(), *heuristic);
            for moves in &["4", "4453", "332211", "44444455", "1234567123456712345"] {
                let board = BitBoard::from_moves(layout, moves)?;
                let (one, two) = (board.plane(Player::One), board.plane(Player::Two));
                let score = evaluator.evaluate(one, two, true);
                assert_eq!(score, -evaluator.evaluate(two, one, false));
                assert!(score.abs() < EVAL_BOUND);
            }
        }
        Ok(())
    }

    #[test]
    fn saturated_fields_stay_in_range() {
        let layout = standard();
        let evaluator = Evaluator::new(layout, Heuristic::Threats);
        // every playable cell for one side is the most any side can score
        let score = evaluator.evaluate(layout.playable(), 0, true);
        assert!(score > 0 && score < EVAL_BOUND);
    }

    #[test]
    fn windows_count_reachable_cells() -> Result<()> {
        // a single row holds exactly one window
        let layout = Layout::new(4, 1)?;
        let pair = layout.cell(0, 0) | layout.cell(1, 0);
        assert_eq!(window_score(&layout, pair, 0), 500);
        assert_eq!(window_score(&layout, pair, layout.cell(3, 0)), 0);
        assert_eq!(window_score(&layout, layout.cell(3, 0), pair), 0);

        // a single column: the top cell of the window is not playable yet
        let layout = Layout::new(1, 4)?;
        let pair = layout.cell(0, 0) | layout.cell(0, 1);
        assert_eq!(window_score(&layout, pair, 0), 400);
        let treble = pair | layout.cell(0, 2);
        assert_eq!(window_score(&layout, treble, 0), 800);

        let evaluator = Evaluator::new(layout, Heuristic::Windows);
        assert_eq!(evaluator.evaluate(treble, 0, true), 800);
        assert_eq!(evaluator.evaluate(0, treble, true), -800);
        Ok(())
    }

    #[test]
    fn windows_favour_the_centre() -> Result<()> {
        let layout = standard();
        let evaluator = Evaluator::new(layout, Heuristic::Windows);
        let centre = evaluator.evaluate(layout.cell(3, 0), 0, true);
        let edge = evaluator.evaluate(layout.cell(0, 0), 0, true);
        assert!(centre > edge && edge > 0);
        Ok(())
    }

    #[test]
    fn blind_heuristic_scores_zero() -> Result<()> {
        let layout = standard();
        let evaluator = Evaluator::new(layout, Heuristic::Blind);
        let board = BitBoard::from_moves(layout, "445566")?;
        assert_eq!(
            evaluator.evaluate(board.plane(Player::One), board.plane(Player::Two), true),
            0
        );
        Ok(())
    }

    #[test]
    fn threats_outweigh_patterns() -> Result<()> {
        let layout = standard();
        let evaluator = Evaluator::new(layout, Heuristic::Threats);
        let patterns = Evaluator::new(layout, Heuristic::Patterns);
        let board = BitBoard::from_moves(layout, "4455")?;
        let (one, two) = (board.plane(Player::One), board.plane(Player::Two));
        assert!(evaluator.evaluate(one, two, true) >= patterns.evaluate(one, two, true));
        Ok(())
    }

    #[test]
    fn move_score_prefers_centre_and_connections() -> Result<()> {
        let layout = standard();
        let evaluator = Evaluator::new(layout, Heuristic::Threats);
        let board = BitBoard::new(7, 6, Player::One)?;
        let actions = board.actions();
        let scores: Vec<i32> = (0..7)
            .map(|x| evaluator.move_score(0, 0, actions.get(x), x))
            .collect();
        assert_eq!(scores.iter().max(), Some(&scores[3]));
        assert_eq!(scores[0], scores[6]);

        // stacking on your own piece beats an isolated edge move
        let board = BitBoard::from_moves(layout, "47")?;
        let (one, two) = (board.plane(Player::One), board.plane(Player::Two));
        let actions = board.actions();
        assert!(
            evaluator.move_score(one, two, actions.get(3), 3)
                > evaluator.move_score(one, two, actions.get(0), 0)
        );
        Ok(())
    }
}
