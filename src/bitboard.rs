use anyhow::{anyhow, Result};

use crate::error::{ConfigError, EngineError};
use crate::{MAX_BITS, MAX_WIDTH};

// bitmask corresponds to board as follows in 7x6 case:
//  6 13 20 27 34 41 48  <- sentinel (top)
//  5 12 19 26 33 40 47
//  4 11 18 25 32 39 46
//  3 10 17 24 31 38 45
//  2  9 16 23 30 37 44
//  1  8 15 22 29 36 43
//  0  7 14 21 28 35 42  <- bottom

/// One of the two sides of the game
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

/// State of a game, recomputed from the bit planes on demand
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Player1Wins,
    Player2Wins,
    Tie,
    InProgress,
}

impl Outcome {
    pub fn is_finished(self) -> bool {
        self != Outcome::InProgress
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            Outcome::Player1Wins => Some(Player::One),
            Outcome::Player2Wins => Some(Player::Two),
            _ => None,
        }
    }
}

// 64-bit safe version of `(1 << bits) - 1`
const fn low_bits(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

// shifts by at least the register width clear the plane instead of overflowing
pub(crate) fn shr(plane: u64, shift: usize) -> u64 {
    plane.checked_shr(shift as u32).unwrap_or(0)
}

pub(crate) fn shl(plane: u64, shift: usize) -> u64 {
    plane.checked_shl(shift as u32).unwrap_or(0)
}

/// Board dimensions and the masks derived from them
///
/// Every column takes `height + 1` bits: the playable rows plus one sentinel
/// bit on top, so that carries out of a full column stop at the sentinel
/// instead of spilling into the neighbouring column.
#[derive(Copy, Clone, Debug)]
pub struct Layout {
    width: usize,
    height: usize,
    all1: u64,
    col1: u64,
    bottom: u64,
    top: u64,
    odd: u64,
    even: u64,
    line_counts: [u8; MAX_BITS],
}

impl Layout {
    pub fn new(width: usize, height: usize) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        match height.checked_add(1).and_then(|height1| width.checked_mul(height1)) {
            Some(bits) if bits <= MAX_BITS => {}
            _ => return Err(ConfigError::BoardTooLarge { width, height }),
        }
        debug_assert!(width <= MAX_WIDTH);

        let height1 = height + 1;
        let all1 = low_bits(width * height1);
        let col1 = low_bits(height1);
        // one bit at the bottom of every column
        let bottom = all1 / col1;
        let top = bottom << height;

        // rows are counted from 1 at the bottom, so row index 0 is an odd row
        let mut odd = 0;
        let mut even = 0;
        for row in 0..height {
            if row % 2 == 0 {
                odd |= bottom << row;
            } else {
                even |= bottom << row;
            }
        }

        let mut layout = Self {
            width,
            height,
            all1,
            col1,
            bottom,
            top,
            odd,
            even,
            line_counts: [0; MAX_BITS],
        };
        layout.line_counts = layout.count_lines();
        Ok(layout)
    }

    // number of four-in-a-row windows passing through each cell
    fn count_lines(&self) -> [u8; MAX_BITS] {
        let mut counts = [0u8; MAX_BITS];
        let (width, height) = (self.width as isize, self.height as isize);

        for &(dc, dr) in &[(1isize, 0isize), (0, 1), (1, 1), (1, -1)] {
            for column in 0..width {
                for row in 0..height {
                    let (end_column, end_row) = (column + 3 * dc, row + 3 * dr);
                    if end_column >= width || end_row < 0 || end_row >= height {
                        continue;
                    }
                    for i in 0..4 {
                        let bit = self.bit_index((column + i * dc) as usize, (row + i * dr) as usize);
                        counts[bit] += 1;
                    }
                }
            }
        }
        counts
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// All playable and sentinel bits
    pub fn all1(&self) -> u64 {
        self.all1
    }

    /// One full column (playable rows and sentinel) at column 0
    pub fn col1(&self) -> u64 {
        self.col1
    }

    pub fn bottom(&self) -> u64 {
        self.bottom
    }

    /// The sentinel bit of every column
    pub fn top(&self) -> u64 {
        self.top
    }

    pub fn odd(&self) -> u64 {
        self.odd
    }

    pub fn even(&self) -> u64 {
        self.even
    }

    /// Every playable cell
    pub fn playable(&self) -> u64 {
        self.all1 ^ self.top
    }

    pub fn center(&self) -> usize {
        self.width / 2
    }

    /// Shifts along the four line directions: diagonal \, horizontal, diagonal /, vertical
    pub fn directions(&self) -> [usize; 4] {
        [self.height, self.height + 1, self.height + 2, 1]
    }

    pub fn bit_index(&self, column: usize, row: usize) -> usize {
        column * (self.height + 1) + row
    }

    pub fn cell(&self, column: usize, row: usize) -> u64 {
        1 << self.bit_index(column, row)
    }

    pub fn column_mask(&self, column: usize) -> u64 {
        self.col1 << (column * (self.height + 1))
    }

    pub fn bottom_mask(&self, column: usize) -> u64 {
        1 << (column * (self.height + 1))
    }

    pub fn column_of(&self, action: u64) -> usize {
        action.trailing_zeros() as usize / (self.height + 1)
    }

    /// The next-piece bit of every column for the given occupancy
    pub fn actions(&self, common: u64) -> Actions {
        let spots = common + self.bottom;
        let mut moves = [0; MAX_WIDTH];
        for (column, action) in moves.iter_mut().enumerate().take(self.width) {
            *action = spots & self.column_mask(column);
        }
        Actions {
            moves,
            width: self.width,
            top: self.top,
        }
    }

    pub fn is_valid(&self, action: u64) -> bool {
        action & self.top == 0
    }

    pub fn is_tie(&self, common: u64) -> bool {
        (common | self.top) == self.all1
    }

    /// Checks whether a plane contains four connected pieces in any direction
    pub fn has_four_connected(&self, plane: u64) -> bool {
        self.directions().iter().any(|&shift| {
            // mark all runs of 2
            let m = plane & shr(plane, shift);
            // check for runs of 2 * (runs of 2)
            m & shr(m, 2 * shift) != 0
        })
    }

    /// Empty playable cells that would complete four for the plane
    pub fn winning_cells(&self, plane: u64, common: u64) -> u64 {
        // vertical
        // find the top ends of 3-alignments
        let mut r = (plane << 1) & (plane << 2) & (plane << 3);

        for &shift in &self.directions()[..3] {
            let mut p = shl(plane, shift) & shl(plane, 2 * shift);
            // find the upper ends of 3-alignments
            r |= p & shl(plane, 3 * shift);
            // find holes of the type ...O O _ O...
            r |= p & shr(plane, shift);

            p = shr(plane, shift) & shr(plane, 2 * shift);
            // find the lower ends of 3-alignments
            r |= p & shr(plane, 3 * shift);
            // find holes of the type ...O _ O O...
            r |= p & shl(plane, shift);
        }

        r & (self.playable() ^ common)
    }

    pub fn line_counts(&self) -> &[u8] {
        &self.line_counts[..self.width * (self.height + 1)]
    }

    /// Sum of the line counts of every piece in the plane
    pub fn line_weight(&self, plane: u64) -> u32 {
        let mut plane = plane & self.playable();
        let mut weight = 0;
        while plane != 0 {
            weight += self.line_counts[plane.trailing_zeros() as usize] as u32;
            plane &= plane - 1;
        }
        weight
    }
}

/// The drop bit of every column of a position
#[derive(Copy, Clone, Debug)]
pub struct Actions {
    moves: [u64; MAX_WIDTH],
    width: usize,
    top: u64,
}

impl Actions {
    pub fn get(&self, column: usize) -> u64 {
        self.moves[column]
    }

    pub fn is_valid(&self, column: usize) -> bool {
        column < self.width && self.moves[column] & self.top == 0
    }

    /// Playable columns with their drop bits, left to right
    pub fn valid(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        (0..self.width).filter_map(move |column| {
            if self.is_valid(column) {
                Some((column, self.moves[column]))
            } else {
                None
            }
        })
    }

    pub fn first_valid(&self) -> Option<usize> {
        self.valid().next().map(|(column, _)| column)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BitBoard {
    layout: Layout,
    // mask of all tiles
    common: u64,
    // mask of each player's tiles
    players: [u64; 2],
    first_player: Player,
}

impl BitBoard {
    pub fn new(width: usize, height: usize, first_player: Player) -> Result<Self, ConfigError> {
        Ok(Self::with_layout(Layout::new(width, height)?, first_player))
    }

    pub fn with_layout(layout: Layout, first_player: Player) -> Self {
        Self {
            layout,
            common: 0,
            players: [0, 0],
            first_player,
        }
    }

    /// Builds a position from 1-based column digits, player one moving first
    pub fn from_moves<S: AsRef<str>>(layout: Layout, moves: S) -> Result<Self> {
        let mut board = Self::with_layout(layout, Player::One);

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column) if column >= 1 && column <= layout.width() => {
                    let column = column - 1;
                    if board.is_full(column) {
                        return Err(anyhow!("Invalid move, column {} full", column + 1));
                    }
                    // abort if the position is won at any point
                    if board.outcome().is_finished() {
                        return Err(anyhow!("Invalid position, game is over"));
                    }
                    board.play(column, board.side_to_move());
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(board)
    }

    pub fn from_planes(layout: Layout, player1: u64, player2: u64, first_player: Player) -> Self {
        debug_assert_eq!(player1 & player2, 0);
        Self {
            layout,
            common: player1 | player2,
            players: [player1, player2],
            first_player,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn common(&self) -> u64 {
        self.common
    }

    pub fn plane(&self, player: Player) -> u64 {
        self.players[player.index()]
    }

    pub fn first_player(&self) -> Player {
        self.first_player
    }

    pub fn num_moves(&self) -> usize {
        self.common.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.common == 0
    }

    pub fn side_to_move(&self) -> Player {
        if self.num_moves() % 2 == 0 {
            self.first_player
        } else {
            self.first_player.other()
        }
    }

    pub fn actions(&self) -> Actions {
        self.layout.actions(self.common)
    }

    /// The bit a piece dropped into the column would occupy
    pub fn drop_bit(&self, column: usize) -> u64 {
        (self.common + self.layout.bottom()) & self.layout.column_mask(column)
    }

    pub fn is_full(&self, column: usize) -> bool {
        // the top playable cell shifted onto the sentinel row
        (self.common << 1) & self.layout.top() & self.layout.column_mask(column) != 0
    }

    pub fn is_board_full(&self) -> bool {
        self.layout.is_tie(self.common)
    }

    pub fn playable(&self, column: usize) -> bool {
        column < self.layout.width() && !self.is_full(column)
    }

    /// Drops a piece for the player
    ///
    /// # Panics
    /// Panics if the column is out of range or full
    pub fn play(&mut self, column: usize, player: Player) {
        assert!(
            column < self.layout.width(),
            "column {} out of range",
            column
        );
        let action = self.drop_bit(column);
        assert!(self.layout.is_valid(action), "column {} is full", column);

        self.common |= action;
        self.players[player.index()] |= action;
    }

    pub fn play_checked(&mut self, column: usize, player: Player) -> Result<(), EngineError> {
        if column >= self.layout.width() {
            return Err(EngineError::ColumnOutOfRange {
                column,
                width: self.layout.width(),
            });
        }
        let outcome = self.outcome();
        if outcome.is_finished() {
            return Err(EngineError::GameFinished(outcome));
        }
        if self.is_full(column) {
            return Err(EngineError::ColumnFull(column));
        }
        self.play(column, player);
        Ok(())
    }

    /// Checks whether dropping a piece of the player into the column connects four
    pub fn is_winning_move(&self, column: usize, player: Player) -> bool {
        let action = self.drop_bit(column);
        self.layout.is_valid(action) && self.layout.has_four_connected(self.plane(player) | action)
    }

    pub fn outcome(&self) -> Outcome {
        if self.layout.has_four_connected(self.players[0]) {
            Outcome::Player1Wins
        } else if self.layout.has_four_connected(self.players[1]) {
            Outcome::Player2Wins
        } else if self.is_board_full() {
            Outcome::Tie
        } else {
            Outcome::InProgress
        }
    }
}
