//! 3x3 board with win-condition evaluation.
//!
//! The board is pure state plus deterministic evaluation. The only mutation
//! paths are [`Board::apply_mark`] (empty → marked, exactly once per cell)
//! and [`Board::clear`] (full match reset). Evaluation depends only on the
//! current contents, never on the order in which cells were marked.

use gridlock_proto::Mark;
use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const CELL_COUNT: usize = 9;

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
///
/// Evaluation scans these in this fixed order and returns the first
/// complete line.
const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// One cell of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cell {
    /// No mark yet.
    #[default]
    Empty,
    /// Marked by a player.
    Taken(Mark),
}

/// Result of evaluating the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A complete line of this mark exists.
    Winner(Mark),
    /// No complete line.
    NoWinner,
}

/// Errors from applying a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// Cell index outside `0..=8`.
    #[error("cell index out of range: {0}")]
    OutOfRange(u8),

    /// Target cell is already marked.
    #[error("cell {0} is already taken")]
    CellTaken(u8),
}

/// 3x3 grid state, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `mark` in `cell`.
    ///
    /// A cell transitions empty → marked exactly once; a second mark on the
    /// same cell is rejected, never overwritten.
    ///
    /// # Errors
    ///
    /// - [`BoardError::OutOfRange`] if `cell > 8`
    /// - [`BoardError::CellTaken`] if the cell is already marked
    pub fn apply_mark(&mut self, cell: u8, mark: Mark) -> Result<(), BoardError> {
        let slot = self.cells.get_mut(cell as usize).ok_or(BoardError::OutOfRange(cell))?;

        if *slot != Cell::Empty {
            return Err(BoardError::CellTaken(cell));
        }

        *slot = Cell::Taken(mark);
        Ok(())
    }

    /// Evaluate the board for a winner.
    ///
    /// Scans the 8 winning lines in fixed order and returns the first line
    /// whose three cells hold the same mark. Deterministic in the board
    /// contents alone: any move sequence producing the same configuration
    /// yields the same outcome.
    #[must_use]
    pub fn evaluate(&self) -> Outcome {
        for line in &WIN_LINES {
            if let Cell::Taken(mark) = self.cells[line[0]] {
                if self.cells[line[1]] == Cell::Taken(mark)
                    && self.cells[line[2]] == Cell::Taken(mark)
                {
                    return Outcome::Winner(mark);
                }
            }
        }
        Outcome::NoWinner
    }

    /// `true` iff no cell is empty.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| *c != Cell::Empty)
    }

    /// Cell contents. `None` if `cell` is out of range.
    #[must_use]
    pub fn cell(&self, cell: u8) -> Option<Cell> {
        self.cells.get(cell as usize).copied()
    }

    /// Reset every cell to empty. Only called on full match reset.
    pub fn clear(&mut self) {
        self.cells = [Cell::Empty; CELL_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_board_has_no_winner() {
        let board = Board::new();
        assert_eq!(board.evaluate(), Outcome::NoWinner);
        assert!(!board.is_full());
    }

    #[test]
    fn top_row_wins() {
        let mut board = Board::new();
        for cell in [0, 1, 2] {
            board.apply_mark(cell, Mark::X).unwrap();
        }
        assert_eq!(board.evaluate(), Outcome::Winner(Mark::X));
    }

    #[test]
    fn column_and_diagonal_win() {
        let mut board = Board::new();
        for cell in [1, 4, 7] {
            board.apply_mark(cell, Mark::O).unwrap();
        }
        assert_eq!(board.evaluate(), Outcome::Winner(Mark::O));

        let mut board = Board::new();
        for cell in [2, 4, 6] {
            board.apply_mark(cell, Mark::X).unwrap();
        }
        assert_eq!(board.evaluate(), Outcome::Winner(Mark::X));
    }

    #[test]
    fn out_of_range_rejected() {
        let mut board = Board::new();
        assert_eq!(board.apply_mark(9, Mark::X), Err(BoardError::OutOfRange(9)));
        assert_eq!(board.apply_mark(255, Mark::X), Err(BoardError::OutOfRange(255)));
    }

    #[test]
    fn taken_cell_never_changes() {
        let mut board = Board::new();
        board.apply_mark(4, Mark::X).unwrap();

        assert_eq!(board.apply_mark(4, Mark::O), Err(BoardError::CellTaken(4)));
        assert_eq!(board.apply_mark(4, Mark::X), Err(BoardError::CellTaken(4)));
        assert_eq!(board.cell(4), Some(Cell::Taken(Mark::X)));
    }

    #[test]
    fn full_board_without_line_is_draw() {
        // X O X / X O O / O X X - no complete line
        let mut board = Board::new();
        let marks = [
            Mark::X,
            Mark::O,
            Mark::X,
            Mark::X,
            Mark::O,
            Mark::O,
            Mark::O,
            Mark::X,
            Mark::X,
        ];
        for (cell, mark) in marks.into_iter().enumerate() {
            board.apply_mark(cell as u8, mark).unwrap();
        }
        assert!(board.is_full());
        assert_eq!(board.evaluate(), Outcome::NoWinner);
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut board = Board::new();
        board.apply_mark(0, Mark::X).unwrap();
        board.apply_mark(8, Mark::O).unwrap();

        board.clear();
        for cell in 0..9 {
            assert_eq!(board.cell(cell), Some(Cell::Empty));
        }
    }

    /// Strategy: a set of (cell, mark) placements with distinct cells.
    fn placements() -> impl Strategy<Value = Vec<(u8, Mark)>> {
        prop::collection::hash_map(0u8..9, prop::bool::ANY, 0..=9).prop_map(|map| {
            map.into_iter()
                .map(|(cell, x)| (cell, if x { Mark::X } else { Mark::O }))
                .collect()
        })
    }

    proptest! {
        /// Marking the same final configuration via any move order yields
        /// the same evaluation.
        #[test]
        fn evaluation_invariant_under_marking_order(
            mut moves in placements(),
            seed in any::<u64>(),
        ) {
            let mut ordered = Board::new();
            for (cell, mark) in &moves {
                ordered.apply_mark(*cell, *mark).unwrap();
            }

            // Deterministic shuffle from the seed
            let mut state = seed;
            for i in (1..moves.len()).rev() {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let j = (state >> 33) as usize % (i + 1);
                moves.swap(i, j);
            }

            let mut shuffled = Board::new();
            for (cell, mark) in &moves {
                shuffled.apply_mark(*cell, *mark).unwrap();
            }

            prop_assert_eq!(ordered.evaluate(), shuffled.evaluate());
            prop_assert_eq!(ordered.is_full(), shuffled.is_full());
        }

        /// A rejected mark never changes the board.
        #[test]
        fn rejected_mark_leaves_board_unchanged(
            cell in 0u8..9,
            bad_cell in 9u8..,
        ) {
            let mut board = Board::new();
            board.apply_mark(cell, Mark::X).unwrap();
            let before = board.clone();

            let _ = board.apply_mark(cell, Mark::O);
            let _ = board.apply_mark(bad_cell, Mark::O);

            prop_assert_eq!(board, before);
        }
    }
}
