//! Board-indexed occupancy for an N×N grid.

use crate::{Coord, Mark};
use derive_more::{Display, Error};
use tracing::instrument;

/// Largest accepted board dimension.
pub const MAX_BOARD_SIZE: u32 = 256;

/// Reasons a board cannot be built or a mark cannot be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum PlaceError {
    /// The board dimension exceeds [`MAX_BOARD_SIZE`].
    #[display("board size {size} exceeds the maximum of {}", MAX_BOARD_SIZE)]
    TooLarge {
        /// Requested dimension.
        size: u32,
    },
    /// The coordinate lies outside the board.
    #[display("{at} is outside a {size}x{size} board")]
    OutOfBounds {
        /// Rejected coordinate.
        at: Coord,
        /// Board dimension.
        size: u32,
    },
    /// The cell already holds a mark.
    #[display("{at} is already occupied by {mark}")]
    Occupied {
        /// Rejected coordinate.
        at: Coord,
        /// Mark already in the cell.
        mark: Mark,
    },
}

/// N×N board with one optional mark per cell.
///
/// Cells are stored row-major, so lookups are O(1) and the win detector can
/// scan lines without rescanning the move history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u32,
    cells: Vec<Option<Mark>>,
}

impl Board {
    /// Creates an empty board of `size`×`size` cells.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::TooLarge`] if `size` exceeds [`MAX_BOARD_SIZE`].
    pub fn new(size: u32) -> Result<Self, PlaceError> {
        if size > MAX_BOARD_SIZE {
            return Err(PlaceError::TooLarge { size });
        }
        let cells = (size as usize) * (size as usize);
        Ok(Self {
            size,
            cells: vec![None; cells],
        })
    }

    /// Builds a board from already recorded placements.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError`] if the size is too large, or a placement is off
    /// the board or lands on an occupied cell.
    #[instrument(skip(placements))]
    pub fn from_placements(
        size: u32,
        placements: impl IntoIterator<Item = (Coord, Mark)>,
    ) -> Result<Self, PlaceError> {
        let mut board = Self::new(size)?;
        for (at, mark) in placements {
            board.place(at, mark)?;
        }
        Ok(board)
    }

    /// Board dimension.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of cells on the board.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Converts signed input into a coordinate on this board.
    ///
    /// Returns `None` for negative values or values `>= size`.
    pub fn coord(&self, x: i64, y: i64) -> Option<Coord> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        let at = Coord::new(x, y);
        self.contains(at).then_some(at)
    }

    /// Whether the coordinate lies on the board.
    pub fn contains(&self, at: Coord) -> bool {
        at.x < self.size && at.y < self.size
    }

    /// Mark at the coordinate, `None` if empty or off the board.
    pub fn get(&self, at: Coord) -> Option<Mark> {
        self.index(at).and_then(|i| self.cells[i])
    }

    /// Whether the cell is on the board and free.
    pub fn is_free(&self, at: Coord) -> bool {
        self.index(at).is_some_and(|i| self.cells[i].is_none())
    }

    /// Places a mark.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::OutOfBounds`] or [`PlaceError::Occupied`].
    pub fn place(&mut self, at: Coord, mark: Mark) -> Result<(), PlaceError> {
        let i = self.index(at).ok_or(PlaceError::OutOfBounds {
            at,
            size: self.size,
        })?;
        if let Some(existing) = self.cells[i] {
            return Err(PlaceError::Occupied { at, mark: existing });
        }
        self.cells[i] = Some(mark);
        Ok(())
    }

    /// Formats the board as rows of `X`, `O` and `.`.
    pub fn display(&self) -> String {
        let size = self.size as usize;
        let mut result = String::with_capacity(self.cells.len() * 2);
        for (row, chunk) in self.cells.chunks(size.max(1)).enumerate() {
            for (col, cell) in chunk.iter().enumerate() {
                result.push(match cell {
                    Some(Mark::X) => 'X',
                    Some(Mark::O) => 'O',
                    None => '.',
                });
                if col + 1 < size {
                    result.push(' ');
                }
            }
            if row + 1 < size {
                result.push('\n');
            }
        }
        result
    }

    fn index(&self, at: Coord) -> Option<usize> {
        self.contains(at)
            .then(|| at.y as usize * self.size as usize + at.x as usize)
    }
}
