//! Zero-based board coordinates.

use serde::{Deserialize, Serialize};

/// A cell on the board, `x` is the column and `y` the row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("({x}, {y})")]
pub struct Coord {
    /// Column, starting at 0.
    pub x: u32,
    /// Row, starting at 0.
    pub y: u32,
}

impl Coord {
    /// Creates a coordinate.
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Walks `steps` cells along `(dx, dy)`.
    ///
    /// Returns `None` when the walk leaves the non-negative quadrant. Upper
    /// bounds are the board's concern.
    pub fn offset(self, dx: i64, dy: i64, steps: u32) -> Option<Self> {
        let steps = i64::from(steps);
        let x = i64::from(self.x).checked_add(dx.checked_mul(steps)?)?;
        let y = i64::from(self.y).checked_add(dy.checked_mul(steps)?)?;
        Some(Self {
            x: u32::try_from(x).ok()?,
            y: u32::try_from(y).ok()?,
        })
    }
}
