//! Game rules for N×N boards.
//!
//! Pure functions over a [`Board`]. The win check only inspects lines through
//! the freshly placed cell, so callers run it once per accepted move.

pub mod draw;
pub mod win;

pub use draw::is_full;
pub use win::completes_run;

use crate::{Board, Coord, Mark};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// What a placement did to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Play continues.
    Continue,
    /// The mark completed a qualifying run.
    Won(Mark),
    /// The board filled up without a qualifying run.
    Draw,
}

/// Resolves the outcome of `mark` having just been placed at `at`.
///
/// The board must already contain the placement. A win takes precedence over
/// a full board.
#[instrument(skip(board), fields(size = board.size()))]
pub fn resolve(board: &Board, at: Coord, mark: Mark, win_length: u32) -> Outcome {
    if completes_run(board, at, mark, win_length) {
        Outcome::Won(mark)
    } else if is_full(board) {
        Outcome::Draw
    } else {
        Outcome::Continue
    }
}
