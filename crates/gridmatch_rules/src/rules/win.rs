//! Win detection for runs of configurable length.

use crate::{Board, Coord, Mark};
use tracing::instrument;

/// Line directions: horizontal, vertical, and both diagonals.
const DIRECTIONS: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Checks whether `mark` at `at` completes a run of `win_length`.
///
/// For each direction the scan walks at most `win_length - 1` cells forward
/// and the same backward, stopping at the first cell not holding `mark`. The
/// placed cell counts as one regardless of what the board holds there. Stops
/// at the first qualifying direction.
#[instrument(skip(board), fields(size = board.size()))]
pub fn completes_run(board: &Board, at: Coord, mark: Mark, win_length: u32) -> bool {
    DIRECTIONS
        .iter()
        .any(|&(dx, dy)| run_length(board, at, mark, dx, dy, win_length) >= win_length)
}

/// Length of the run through `at` along `(dx, dy)`, capped per side.
fn run_length(board: &Board, at: Coord, mark: Mark, dx: i64, dy: i64, win_length: u32) -> u32 {
    1 + extent(board, at, mark, dx, dy, win_length) + extent(board, at, mark, -dx, -dy, win_length)
}

fn extent(board: &Board, at: Coord, mark: Mark, dx: i64, dy: i64, win_length: u32) -> u32 {
    let mut count = 0;
    for step in 1..win_length {
        match at.offset(dx, dy, step) {
            Some(cell) if board.get(cell) == Some(mark) => count += 1,
            _ => break,
        }
    }
    count
}
