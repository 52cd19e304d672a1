//! Full-board detection.

use crate::Board;
use tracing::instrument;

/// Checks if every cell is occupied.
///
/// A full board with no winning run is a draw.
#[instrument(skip(board), fields(size = board.size()))]
pub fn is_full(board: &Board) -> bool {
    board.occupied() == board.capacity()
}
