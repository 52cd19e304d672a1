//! Pure board logic for gridmatch.
//!
//! This crate knows nothing about storage, players or time. It answers
//! three questions about an N×N board:
//!
//! - is a coordinate on the board, and is it free?
//! - does a freshly placed mark complete a run of the required length?
//! - is the board full?
//!
//! # Example
//!
//! ```
//! use gridmatch_rules::{Board, Coord, Mark, Outcome, resolve};
//!
//! let mut board = Board::new(3).unwrap();
//! board.place(Coord::new(0, 0), Mark::X).unwrap();
//! board.place(Coord::new(0, 1), Mark::X).unwrap();
//! board.place(Coord::new(0, 2), Mark::X).unwrap();
//!
//! assert_eq!(resolve(&board, Coord::new(0, 2), Mark::X, 3), Outcome::Won(Mark::X));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod coord;
mod mark;
pub mod rules;

pub use board::{Board, MAX_BOARD_SIZE, PlaceError};
pub use coord::Coord;
pub use mark::Mark;
pub use rules::{Outcome, completes_run, is_full, resolve};
