//! SQLite persistence for players, matches and moves.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use repository::SqliteStore;
