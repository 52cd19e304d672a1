//! gridmatch - match lifecycle and move adjudication for N×N tic-tac-toe
//!
//! The crate validates submitted moves against match state, replays
//! idempotent resubmissions, resolves wins and draws, and fingerprints every
//! accepted move. Persistence sits behind two ports so the same services run
//! over SQLite or process memory.
//!
//! # Architecture
//!
//! - **Lifecycle**: creates matches and serves match reads
//! - **Adjudicator**: the move state machine, including the chaos rule
//! - **Store**: `PlayerDirectory` and `MatchStore` ports with SQLite and
//!   in-memory backends
//! - **Rules**: board, win and draw detection (re-exported from
//!   `gridmatch_rules`)
//!
//! # Example
//!
//! ```no_run
//! use gridmatch::{ChaosRule, InMemoryStore, MatchLifecycle, MoveAdjudicator, MoveSubmission};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let alice = store.register_player("alice")?;
//! let bob = store.register_player("bob")?;
//!
//! let lifecycle = MatchLifecycle::new(store.clone(), store.clone());
//! let adjudicator = MoveAdjudicator::new(store.clone(), store.clone(), Arc::new(ChaosRule::disabled()));
//!
//! let game = lifecycle.create_match(*alice.id(), *bob.id(), 3, 3).await?;
//! let receipt = adjudicator
//!     .submit_move(MoveSubmission::new(*game.id(), *alice.id(), 0, 0, "t1".to_string()))
//!     .await?;
//! println!("ETag: {}", receipt.fingerprint().etag());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod adjudicator;
mod chaos;
mod config;
mod db;
mod error;
mod fingerprint;
mod lifecycle;
mod model;
mod store;

// Crate-level exports - Errors
pub use error::{MatchError, MatchErrorKind};

// Crate-level exports - Domain model
pub use model::{
    MAX_PAGE_SIZE, Match, MatchFilter, MatchId, MatchProgress, MatchQuery, MatchSortField,
    MatchStatus, Move, MoveFilter, MoveId, MoveQuery, MoveSortField, Page, PageRequest,
    Participant, PlayerId, SortDirection, SortKey,
};

// Crate-level exports - Collaborator ports and backends
pub use db::SqliteStore;
pub use store::{
    InMemoryStore, MatchStore, PlayerDirectory, StoreError, StoreErrorKind, UniqueConstraint,
};

// Crate-level exports - Services
pub use adjudicator::{MAX_CLIENT_MOVE_ID_LEN, MoveAdjudicator, MoveReceipt, MoveSubmission};
pub use lifecycle::MatchLifecycle;

// Crate-level exports - Chaos rule and fingerprints
pub use chaos::{ChaosRule, DEFAULT_CHAOS_PERIOD, DEFAULT_CHAOS_PROBABILITY};
pub use fingerprint::Fingerprint;

// Crate-level exports - Configuration
pub use config::{BoardConfig, ChaosConfig, ConfigError, DATABASE_URL_ENV, GameConfig};

// Crate-level exports - Game rules
pub use gridmatch_rules::{Board, Coord, MAX_BOARD_SIZE, Mark, Outcome, PlaceError};
