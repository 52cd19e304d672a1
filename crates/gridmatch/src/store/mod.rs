//! Collaborator ports: the player directory and the match store.
//!
//! The services hold these as `Arc<dyn ..>` so any backend can be swapped in.
//! A backend must enforce the move uniqueness constraints itself and report
//! violations as [`StoreErrorKind::UniqueViolation`]; the adjudicator relies
//! on that signal to resolve concurrent submissions.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use derive_more::{Display, Error};

use crate::{
    Match, MatchId, MatchProgress, MatchQuery, Move, MoveId, MoveQuery, Page, Participant,
    PlayerId,
};

/// Uniqueness constraints the store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UniqueConstraint {
    /// One move per cell: `(match_id, x, y)`.
    #[display("moves(match_id, x, y)")]
    MoveCell,
    /// One move per idempotency token: `(match_id, client_move_id)`.
    #[display("moves(match_id, client_move_id)")]
    MoveClientId,
    /// One move per sequence number: `(match_id, sequence)`.
    #[display("moves(match_id, sequence)")]
    MoveSequence,
    /// Usernames are unique.
    #[display("players(username)")]
    PlayerUsername,
}

/// Category of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StoreErrorKind {
    /// A write hit a uniqueness constraint.
    #[display("unique violation on {_0}")]
    UniqueViolation(UniqueConstraint),
    /// Connection, query or data failure.
    #[display("backend failure")]
    Backend,
}

/// Store error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Store error ({}): {} at {}:{}", kind, message, file, line)]
pub struct StoreError {
    /// Error category.
    pub kind: StoreErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl StoreError {
    /// Creates a new store error with caller location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Connection, query or data failure.
    #[track_caller]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Backend, message)
    }

    /// Uniqueness violation.
    #[track_caller]
    pub fn unique(constraint: UniqueConstraint, message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::UniqueViolation(constraint), message)
    }

    /// The violated constraint, if this is a uniqueness failure.
    pub fn violated(&self) -> Option<UniqueConstraint> {
        match self.kind {
            StoreErrorKind::UniqueViolation(constraint) => Some(constraint),
            StoreErrorKind::Backend => None,
        }
    }
}

/// Identity lookup for participants.
#[async_trait]
pub trait PlayerDirectory: Send + Sync + std::fmt::Debug {
    /// Resolves a participant, `None` if unknown.
    async fn resolve(&self, id: PlayerId) -> Result<Option<Participant>, StoreError>;
}

/// Durable storage for matches and moves.
///
/// Writes are linearizable per match: `commit_move` either inserts the move
/// and applies the match progress together, or fails before the match is
/// touched.
#[async_trait]
pub trait MatchStore: Send + Sync + std::fmt::Debug {
    /// Persists a newly created match.
    async fn insert_match(&self, created: &Match) -> Result<(), StoreError>;

    /// Loads a match with its moves ordered by sequence.
    async fn find_match(&self, id: MatchId) -> Result<Option<Match>, StoreError>;

    /// Filtered, sorted, paginated match listing.
    async fn search_matches(&self, query: &MatchQuery) -> Result<Page<Match>, StoreError>;

    /// Loads a single move.
    async fn find_move(&self, id: MoveId) -> Result<Option<Move>, StoreError>;

    /// Looks up a move by its idempotency token.
    async fn find_move_by_client_id(
        &self,
        match_id: MatchId,
        client_move_id: &str,
    ) -> Result<Option<Move>, StoreError>;

    /// Filtered, sorted, paginated move listing.
    async fn search_moves(&self, query: &MoveQuery) -> Result<Page<Move>, StoreError>;

    /// Atomically inserts `accepted` and applies `progress` to its match.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::UniqueViolation`] naming the constraint when
    /// the move collides with an existing one.
    async fn commit_move(&self, accepted: &Move, progress: &MatchProgress) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violated() {
        let err = StoreError::unique(UniqueConstraint::MoveCell, "taken");
        assert_eq!(err.violated(), Some(UniqueConstraint::MoveCell));
        assert_eq!(StoreError::backend("io").violated(), None);
    }

    #[test]
    fn test_display_names_constraint() {
        let err = StoreError::unique(UniqueConstraint::MoveClientId, "dup");
        assert!(err.to_string().contains("moves(match_id, client_move_id)"));
    }
}
