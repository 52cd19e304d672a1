//! Service error types.

use derive_more::{Display, Error};
use serde::Serialize;

use crate::StoreError;

/// Category of a failed service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum MatchErrorKind {
    /// Match, move or participant does not exist.
    NotFound,
    /// Request is malformed (self-play, out-of-bounds coordinates, bad paging).
    InvalidArgument,
    /// Participant is not part of the match.
    Forbidden,
    /// Request collides with current match state.
    Conflict,
    /// Storage or infrastructure failure.
    Unexpected,
}

/// Service error with kind and location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{}: {} at {}:{}", kind, message, file, line)]
pub struct MatchError {
    /// Error category.
    pub kind: MatchErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl MatchError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    pub fn new(kind: MatchErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Something the caller referenced does not exist.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::NotFound, message)
    }

    /// The request is malformed.
    #[track_caller]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::InvalidArgument, message)
    }

    /// The caller may not act on this match.
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::Forbidden, message)
    }

    /// The request conflicts with current state.
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::Conflict, message)
    }

    /// Infrastructure failure.
    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(MatchErrorKind::Unexpected, message)
    }

    /// Error category.
    pub fn kind(&self) -> MatchErrorKind {
        self.kind
    }
}

impl From<StoreError> for MatchError {
    #[track_caller]
    fn from(err: StoreError) -> Self {
        Self::unexpected(err.to_string())
    }
}
