//! Conversion of diesel failures into store errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::{StoreError, UniqueConstraint};

/// Maps a SQLite `UNIQUE constraint failed: <columns>` message onto the
/// constraint it names.
pub(crate) fn classify_unique(message: &str) -> Option<UniqueConstraint> {
    let columns = message.split_once("UNIQUE constraint failed:")?.1;
    if columns.contains("moves.client_move_id") {
        Some(UniqueConstraint::MoveClientId)
    } else if columns.contains("moves.sequence") {
        Some(UniqueConstraint::MoveSequence)
    } else if columns.contains("moves.x") && columns.contains("moves.y") {
        Some(UniqueConstraint::MoveCell)
    } else if columns.contains("players.username") {
        Some(UniqueConstraint::PlayerUsername)
    } else {
        None
    }
}

impl From<DieselError> for StoreError {
    #[track_caller]
    fn from(err: DieselError) -> Self {
        if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err {
            if let Some(constraint) = classify_unique(info.message()) {
                return Self::unique(constraint, info.message().to_string());
            }
        }
        Self::backend(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for StoreError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::backend(format!("Connection error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_move_constraints() {
        assert_eq!(
            classify_unique("UNIQUE constraint failed: moves.match_id, moves.client_move_id"),
            Some(UniqueConstraint::MoveClientId)
        );
        assert_eq!(
            classify_unique("UNIQUE constraint failed: moves.match_id, moves.x, moves.y"),
            Some(UniqueConstraint::MoveCell)
        );
        assert_eq!(
            classify_unique("UNIQUE constraint failed: moves.match_id, moves.sequence"),
            Some(UniqueConstraint::MoveSequence)
        );
        assert_eq!(
            classify_unique("UNIQUE constraint failed: players.username"),
            Some(UniqueConstraint::PlayerUsername)
        );
    }

    #[test]
    fn test_classify_other_messages() {
        assert_eq!(classify_unique("UNIQUE constraint failed: moves.id"), None);
        assert_eq!(classify_unique("FOREIGN KEY constraint failed"), None);
    }
}
