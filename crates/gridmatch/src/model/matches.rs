//! The match entity and its lifecycle state.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use gridmatch_rules::{Board, Mark, PlaceError};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{MatchId, Move, PlayerId};

/// Lifecycle state of a match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum MatchStatus {
    /// Moves are still accepted.
    InProgress,
    /// Won or drawn; no further moves.
    Finished,
}

/// One played game between two participants.
///
/// Side A plays [`Mark::X`] and side B plays [`Mark::O`]. `winner` is `None`
/// while in progress and for a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Match {
    id: MatchId,
    side_a: PlayerId,
    side_b: PlayerId,
    size: u32,
    win_length: u32,
    status: MatchStatus,
    current_turn: Mark,
    winner: Option<Mark>,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    moves: Vec<Move>,
}

impl Match {
    /// Starts a fresh match: in progress, X to move, no moves.
    #[instrument]
    pub fn start(
        side_a: PlayerId,
        side_b: PlayerId,
        size: u32,
        win_length: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::generate(),
            side_a,
            side_b,
            size,
            win_length,
            status: MatchStatus::InProgress,
            current_turn: Mark::X,
            winner: None,
            created_at,
            ended_at: None,
            moves: Vec::new(),
        }
    }

    /// Mark the participant plays in this match, if they take part.
    pub fn mark_of(&self, player: PlayerId) -> Option<Mark> {
        if player == self.side_a {
            Some(Mark::X)
        } else if player == self.side_b {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// Whether moves are no longer accepted.
    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    /// Builds the occupancy board from the recorded marks.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError`] if the stored moves overlap or leave the board.
    pub fn board(&self) -> Result<Board, PlaceError> {
        Board::from_placements(
            self.size,
            self.moves.iter().map(|m| (m.coord(), *m.mark())),
        )
    }

    /// Appends an accepted move and applies the state it produced.
    pub fn record(&mut self, accepted: Move, progress: &MatchProgress) {
        self.moves.push(accepted);
        self.current_turn = progress.current_turn;
        self.status = progress.status;
        self.winner = progress.winner;
        self.ended_at = progress.ended_at;
    }
}

/// Mutable match state written together with an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MatchProgress {
    match_id: MatchId,
    current_turn: Mark,
    status: MatchStatus,
    winner: Option<Mark>,
    ended_at: Option<DateTime<Utc>>,
}
