//! Move submission: validation, idempotent replay, win/draw resolution and
//! fingerprinting.

use chrono::{DateTime, SubsecRound, Utc};
use derive_getters::Getters;
use derive_new::new;
use gridmatch_rules::{Board, Coord, Mark, Outcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    ChaosRule, Fingerprint, Match, MatchError, MatchErrorKind, MatchId, MatchProgress,
    MatchStatus, MatchStore, Move, MoveId, MoveQuery, Page, PlayerDirectory, PlayerId,
    StoreError, UniqueConstraint,
};

/// Longest accepted idempotency token, in characters.
pub const MAX_CLIENT_MOVE_ID_LEN: usize = 100;

/// A proposed move.
///
/// Coordinates are signed so negative input reaches the bounds check instead
/// of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MoveSubmission {
    match_id: MatchId,
    player_id: PlayerId,
    x: i64,
    y: i64,
    client_move_id: String,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct MoveReceipt {
    /// The accepted (or previously accepted) move.
    record: Move,
    /// Fingerprint of `record`.
    fingerprint: Fingerprint,
    /// Whether `record` already existed under the submitted token.
    replayed: bool,
}

impl MoveReceipt {
    fn fresh(record: Move) -> Self {
        let fingerprint = Fingerprint::of(&record);
        Self {
            record,
            fingerprint,
            replayed: false,
        }
    }

    fn replay(record: Move) -> Self {
        let fingerprint = Fingerprint::of(&record);
        Self {
            record,
            fingerprint,
            replayed: true,
        }
    }
}

/// Applies moves to matches.
///
/// Stateless between calls. Concurrent submissions are resolved by the
/// store's uniqueness constraints: the adjudicator attempts the write and
/// interprets the violation it gets back.
#[derive(Debug, Clone)]
pub struct MoveAdjudicator {
    players: Arc<dyn PlayerDirectory>,
    store: Arc<dyn MatchStore>,
    chaos: Arc<ChaosRule>,
}

impl MoveAdjudicator {
    /// Creates an adjudicator over the given collaborators.
    #[instrument(skip_all)]
    pub fn new(
        players: Arc<dyn PlayerDirectory>,
        store: Arc<dyn MatchStore>,
        chaos: Arc<ChaosRule>,
    ) -> Self {
        info!(
            chaos_period = chaos.period(),
            chaos_probability = chaos.probability(),
            "Creating MoveAdjudicator"
        );
        Self {
            players,
            store,
            chaos,
        }
    }

    /// Validates and records a move.
    ///
    /// A token that already names a move in this match returns that move,
    /// whatever the current match state.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown match or participant.
    /// - `InvalidArgument` for a bad token or out-of-bounds coordinates.
    /// - `Forbidden` if the participant is not a side of the match.
    /// - `Conflict` for a finished match, the wrong turn, an occupied cell, or
    ///   a lost race against a concurrent submission.
    /// - `Unexpected` if the store fails.
    #[instrument(
        skip(self, submission),
        fields(
            match_id = %submission.match_id(),
            player_id = %submission.player_id(),
            x = submission.x(),
            y = submission.y(),
            client_move_id = %submission.client_move_id(),
        )
    )]
    pub async fn submit_move(&self, submission: MoveSubmission) -> Result<MoveReceipt, MatchError> {
        let result = self.adjudicate(&submission).await;
        match &result {
            Ok(receipt) if receipt.replayed => {
                info!(move_id = %receipt.record.id(), "Replayed existing move")
            }
            Ok(receipt) => info!(
                move_id = %receipt.record.id(),
                sequence = receipt.record.sequence(),
                mark = %receipt.record.mark(),
                overridden = receipt.record.mark_overridden(),
                "Move accepted"
            ),
            Err(err) if err.kind() == MatchErrorKind::Unexpected => {
                warn!(error = %err, "Move submission failed")
            }
            Err(err) => warn!(kind = %err.kind(), reason = %err.message, "Move rejected"),
        }
        result
    }

    async fn adjudicate(&self, submission: &MoveSubmission) -> Result<MoveReceipt, MatchError> {
        let match_id = *submission.match_id();
        let token = submission.client_move_id().as_str();
        validate_token(token)?;

        let game = self
            .store
            .find_match(match_id)
            .await?
            .ok_or_else(|| MatchError::not_found(format!("Match {} not found", match_id)))?;

        if let Some(existing) = self.store.find_move_by_client_id(match_id, token).await? {
            debug!(move_id = %existing.id(), "Token already used in this match");
            return Ok(MoveReceipt::replay(existing));
        }

        if game.is_finished() {
            return Err(MatchError::conflict("Match already finished"));
        }

        let player_id = *submission.player_id();
        if self.players.resolve(player_id).await?.is_none() {
            return Err(MatchError::not_found(format!("Player {} not found", player_id)));
        }

        let acting = game
            .mark_of(player_id)
            .ok_or_else(|| MatchError::forbidden("Player is not part of this match"))?;

        if acting != *game.current_turn() {
            return Err(MatchError::conflict("Not your turn"));
        }

        let mut board = game
            .board()
            .map_err(|e| MatchError::unexpected(format!("Stored moves are inconsistent: {}", e)))?;

        let at = board
            .coord(*submission.x(), *submission.y())
            .ok_or_else(|| {
                MatchError::invalid_argument(format!(
                    "Coordinates ({}, {}) are out of bounds for a {}x{} board",
                    submission.x(),
                    submission.y(),
                    game.size(),
                    game.size()
                ))
            })?;

        if !board.is_free(at) {
            return Err(MatchError::conflict("Cell occupied"));
        }

        let sequence = u32::try_from(game.moves().len() + 1)
            .map_err(|_| MatchError::unexpected("Move sequence overflow"))?;
        let now = Utc::now().trunc_subsecs(6);
        let mut candidate = Move::new(
            MoveId::generate(),
            match_id,
            sequence,
            player_id,
            acting,
            at.x,
            at.y,
            now,
            token.to_string(),
            false,
        );
        if self.chaos.should_flip(sequence) {
            debug!(sequence, "Chaos rule overrides the mark");
            candidate.override_mark();
        }

        let progress = advance(&game, &mut board, at, *candidate.mark(), acting, now)?;

        match self.store.commit_move(&candidate, &progress).await {
            Ok(()) => {
                if *progress.status() == MatchStatus::Finished {
                    match progress.winner() {
                        Some(winner) => info!(%match_id, %winner, "Match won"),
                        None => info!(%match_id, "Match drawn"),
                    }
                }
                Ok(MoveReceipt::fresh(candidate))
            }
            Err(err) => self.recover(match_id, token, err).await,
        }
    }

    /// Interprets a failed commit.
    ///
    /// Any uniqueness violation may be a concurrent submission of the same
    /// token, so the token is looked up again before the violation is
    /// reported.
    async fn recover(
        &self,
        match_id: MatchId,
        token: &str,
        err: StoreError,
    ) -> Result<MoveReceipt, MatchError> {
        let Some(constraint) = err.violated() else {
            return Err(err.into());
        };
        debug!(%constraint, "Commit hit a uniqueness constraint");

        if let Some(existing) = self.store.find_move_by_client_id(match_id, token).await? {
            return Ok(MoveReceipt::replay(existing));
        }

        match constraint {
            UniqueConstraint::MoveCell => Err(MatchError::conflict("Cell occupied")),
            UniqueConstraint::MoveSequence => {
                Err(MatchError::conflict("Match state changed concurrently"))
            }
            UniqueConstraint::MoveClientId | UniqueConstraint::PlayerUsername => Err(
                MatchError::unexpected(format!("Unresolvable constraint violation: {}", err)),
            ),
        }
    }

    /// Loads a single move.
    ///
    /// # Errors
    ///
    /// `NotFound` if the move does not exist.
    #[instrument(skip(self))]
    pub async fn get_move(&self, id: MoveId) -> Result<Move, MatchError> {
        self.store
            .find_move(id)
            .await?
            .ok_or_else(|| MatchError::not_found(format!("Move {} not found", id)))
    }

    /// Filtered, sorted, paginated move listing.
    #[instrument(skip(self, query))]
    pub async fn search_moves(&self, query: &MoveQuery) -> Result<Page<Move>, MatchError> {
        debug!(filter = ?query.filter(), "Searching moves");
        Ok(self.store.search_moves(query).await?)
    }
}

#[track_caller]
fn validate_token(token: &str) -> Result<(), MatchError> {
    let len = token.chars().count();
    if token.trim().is_empty() || len > MAX_CLIENT_MOVE_ID_LEN {
        return Err(MatchError::invalid_argument(format!(
            "client_move_id must be 1 to {} characters, got {}",
            MAX_CLIENT_MOVE_ID_LEN, len
        )));
    }
    Ok(())
}

/// Places the recorded mark and computes the match state that follows.
///
/// The turn passes from the acting side regardless of which mark was
/// recorded; the win check uses the recorded mark.
fn advance(
    game: &Match,
    board: &mut Board,
    at: Coord,
    recorded: Mark,
    acting: Mark,
    now: DateTime<Utc>,
) -> Result<MatchProgress, MatchError> {
    board
        .place(at, recorded)
        .map_err(|e| MatchError::unexpected(format!("Board rejected a validated move: {}", e)))?;

    let next_turn = acting.opponent();
    let (status, winner, ended_at) =
        match gridmatch_rules::resolve(board, at, recorded, *game.win_length()) {
            Outcome::Won(mark) => (MatchStatus::Finished, Some(mark), Some(now)),
            Outcome::Draw => (MatchStatus::Finished, None, Some(now)),
            Outcome::Continue => (MatchStatus::InProgress, None, None),
        };
    Ok(MatchProgress::new(*game.id(), next_turn, status, winner, ended_at))
}
