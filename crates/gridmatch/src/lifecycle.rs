//! Match creation and match reads.

use chrono::{SubsecRound, Utc};
use gridmatch_rules::MAX_BOARD_SIZE;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    Match, MatchError, MatchId, MatchQuery, MatchStore, Page, PlayerDirectory, PlayerId,
};

/// Creates matches and serves match reads.
///
/// Holds no match state of its own; everything lives in the store.
#[derive(Debug, Clone)]
pub struct MatchLifecycle {
    players: Arc<dyn PlayerDirectory>,
    store: Arc<dyn MatchStore>,
}

impl MatchLifecycle {
    /// Creates a lifecycle manager over the given collaborators.
    #[instrument(skip(players, store))]
    pub fn new(players: Arc<dyn PlayerDirectory>, store: Arc<dyn MatchStore>) -> Self {
        info!("Creating MatchLifecycle");
        Self { players, store }
    }

    /// Starts a match between two distinct participants.
    ///
    /// Side A plays X and moves first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either participant is unknown.
    /// - `InvalidArgument` for self-play or unusable board parameters.
    /// - `Unexpected` if the store fails.
    #[instrument(skip(self), fields(side_a = %side_a, side_b = %side_b))]
    pub async fn create_match(
        &self,
        side_a: PlayerId,
        side_b: PlayerId,
        size: u32,
        win_length: u32,
    ) -> Result<Match, MatchError> {
        debug!(size, win_length, "Creating match");

        if self.players.resolve(side_a).await?.is_none() {
            warn!("Side A not found");
            return Err(MatchError::not_found(format!("Player {} not found", side_a)));
        }
        if self.players.resolve(side_b).await?.is_none() {
            warn!("Side B not found");
            return Err(MatchError::not_found(format!("Player {} not found", side_b)));
        }
        if side_a == side_b {
            warn!("Self-play rejected");
            return Err(MatchError::invalid_argument(
                "A player cannot play against themselves",
            ));
        }
        validate_dimensions(size, win_length)?;

        let created = Match::start(side_a, side_b, size, win_length, Utc::now().trunc_subsecs(6));
        self.store.insert_match(&created).await?;
        info!(match_id = %created.id(), size, win_length, "Match created");
        Ok(created)
    }

    /// Loads a match with its moves.
    ///
    /// # Errors
    ///
    /// `NotFound` if the match does not exist.
    #[instrument(skip(self))]
    pub async fn get_match(&self, id: MatchId) -> Result<Match, MatchError> {
        self.store
            .find_match(id)
            .await?
            .ok_or_else(|| MatchError::not_found(format!("Match {} not found", id)))
    }

    /// Filtered, sorted, paginated match listing.
    #[instrument(skip(self, query))]
    pub async fn search_matches(&self, query: &MatchQuery) -> Result<Page<Match>, MatchError> {
        debug!(filter = ?query.filter(), "Searching matches");
        Ok(self.store.search_matches(query).await?)
    }
}

#[track_caller]
fn validate_dimensions(size: u32, win_length: u32) -> Result<(), MatchError> {
    if size == 0 || size > MAX_BOARD_SIZE {
        return Err(MatchError::invalid_argument(format!(
            "Board size must be between 1 and {}, got {}",
            MAX_BOARD_SIZE, size
        )));
    }
    if win_length == 0 || win_length > size {
        return Err(MatchError::invalid_argument(format!(
            "Win length must be between 1 and {}, got {}",
            size, win_length
        )));
    }
    Ok(())
}
