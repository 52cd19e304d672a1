//! In-memory store for tests and embedding.
//!
//! Enforces the same uniqueness constraints as the SQLite schema. A single
//! mutex serializes writes, which makes `commit_move` trivially atomic.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument};

use crate::{
    Match, MatchId, MatchProgress, MatchQuery, MatchSortField, MatchStore, Move, MoveId,
    MoveQuery, MoveSortField, Page, Participant, PlayerDirectory, PlayerId, SortDirection,
    SortKey, StoreError, UniqueConstraint,
};

#[derive(Debug, Default)]
struct Tables {
    players: HashMap<PlayerId, Participant>,
    matches: HashMap<MatchId, Match>,
    move_index: HashMap<MoveId, MatchId>,
}

/// Store backed by process memory.
///
/// Clones share the same underlying tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::backend("In-memory store lock poisoned"))
    }

    /// Adds a participant to the directory.
    ///
    /// # Errors
    ///
    /// Returns a `PlayerUsername` violation if the name is taken.
    #[instrument(skip(self, username), fields(username = %username.as_ref()))]
    pub fn register_player(&self, username: impl AsRef<str>) -> Result<Participant, StoreError> {
        let username = username.as_ref();
        let mut tables = self.lock()?;
        if tables
            .players
            .values()
            .any(|p| p.username().eq_ignore_ascii_case(username))
        {
            return Err(StoreError::unique(
                UniqueConstraint::PlayerUsername,
                format!("Username '{}' is taken", username),
            ));
        }
        let participant = Participant::new(PlayerId::generate(), username.to_string(), Utc::now());
        tables.players.insert(*participant.id(), participant.clone());
        info!(player_id = %participant.id(), "Player registered");
        Ok(participant)
    }

    /// Total number of stored moves across all matches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store lock is poisoned.
    pub fn move_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.move_index.len())
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn compare_matches(a: &Match, b: &Match, sort: &[SortKey<MatchSortField>]) -> Ordering {
    sort.iter()
        .map(|key| {
            let ord = match key.field() {
                MatchSortField::CreatedAt => a.created_at().cmp(b.created_at()),
                MatchSortField::Id => a.id().cmp(b.id()),
                MatchSortField::SideA => a.side_a().cmp(b.side_a()),
                MatchSortField::SideB => a.side_b().cmp(b.side_b()),
                MatchSortField::Status => a.status().as_ref().cmp(b.status().as_ref()),
                MatchSortField::EndedAt => a.ended_at().cmp(b.ended_at()),
            };
            directed(ord, *key.direction())
        })
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.id().cmp(b.id()))
}

fn compare_moves(a: &Move, b: &Move, sort: &[SortKey<MoveSortField>]) -> Ordering {
    sort.iter()
        .map(|key| {
            let ord = match key.field() {
                MoveSortField::Id => a.id().cmp(b.id()),
                MoveSortField::MatchId => a.match_id().cmp(b.match_id()),
                MoveSortField::Sequence => a.sequence().cmp(b.sequence()),
                MoveSortField::PlayerId => a.player_id().cmp(b.player_id()),
                MoveSortField::ClientMoveId => a.client_move_id().cmp(b.client_move_id()),
                MoveSortField::CreatedAt => a.created_at().cmp(b.created_at()),
            };
            directed(ord, *key.direction())
        })
        .find(|ord| ord.is_ne())
        .unwrap_or_else(|| a.id().cmp(b.id()))
}

fn paginate<T>(mut items: Vec<T>, page: &crate::PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items: Vec<T> = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..).take(*page.size() as usize).collect()
    };
    Page::new(items, total, *page.size(), *page.number())
}

#[async_trait]
impl PlayerDirectory for InMemoryStore {
    #[instrument(skip(self))]
    async fn resolve(&self, id: PlayerId) -> Result<Option<Participant>, StoreError> {
        Ok(self.lock()?.players.get(&id).cloned())
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    #[instrument(skip(self, created), fields(match_id = %created.id()))]
    async fn insert_match(&self, created: &Match) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if tables.matches.contains_key(created.id()) {
            return Err(StoreError::backend(format!(
                "Match {} already exists",
                created.id()
            )));
        }
        tables.matches.insert(*created.id(), created.clone());
        debug!("Match stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        Ok(self.lock()?.matches.get(&id).cloned())
    }

    #[instrument(skip(self, query))]
    async fn search_matches(&self, query: &MatchQuery) -> Result<Page<Match>, StoreError> {
        let tables = self.lock()?;
        let filter = query.filter();
        let mut found: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| filter.status().is_none_or(|s| *m.status() == s))
            .filter(|m| {
                filter.participant_ids().is_empty()
                    || filter
                        .participant_ids()
                        .iter()
                        .any(|p| m.side_a() == p || m.side_b() == p)
            })
            .cloned()
            .collect();
        let sort = query.effective_sort();
        found.sort_by(|a, b| compare_matches(a, b, &sort));
        Ok(paginate(found, query.page()))
    }

    #[instrument(skip(self))]
    async fn find_move(&self, id: MoveId) -> Result<Option<Move>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .move_index
            .get(&id)
            .and_then(|match_id| tables.matches.get(match_id))
            .and_then(|m| m.moves().iter().find(|mv| *mv.id() == id))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn find_move_by_client_id(
        &self,
        match_id: MatchId,
        client_move_id: &str,
    ) -> Result<Option<Move>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .matches
            .get(&match_id)
            .and_then(|m| m.moves().iter().find(|mv| mv.client_move_id() == client_move_id))
            .cloned())
    }

    #[instrument(skip(self, query))]
    async fn search_moves(&self, query: &MoveQuery) -> Result<Page<Move>, StoreError> {
        let tables = self.lock()?;
        let filter = query.filter();
        let mut found: Vec<Move> = tables
            .matches
            .values()
            .filter(|m| filter.match_id().is_none_or(|id| *m.id() == id))
            .flat_map(|m| m.moves().iter())
            .filter(|mv| filter.player_id().is_none_or(|id| *mv.player_id() == id))
            .cloned()
            .collect();
        let sort = query.effective_sort();
        found.sort_by(|a, b| compare_moves(a, b, &sort));
        Ok(paginate(found, query.page()))
    }

    #[instrument(skip(self, accepted, progress), fields(match_id = %accepted.match_id(), sequence = accepted.sequence()))]
    async fn commit_move(&self, accepted: &Move, progress: &MatchProgress) -> Result<(), StoreError> {
        if progress.match_id() != accepted.match_id() {
            return Err(StoreError::backend("Move and progress refer to different matches"));
        }
        let mut guard = self.lock()?;
        let tables = &mut *guard;
        let game = tables.matches.get_mut(accepted.match_id()).ok_or_else(|| {
            StoreError::backend(format!("Match {} does not exist", accepted.match_id()))
        })?;

        let existing = game.moves();
        if existing
            .iter()
            .any(|m| m.client_move_id() == accepted.client_move_id())
        {
            return Err(StoreError::unique(
                UniqueConstraint::MoveClientId,
                format!("Token '{}' already used", accepted.client_move_id()),
            ));
        }
        if existing.iter().any(|m| m.coord() == accepted.coord()) {
            return Err(StoreError::unique(
                UniqueConstraint::MoveCell,
                format!("Cell {} already taken", accepted.coord()),
            ));
        }
        if existing.iter().any(|m| m.sequence() == accepted.sequence()) {
            return Err(StoreError::unique(
                UniqueConstraint::MoveSequence,
                format!("Sequence {} already recorded", accepted.sequence()),
            ));
        }

        game.record(accepted.clone(), progress);
        tables.move_index.insert(*accepted.id(), *accepted.match_id());
        debug!("Move committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchFilter, MatchStatus, PageRequest};
    use gridmatch_rules::Mark;

    fn started(store: &InMemoryStore) -> (Match, Participant, Participant) {
        let a = store.register_player("alice").unwrap();
        let b = store.register_player("bob").unwrap();
        let game = Match::start(*a.id(), *b.id(), 3, 3, Utc::now());
        (game, a, b)
    }

    fn move_at(game: &Match, player: PlayerId, seq: u32, x: u32, y: u32, token: &str) -> Move {
        Move::new(
            MoveId::generate(),
            *game.id(),
            seq,
            player,
            Mark::X,
            x,
            y,
            Utc::now(),
            token.to_string(),
            false,
        )
    }

    fn progress(game: &Match) -> MatchProgress {
        MatchProgress::new(*game.id(), Mark::O, MatchStatus::InProgress, None, None)
    }

    #[tokio::test]
    async fn test_register_player_unique_name() {
        let store = InMemoryStore::new();
        store.register_player("carol").unwrap();
        let err = store.register_player("Carol").unwrap_err();
        assert_eq!(err.violated(), Some(UniqueConstraint::PlayerUsername));
    }

    #[tokio::test]
    async fn test_commit_move_applies_progress() {
        let store = InMemoryStore::new();
        let (game, a, _) = started(&store);
        store.insert_match(&game).await.unwrap();

        let mv = move_at(&game, *a.id(), 1, 0, 0, "t1");
        store.commit_move(&mv, &progress(&game)).await.unwrap();

        let loaded = store.find_match(*game.id()).await.unwrap().unwrap();
        assert_eq!(loaded.moves().len(), 1);
        assert_eq!(*loaded.current_turn(), Mark::O);
        assert_eq!(store.find_move(*mv.id()).await.unwrap(), Some(mv));
    }

    #[tokio::test]
    async fn test_commit_move_constraints() {
        let store = InMemoryStore::new();
        let (game, a, _) = started(&store);
        store.insert_match(&game).await.unwrap();
        store
            .commit_move(&move_at(&game, *a.id(), 1, 0, 0, "t1"), &progress(&game))
            .await
            .unwrap();

        let dup_token = move_at(&game, *a.id(), 2, 1, 1, "t1");
        let err = store.commit_move(&dup_token, &progress(&game)).await.unwrap_err();
        assert_eq!(err.violated(), Some(UniqueConstraint::MoveClientId));

        let dup_cell = move_at(&game, *a.id(), 2, 0, 0, "t2");
        let err = store.commit_move(&dup_cell, &progress(&game)).await.unwrap_err();
        assert_eq!(err.violated(), Some(UniqueConstraint::MoveCell));

        let dup_seq = move_at(&game, *a.id(), 1, 2, 2, "t3");
        let err = store.commit_move(&dup_seq, &progress(&game)).await.unwrap_err();
        assert_eq!(err.violated(), Some(UniqueConstraint::MoveSequence));

        assert_eq!(store.move_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_matches_filters_and_pages() {
        let store = InMemoryStore::new();
        let (game, a, b) = started(&store);
        store.insert_match(&game).await.unwrap();
        let c = store.register_player("dave").unwrap();
        let other = Match::start(*b.id(), *c.id(), 3, 3, Utc::now());
        store.insert_match(&other).await.unwrap();

        let by_a = MatchQuery::new(
            MatchFilter::new(None, vec![*a.id()]),
            Vec::new(),
            PageRequest::default(),
        );
        let page = store.search_matches(&by_a).await.unwrap();
        assert_eq!(*page.total_count(), 1);
        assert_eq!(page.items()[0].id(), game.id());

        let paged = MatchQuery::new(MatchFilter::default(), Vec::new(), PageRequest::new(2, 1).unwrap());
        let page = store.search_matches(&paged).await.unwrap();
        assert_eq!(*page.total_count(), 2);
        assert_eq!(page.items().len(), 1);
        assert_eq!(*page.page_number(), 2);

        let finished = MatchQuery::new(
            MatchFilter::new(Some(MatchStatus::Finished), Vec::new()),
            Vec::new(),
            PageRequest::default(),
        );
        assert!(store.search_matches(&finished).await.unwrap().items().is_empty());
    }
}
