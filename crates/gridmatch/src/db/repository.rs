//! Diesel-backed [`MatchStore`] and [`PlayerDirectory`].

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::db::models::{MatchRow, MoveRow, PlayerRow, ProgressChangeset};
use crate::db::schema;
use crate::{
    Match, MatchFilter, MatchId, MatchProgress, MatchQuery, MatchSortField, MatchStore, Move,
    MoveFilter, MoveId, MoveQuery, MoveSortField, Page, PageRequest, Participant, PlayerDirectory,
    PlayerId, SortDirection, StoreError,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

macro_rules! then_order {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Asc => $query.then_order_by($column.asc()),
            SortDirection::Desc => $query.then_order_by($column.desc()),
        }
    };
}

/// SQLite store for players, matches and moves.
///
/// Every call opens its own connection on the blocking thread pool, so the
/// store is cheap to clone and share. The uniqueness indexes on `moves` are
/// the serialization point for concurrent submissions.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database_url: String,
}

impl SqliteStore {
    /// Creates a store for the database file at `database_url`.
    ///
    /// `":memory:"` is rejected: each call opens a fresh connection and would
    /// see an empty database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the path is empty or in-memory.
    #[instrument(skip(database_url), fields(database_url = %database_url))]
    pub fn new(database_url: String) -> Result<Self, StoreError> {
        if database_url.trim().is_empty() {
            return Err(StoreError::backend("Database URL is empty"));
        }
        if database_url.trim() == ":memory:" {
            return Err(StoreError::backend(
                "In-memory SQLite is not shared between connections; use a file path",
            ));
        }
        info!("Creating SqliteStore");
        Ok(Self { database_url })
    }

    /// Establishes a configured database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.database_url, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.database_url).map_err(|e| {
            StoreError::backend(format!(
                "Failed to connect to '{}': {}",
                self.database_url, e
            ))
        })?;
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            BUSY_TIMEOUT_MS
        ))?;
        Ok(conn)
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if connecting or migrating fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.batch_execute("PRAGMA journal_mode = WAL;")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::backend(format!("Migrations failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    /// Runs `op` with a fresh connection on the blocking pool.
    async fn run<T, F>(&self, name: &'static str, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = store.connection()?;
            op(&mut conn)
        })
        .await
        .map_err(|e| StoreError::backend(format!("{} task failed: {}", name, e)))?
    }

    /// Adds a participant to the directory.
    ///
    /// # Errors
    ///
    /// Returns a `PlayerUsername` violation if the name is taken
    /// (case-insensitive), or [`StoreError`] on database failure.
    #[instrument(skip(self))]
    pub async fn register_player(&self, username: String) -> Result<Participant, StoreError> {
        debug!(username = %username, "Registering player");
        let row = PlayerRow {
            id: PlayerId::generate().to_string(),
            username,
            created_at: Utc::now().trunc_subsecs(6).naive_utc(),
        };
        let participant = self
            .run("register_player", move |conn| {
                diesel::insert_into(schema::players::table)
                    .values(&row)
                    .execute(conn)?;
                row.into_domain()
            })
            .await?;
        info!(player_id = %participant.id(), username = %participant.username(), "Player registered");
        Ok(participant)
    }
}

fn filtered_matches(filter: &MatchFilter) -> schema::matches::BoxedQuery<'static, Sqlite> {
    let mut query = schema::matches::table.into_boxed();
    if let Some(status) = filter.status() {
        query = query.filter(schema::matches::status.eq(status.as_ref().to_string()));
    }
    if !filter.participant_ids().is_empty() {
        let ids: Vec<String> = filter
            .participant_ids()
            .iter()
            .map(ToString::to_string)
            .collect();
        query = query.filter(
            schema::matches::side_a
                .eq_any(ids.clone())
                .or(schema::matches::side_b.eq_any(ids)),
        );
    }
    query
}

fn filtered_moves(filter: &MoveFilter) -> schema::moves::BoxedQuery<'static, Sqlite> {
    let mut query = schema::moves::table.into_boxed();
    if let Some(match_id) = filter.match_id() {
        query = query.filter(schema::moves::match_id.eq(match_id.to_string()));
    }
    if let Some(player_id) = filter.player_id() {
        query = query.filter(schema::moves::player_id.eq(player_id.to_string()));
    }
    query
}

fn page_window(page: &PageRequest) -> Result<(i64, i64), StoreError> {
    let offset = i64::try_from(page.offset())
        .map_err(|_| StoreError::backend("Page offset out of range"))?;
    Ok((i64::from(*page.size()), offset))
}

fn load_moves_for(
    conn: &mut SqliteConnection,
    match_ids: Vec<String>,
) -> Result<HashMap<String, Vec<MoveRow>>, StoreError> {
    let rows = schema::moves::table
        .filter(schema::moves::match_id.eq_any(match_ids))
        .order((schema::moves::match_id.asc(), schema::moves::sequence.asc()))
        .load::<MoveRow>(conn)?;
    let mut grouped: HashMap<String, Vec<MoveRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.match_id.clone()).or_default().push(row);
    }
    Ok(grouped)
}

fn load_match(conn: &mut SqliteConnection, id: &str) -> Result<Option<Match>, StoreError> {
    let Some(row) = schema::matches::table
        .find(id)
        .first::<MatchRow>(conn)
        .optional()?
    else {
        return Ok(None);
    };
    let moves = schema::moves::table
        .filter(schema::moves::match_id.eq(id))
        .order(schema::moves::sequence.asc())
        .load::<MoveRow>(conn)?;
    row.into_domain(moves).map(Some)
}

#[async_trait]
impl PlayerDirectory for SqliteStore {
    #[instrument(skip(self))]
    async fn resolve(&self, id: PlayerId) -> Result<Option<Participant>, StoreError> {
        let id = id.to_string();
        self.run("resolve", move |conn| {
            schema::players::table
                .find(&id)
                .first::<PlayerRow>(conn)
                .optional()?
                .map(PlayerRow::into_domain)
                .transpose()
        })
        .await
    }
}

#[async_trait]
impl MatchStore for SqliteStore {
    #[instrument(skip(self, created), fields(match_id = %created.id()))]
    async fn insert_match(&self, created: &Match) -> Result<(), StoreError> {
        let row = MatchRow::from_domain(created)?;
        self.run("insert_match", move |conn| {
            diesel::insert_into(schema::matches::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await?;
        debug!("Match stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_match(&self, id: MatchId) -> Result<Option<Match>, StoreError> {
        let id = id.to_string();
        self.run("find_match", move |conn| load_match(conn, &id)).await
    }

    #[instrument(skip(self, query))]
    async fn search_matches(&self, query: &MatchQuery) -> Result<Page<Match>, StoreError> {
        let query = query.clone();
        let page = self
            .run("search_matches", move |conn| {
                let total: i64 = filtered_matches(query.filter()).count().get_result(conn)?;

                let mut select = filtered_matches(query.filter());
                for key in query.effective_sort() {
                    select = match key.field() {
                        MatchSortField::CreatedAt => {
                            then_order!(select, schema::matches::created_at, key.direction())
                        }
                        MatchSortField::Id => then_order!(select, schema::matches::id, key.direction()),
                        MatchSortField::SideA => {
                            then_order!(select, schema::matches::side_a, key.direction())
                        }
                        MatchSortField::SideB => {
                            then_order!(select, schema::matches::side_b, key.direction())
                        }
                        MatchSortField::Status => {
                            then_order!(select, schema::matches::status, key.direction())
                        }
                        MatchSortField::EndedAt => {
                            then_order!(select, schema::matches::ended_at, key.direction())
                        }
                    };
                }
                let (limit, offset) = page_window(query.page())?;
                let rows = select
                    .then_order_by(schema::matches::id.asc())
                    .limit(limit)
                    .offset(offset)
                    .load::<MatchRow>(conn)?;

                let mut moves = load_moves_for(conn, rows.iter().map(|r| r.id.clone()).collect())?;
                let items = rows
                    .into_iter()
                    .map(|row| {
                        let own = moves.remove(&row.id).unwrap_or_default();
                        row.into_domain(own)
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Page::new(
                    items,
                    u64::try_from(total).unwrap_or_default(),
                    *query.page().size(),
                    *query.page().number(),
                ))
            })
            .await?;
        info!(total = page.total_count(), returned = page.items().len(), "Matches searched");
        Ok(page)
    }

    #[instrument(skip(self))]
    async fn find_move(&self, id: MoveId) -> Result<Option<Move>, StoreError> {
        let id = id.to_string();
        self.run("find_move", move |conn| {
            schema::moves::table
                .find(&id)
                .first::<MoveRow>(conn)
                .optional()?
                .map(MoveRow::into_domain)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn find_move_by_client_id(
        &self,
        match_id: MatchId,
        client_move_id: &str,
    ) -> Result<Option<Move>, StoreError> {
        let match_id = match_id.to_string();
        let client_move_id = client_move_id.to_string();
        self.run("find_move_by_client_id", move |conn| {
            schema::moves::table
                .filter(schema::moves::match_id.eq(&match_id))
                .filter(schema::moves::client_move_id.eq(&client_move_id))
                .first::<MoveRow>(conn)
                .optional()?
                .map(MoveRow::into_domain)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self, query))]
    async fn search_moves(&self, query: &MoveQuery) -> Result<Page<Move>, StoreError> {
        let query = query.clone();
        let page = self
            .run("search_moves", move |conn| {
                let total: i64 = filtered_moves(query.filter()).count().get_result(conn)?;

                let mut select = filtered_moves(query.filter());
                for key in query.effective_sort() {
                    select = match key.field() {
                        MoveSortField::Id => then_order!(select, schema::moves::id, key.direction()),
                        MoveSortField::MatchId => {
                            then_order!(select, schema::moves::match_id, key.direction())
                        }
                        MoveSortField::Sequence => {
                            then_order!(select, schema::moves::sequence, key.direction())
                        }
                        MoveSortField::PlayerId => {
                            then_order!(select, schema::moves::player_id, key.direction())
                        }
                        MoveSortField::ClientMoveId => {
                            then_order!(select, schema::moves::client_move_id, key.direction())
                        }
                        MoveSortField::CreatedAt => {
                            then_order!(select, schema::moves::created_at, key.direction())
                        }
                    };
                }
                let (limit, offset) = page_window(query.page())?;
                let items = select
                    .then_order_by(schema::moves::id.asc())
                    .limit(limit)
                    .offset(offset)
                    .load::<MoveRow>(conn)?
                    .into_iter()
                    .map(MoveRow::into_domain)
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Page::new(
                    items,
                    u64::try_from(total).unwrap_or_default(),
                    *query.page().size(),
                    *query.page().number(),
                ))
            })
            .await?;
        info!(total = page.total_count(), returned = page.items().len(), "Moves searched");
        Ok(page)
    }

    #[instrument(skip(self, accepted, progress), fields(match_id = %accepted.match_id(), sequence = accepted.sequence()))]
    async fn commit_move(&self, accepted: &Move, progress: &MatchProgress) -> Result<(), StoreError> {
        if progress.match_id() != accepted.match_id() {
            return Err(StoreError::backend(
                "Move and progress refer to different matches",
            ));
        }
        let row = MoveRow::from_domain(accepted)?;
        let changes = ProgressChangeset::from(progress);
        let match_id = progress.match_id().to_string();
        self.run("commit_move", move |conn| {
            conn.immediate_transaction(|conn| {
                diesel::insert_into(schema::moves::table)
                    .values(&row)
                    .execute(conn)?;
                let updated = diesel::update(schema::matches::table.find(&match_id))
                    .set(&changes)
                    .execute(conn)?;
                if updated != 1 {
                    return Err(StoreError::backend(format!(
                        "Match {} vanished during commit",
                        match_id
                    )));
                }
                Ok(())
            })
        })
        .await?;
        debug!("Move committed");
        Ok(())
    }
}
