//! Database row models and their mapping to domain types.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use gridmatch_rules::Mark;
use std::str::FromStr;

use crate::db::schema;
use crate::{Match, MatchProgress, MatchStatus, Move, Participant, StoreError};

/// Player row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::players)]
pub(crate) struct PlayerRow {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) created_at: NaiveDateTime,
}

/// Match row, without its moves.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::matches)]
pub(crate) struct MatchRow {
    pub(crate) id: String,
    pub(crate) side_a: String,
    pub(crate) side_b: String,
    pub(crate) size: i32,
    pub(crate) win_length: i32,
    pub(crate) status: String,
    pub(crate) current_turn: String,
    pub(crate) winner: Option<String>,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) ended_at: Option<NaiveDateTime>,
}

/// Move row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::moves)]
pub(crate) struct MoveRow {
    pub(crate) id: String,
    pub(crate) match_id: String,
    pub(crate) sequence: i32,
    pub(crate) player_id: String,
    pub(crate) mark: String,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) created_at: NaiveDateTime,
    pub(crate) client_move_id: String,
    pub(crate) mark_overridden: bool,
}

/// Columns rewritten when a move is accepted.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = schema::matches, treat_none_as_null = true)]
pub(crate) struct ProgressChangeset {
    pub(crate) current_turn: String,
    pub(crate) status: String,
    pub(crate) winner: Option<String>,
    pub(crate) ended_at: Option<NaiveDateTime>,
}

#[track_caller]
fn parse<T: FromStr>(value: &str, column: &str) -> Result<T, StoreError> {
    T::from_str(value).map_err(|_| {
        StoreError::backend(format!("Corrupt value '{}' in column {}", value, column))
    })
}

#[track_caller]
fn to_u32(value: i32, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| {
        StoreError::backend(format!("Negative value {} in column {}", value, column))
    })
}

#[track_caller]
fn to_i32(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::backend(format!("Value {} too large for column {}", value, column)))
}

impl PlayerRow {
    pub(crate) fn into_domain(self) -> Result<Participant, StoreError> {
        Ok(Participant::new(
            parse(&self.id, "players.id")?,
            self.username,
            self.created_at.and_utc(),
        ))
    }
}

impl MatchRow {
    pub(crate) fn from_domain(game: &Match) -> Result<Self, StoreError> {
        Ok(Self {
            id: game.id().to_string(),
            side_a: game.side_a().to_string(),
            side_b: game.side_b().to_string(),
            size: to_i32(*game.size(), "matches.size")?,
            win_length: to_i32(*game.win_length(), "matches.win_length")?,
            status: game.status().as_ref().to_string(),
            current_turn: game.current_turn().as_ref().to_string(),
            winner: game.winner().map(|w| w.as_ref().to_string()),
            created_at: game.created_at().naive_utc(),
            ended_at: game.ended_at().map(|t| t.naive_utc()),
        })
    }

    /// Hydrates the match with its moves, which must be ordered by sequence.
    pub(crate) fn into_domain(self, moves: Vec<MoveRow>) -> Result<Match, StoreError> {
        let moves = moves
            .into_iter()
            .map(MoveRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let winner = match self.winner {
            Some(w) => Some(parse::<Mark>(&w, "matches.winner")?),
            None => None,
        };
        Ok(Match::new(
            parse(&self.id, "matches.id")?,
            parse(&self.side_a, "matches.side_a")?,
            parse(&self.side_b, "matches.side_b")?,
            to_u32(self.size, "matches.size")?,
            to_u32(self.win_length, "matches.win_length")?,
            parse::<MatchStatus>(&self.status, "matches.status")?,
            parse::<Mark>(&self.current_turn, "matches.current_turn")?,
            winner,
            self.created_at.and_utc(),
            self.ended_at.map(|t| t.and_utc()),
            moves,
        ))
    }
}

impl MoveRow {
    pub(crate) fn from_domain(accepted: &Move) -> Result<Self, StoreError> {
        Ok(Self {
            id: accepted.id().to_string(),
            match_id: accepted.match_id().to_string(),
            sequence: to_i32(*accepted.sequence(), "moves.sequence")?,
            player_id: accepted.player_id().to_string(),
            mark: accepted.mark().as_ref().to_string(),
            x: to_i32(*accepted.x(), "moves.x")?,
            y: to_i32(*accepted.y(), "moves.y")?,
            created_at: accepted.created_at().naive_utc(),
            client_move_id: accepted.client_move_id().clone(),
            mark_overridden: *accepted.mark_overridden(),
        })
    }

    pub(crate) fn into_domain(self) -> Result<Move, StoreError> {
        Ok(Move::new(
            parse(&self.id, "moves.id")?,
            parse(&self.match_id, "moves.match_id")?,
            to_u32(self.sequence, "moves.sequence")?,
            parse(&self.player_id, "moves.player_id")?,
            parse::<Mark>(&self.mark, "moves.mark")?,
            to_u32(self.x, "moves.x")?,
            to_u32(self.y, "moves.y")?,
            self.created_at.and_utc(),
            self.client_move_id,
            self.mark_overridden,
        ))
    }
}

impl From<&MatchProgress> for ProgressChangeset {
    fn from(progress: &MatchProgress) -> Self {
        Self {
            current_turn: progress.current_turn().as_ref().to_string(),
            status: progress.status().as_ref().to_string(),
            winner: progress.winner().map(|w| w.as_ref().to_string()),
            ended_at: progress.ended_at().map(|t| t.naive_utc()),
        }
    }
}
