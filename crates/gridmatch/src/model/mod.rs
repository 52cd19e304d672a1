//! Domain entities: matches, moves, participants and query types.

mod ids;
mod matches;
mod moves;
mod participant;
mod query;

pub use ids::{MatchId, MoveId, PlayerId};
pub use matches::{Match, MatchProgress, MatchStatus};
pub use moves::Move;
pub use participant::Participant;
pub use query::{
    MAX_PAGE_SIZE, MatchFilter, MatchQuery, MatchSortField, MoveFilter, MoveQuery, MoveSortField,
    Page, PageRequest, SortDirection, SortKey,
};
