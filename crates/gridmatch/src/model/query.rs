//! Filters, sort keys and paging for search operations.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MatchError, MatchId, MatchStatus, PlayerId};

/// Largest page a search may return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort order for one key.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// Fields matches can be sorted by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MatchSortField {
    /// Creation time.
    CreatedAt,
    /// Match id.
    Id,
    /// Side A participant id.
    SideA,
    /// Side B participant id.
    SideB,
    /// Lifecycle status.
    Status,
    /// End time; unfinished matches sort first ascending.
    EndedAt,
}

/// Fields moves can be sorted by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MoveSortField {
    /// Move id.
    Id,
    /// Parent match id.
    MatchId,
    /// Sequence number within the match.
    Sequence,
    /// Placing participant id.
    PlayerId,
    /// Client idempotency token.
    ClientMoveId,
    /// Creation time.
    CreatedAt,
}

/// A sort field with direction, written `field` or `field:desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct SortKey<F> {
    field: F,
    direction: SortDirection,
}

impl<F> SortKey<F> {
    /// Ascending key.
    pub fn asc(field: F) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Descending key.
    pub fn desc(field: F) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl<F: FromStr> FromStr for SortKey<F> {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, direction)) => (field, Some(direction)),
            None => (s, None),
        };
        let field = F::from_str(field.trim())
            .map_err(|_| MatchError::invalid_argument(format!("Unknown sort field '{}'", field)))?;
        let direction = match direction {
            Some(d) => SortDirection::from_str(d.trim()).map_err(|_| {
                MatchError::invalid_argument(format!("Unknown sort direction '{}'", d))
            })?,
            None => SortDirection::Asc,
        };
        Ok(Self::new(field, direction))
    }
}

impl<F: fmt::Display> fmt::Display for SortKey<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// One-based page selection.
///
/// Deserialization goes through [`PageRequest::new`], so a parsed request is
/// always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(try_from = "RawPageRequest")]
pub struct PageRequest {
    number: u32,
    size: u32,
}

#[derive(Deserialize)]
struct RawPageRequest {
    number: u32,
    size: u32,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = MatchError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.number, raw.size)
    }
}

impl PageRequest {
    /// Validates and builds a page request.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error unless `number >= 1` and
    /// `1 <= size <= MAX_PAGE_SIZE`.
    #[track_caller]
    pub fn new(number: u32, size: u32) -> Result<Self, MatchError> {
        if number < 1 {
            return Err(MatchError::invalid_argument(
                "Page number must be at least 1",
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(MatchError::invalid_argument(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { number, size })
    }

    /// Rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: 10,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Page<T> {
    items: Vec<T>,
    total_count: u64,
    page_size: u32,
    page_number: u32,
}

/// Match search predicates. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MatchFilter {
    status: Option<MatchStatus>,
    participant_ids: Vec<PlayerId>,
}

/// Move search predicates. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MoveFilter {
    match_id: Option<MatchId>,
    player_id: Option<PlayerId>,
}

/// A complete match search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MatchQuery {
    filter: MatchFilter,
    sort: Vec<SortKey<MatchSortField>>,
    page: PageRequest,
}

impl MatchQuery {
    /// Sort keys to apply, falling back to creation time ascending.
    pub fn effective_sort(&self) -> Vec<SortKey<MatchSortField>> {
        if self.sort.is_empty() {
            vec![SortKey::asc(MatchSortField::CreatedAt)]
        } else {
            self.sort.clone()
        }
    }
}

/// A complete move search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct MoveQuery {
    filter: MoveFilter,
    sort: Vec<SortKey<MoveSortField>>,
    page: PageRequest,
}

impl MoveQuery {
    /// Sort keys to apply, falling back to match id then sequence.
    pub fn effective_sort(&self) -> Vec<SortKey<MoveSortField>> {
        if self.sort.is_empty() {
            vec![
                SortKey::asc(MoveSortField::MatchId),
                SortKey::asc(MoveSortField::Sequence),
            ]
        } else {
            self.sort.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchErrorKind;

    #[test]
    fn test_sort_key_parsing() {
        let key: SortKey<MatchSortField> = "created_at".parse().unwrap();
        assert_eq!(key, SortKey::asc(MatchSortField::CreatedAt));

        let key: SortKey<MoveSortField> = "Sequence:DESC".parse().unwrap();
        assert_eq!(key, SortKey::desc(MoveSortField::Sequence));
    }

    #[test]
    fn test_sort_key_rejects_unknown() {
        let err = "password:asc".parse::<SortKey<MatchSortField>>().unwrap_err();
        assert_eq!(err.kind(), MatchErrorKind::InvalidArgument);

        let err = "id:sideways".parse::<SortKey<MoveSortField>>().unwrap_err();
        assert_eq!(err.kind(), MatchErrorKind::InvalidArgument);
    }

    #[test]
    fn test_sort_key_display() {
        assert_eq!(SortKey::desc(MatchSortField::EndedAt).to_string(), "ended_at:desc");
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(1, 1).is_ok());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
        assert!(PageRequest::new(0, 10).is_err());
        assert!(PageRequest::new(1, 0).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE + 1).is_err());
        assert_eq!(PageRequest::new(3, 20).unwrap().offset(), 40);
    }

    #[test]
    fn test_page_request_deserialization_is_validated() {
        assert!(serde_json::from_str::<PageRequest>(r#"{"number":0,"size":0}"#).is_err());
        assert!(serde_json::from_str::<PageRequest>(r#"{"number":1,"size":101}"#).is_err());
        let page: PageRequest = serde_json::from_str(r#"{"number":2,"size":5}"#).unwrap();
        assert_eq!(page.offset(), 5);
    }

    #[test]
    fn test_query_with_bad_page_fails_to_parse() {
        let json = r#"{"filter":{"status":null,"participant_ids":[]},"sort":[],"page":{"number":0,"size":0}}"#;
        assert!(serde_json::from_str::<MatchQuery>(json).is_err());
        let json = r#"{"filter":{"status":null,"participant_ids":[]},"sort":[],"page":{"number":1,"size":10}}"#;
        let query: MatchQuery = serde_json::from_str(json).unwrap();
        assert_eq!(*query.page(), PageRequest::default());
    }

    #[test]
    fn test_default_sorts() {
        assert_eq!(
            MatchQuery::default().effective_sort(),
            vec![SortKey::asc(MatchSortField::CreatedAt)]
        );
        assert_eq!(MoveQuery::default().effective_sort().len(), 2);
    }
}
