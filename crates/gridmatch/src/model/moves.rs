//! The immutable move record.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use gridmatch_rules::{Coord, Mark};
use serde::{Deserialize, Serialize};

use crate::{MatchId, MoveId, PlayerId};

/// One placed mark within a match.
///
/// `mark` is the mark actually recorded. When the chaos rule fired it is the
/// opponent's mark and `mark_overridden` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Move {
    id: MoveId,
    match_id: MatchId,
    sequence: u32,
    player_id: PlayerId,
    mark: Mark,
    x: u32,
    y: u32,
    created_at: DateTime<Utc>,
    client_move_id: String,
    mark_overridden: bool,
}

impl Move {
    /// Board cell the move occupies.
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// Records the opponent's mark in place of the acting side's.
    pub(crate) fn override_mark(&mut self) {
        self.mark = self.mark.opponent();
        self.mark_overridden = true;
    }
}
