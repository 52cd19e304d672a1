//! Participants resolved through the player directory.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// A known player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct Participant {
    id: PlayerId,
    username: String,
    created_at: DateTime<Utc>,
}
