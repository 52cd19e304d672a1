//! The two marks players place on the board.

use serde::{Deserialize, Serialize};

/// Mark placed on the board.
///
/// Side A of a match always plays `X`, side B always plays `O`.
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
pub enum Mark {
    /// Mark X (moves first).
    X,
    /// Mark O (moves second).
    O,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_opponent_flips() {
        assert_eq!(Mark::X.opponent(), Mark::O);
        assert_eq!(Mark::O.opponent(), Mark::X);
        assert_eq!(Mark::X.opponent().opponent(), Mark::X);
    }

    #[test]
    fn test_text_form() {
        assert_eq!(Mark::X.to_string(), "X");
        assert_eq!(Mark::from_str("o").unwrap(), Mark::O);
        assert!(Mark::from_str("Z").is_err());
    }

    #[test]
    fn test_serde_form() {
        assert_eq!(serde_json::to_string(&Mark::O).unwrap(), "\"O\"");
    }
}
