//! Opaque identifiers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Serialize,
            Deserialize,
            derive_more::Display,
            derive_more::From,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifies a match.
    MatchId
);
id_type!(
    /// Identifies a move.
    MoveId
);
id_type!(
    /// Identifies a participant in the player directory.
    PlayerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(MatchId::generate(), MatchId::generate());
    }

    #[test]
    fn test_parse_display_agree() {
        let id = PlayerId::generate();
        let parsed: PlayerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_parse_garbage() {
        assert!("not-a-uuid".parse::<MoveId>().is_err());
    }
}
