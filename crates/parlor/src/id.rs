use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A name identifying one actor partition.
///
/// All operations addressed to the same name share one serialized execution
/// context and one persistent state partition. Names scope filesystem paths
/// in the store, so path-meaningful characters are rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorName(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid actor name: {0}")]
pub struct InvalidActorName(String);

impl ActorName {
    /// Parse an ActorName from a string.
    pub fn parse(s: &str) -> Result<Self, InvalidActorName> {
        if s.is_empty() {
            return Err(InvalidActorName("name must not be empty".to_string()));
        }
        if s == "." || s == ".." {
            return Err(InvalidActorName(format!("name '{}' is reserved", s)));
        }
        if s.contains(['/', '\\', '\0']) {
            return Err(InvalidActorName(format!(
                "name '{}' contains a path separator or NUL",
                s
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ActorName {
    type Err = InvalidActorName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ActorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let name = ActorName::parse("default").unwrap();
        assert_eq!(name.to_string(), "default");
        assert_eq!(name.as_str(), "default");
    }

    #[test]
    fn test_rejects_path_characters() {
        assert!(ActorName::parse("").is_err());
        assert!(ActorName::parse("a/b").is_err());
        assert!(ActorName::parse("a\\b").is_err());
        assert!(ActorName::parse(".").is_err());
        assert!(ActorName::parse("..").is_err());
    }

    #[test]
    fn test_serialization() {
        let name = ActorName::parse("room-42").unwrap();
        let serialized = serde_json::to_string(&name).unwrap();
        assert_eq!(serialized, "\"room-42\"");
        let deserialized: ActorName = serde_json::from_str(&serialized).unwrap();
        assert_eq!(name, deserialized);
    }
}
