//! Enum types for Tessera cache policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical storage tier a cache operation is routed to.
///
/// The two tiers are exclusive: a single request never consults both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Process-local memory. Fast, not shared between instances, no TTL, no scan.
    Local,
    /// Shared distributed store. Enforces TTL and supports pattern scan.
    #[default]
    Distributed,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Local => "local",
            Tier::Distributed => "distributed",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Tier::Local),
            "distributed" => Ok(Tier::Distributed),
            _ => Err(TierParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid tier string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierParseError(pub String);

impl fmt::Display for TierParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid tier: {} (expected local or distributed)", self.0)
    }
}

impl std::error::Error for TierParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_default_is_distributed() {
        assert_eq!(Tier::default(), Tier::Distributed);
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("local".parse::<Tier>(), Ok(Tier::Local));
        assert_eq!(" Distributed ".parse::<Tier>(), Ok(Tier::Distributed));
        assert!("redis".parse::<Tier>().is_err());
    }

    #[test]
    fn test_tier_serde_lowercase() {
        let json = serde_json::to_string(&Tier::Local).unwrap();
        assert_eq!(json, "\"local\"");
        let tier: Tier = serde_json::from_str("\"distributed\"").unwrap();
        assert_eq!(tier, Tier::Distributed);
    }
}
