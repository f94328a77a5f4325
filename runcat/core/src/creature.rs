//! Creatures
//!
//! The fixed set of animated characters the tray icon can show. Exactly one
//! creature is active at a time; the engine owns the selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Animated character identity shown in the tray icon
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creature {
    /// The classic running cat
    #[default]
    Cat,
    /// A flapping parrot
    Parrot,
    /// A galloping horse
    Horse,
}

impl Creature {
    /// Every creature, in menu order
    pub const ALL: [Creature; 3] = [Creature::Cat, Creature::Parrot, Creature::Horse];

    /// Lowercase identifier used in asset paths and settings files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Parrot => "parrot",
            Self::Horse => "horse",
        }
    }

    /// Menu label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Cat => "Cat",
            Self::Parrot => "Parrot",
            Self::Horse => "Horse",
        }
    }

    /// Frame count assumed when the asset source cannot be probed
    #[must_use]
    pub fn default_frame_count(self) -> usize {
        match self {
            Self::Cat => 5,
            Self::Parrot => 10,
            Self::Horse => 14,
        }
    }
}

impl fmt::Display for Creature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Creature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cat" => Ok(Self::Cat),
            "parrot" => Ok(Self::Parrot),
            "horse" => Ok(Self::Horse),
            other => Err(format!("unknown creature: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creature_parse() {
        assert_eq!("cat".parse::<Creature>(), Ok(Creature::Cat));
        assert_eq!(" Horse ".parse::<Creature>(), Ok(Creature::Horse));
        assert!("dog".parse::<Creature>().is_err());
    }

    #[test]
    fn test_default_frame_counts() {
        assert_eq!(Creature::Cat.default_frame_count(), 5);
        assert_eq!(Creature::Parrot.default_frame_count(), 10);
        assert_eq!(Creature::Horse.default_frame_count(), 14);
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            runner: Creature,
        }

        let text = toml::to_string(&Wrapper {
            runner: Creature::Parrot,
        })
        .unwrap();
        assert_eq!(text.trim(), "runner = \"parrot\"");

        let parsed: Wrapper = toml::from_str("runner = \"horse\"").unwrap();
        assert_eq!(parsed.runner, Creature::Horse);
    }
}
