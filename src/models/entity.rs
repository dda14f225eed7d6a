//! Case entity kinds

use std::fmt;
use std::str::FromStr;

/// A named collection of case data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum EntityKind {
    /// Case summary (single object)
    Case,
    Assets,
    Iocs,
    Events,
    Tasks,
    Notes,
    Evidences,
}

impl EntityKind {
    /// Every kind, in display order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Case,
        EntityKind::Assets,
        EntityKind::Iocs,
        EntityKind::Events,
        EntityKind::Tasks,
        EntityKind::Notes,
        EntityKind::Evidences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Case => "case",
            EntityKind::Assets => "assets",
            EntityKind::Iocs => "iocs",
            EntityKind::Events => "events",
            EntityKind::Tasks => "tasks",
            EntityKind::Notes => "notes",
            EntityKind::Evidences => "evidences",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown entity '{}'", s))
    }
}

impl serde::Serialize for EntityKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for EntityKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
