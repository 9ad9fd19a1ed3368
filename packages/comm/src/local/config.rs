//! Configuration for the local reference cluster.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CommError, Result};

/// Configuration for a [`LocalCluster`](super::LocalCluster).
///
/// Loaded from JSON; every field is optional:
///
/// ```json
/// {"participants": 4, "memory_per_participant": 1073741824, "memory_overrides": {"2": 0}}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalConfig {
    /// Number of participants in the world.
    pub participants: usize,

    /// Memory, in bytes, reported for each participant.
    pub memory_per_participant: u64,

    /// Per-rank replacements for `memory_per_participant`.
    pub memory_overrides: BTreeMap<usize, u64>,

    /// Upper bound on `participants`.
    pub max_participants: usize,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            participants: 1,
            memory_per_participant: 1 << 30,
            memory_overrides: BTreeMap::new(),
            max_participants: 1024,
        }
    }
}

impl LocalConfig {
    /// A configuration with `participants` ranks and default memory.
    pub fn with_participants(participants: usize) -> Self {
        Self {
            participants,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Memory reported for `rank`.
    pub fn memory_of(&self, rank: usize) -> u64 {
        self.memory_overrides
            .get(&rank)
            .copied()
            .unwrap_or(self.memory_per_participant)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.participants == 0 {
            return Err(CommError::Config(
                "a cluster needs at least one participant".to_string(),
            ));
        }
        if self.participants > self.max_participants {
            return Err(CommError::ResourceExhausted(format!(
                "{} participants requested, at most {} allowed",
                self.participants, self.max_participants
            )));
        }
        if let Some(rank) = self
            .memory_overrides
            .keys()
            .find(|rank| **rank >= self.participants)
        {
            return Err(CommError::Config(format!(
                "memory override for rank {} but only {} participants",
                rank, self.participants
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_default() {
        let config = LocalConfig::default();
        assert_eq!(config.participants, 1);
        assert_eq!(config.memory_per_participant, 1 << 30);
        assert_eq!(config.max_participants, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = LocalConfig::from_json(r#"{"participants": 3}"#).unwrap();
        assert_eq!(config.participants, 3);
        assert_eq!(config.memory_per_participant, 1 << 30);
    }

    #[test]
    fn memory_overrides() {
        let config = LocalConfig::from_json(
            r#"{"participants": 3, "memory_per_participant": 100, "memory_overrides": {"1": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.memory_of(0), 100);
        assert_eq!(config.memory_of(1), 5);
        assert_eq!(config.memory_of(2), 100);
    }

    #[test]
    fn zero_participants_rejected() {
        let config = LocalConfig::with_participants(0);
        assert!(matches!(config.validate(), Err(CommError::Config(_))));
    }

    #[test]
    fn too_many_participants_exhausts() {
        let config = LocalConfig {
            participants: 8,
            max_participants: 4,
            ..LocalConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CommError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn override_for_missing_rank_rejected() {
        let mut config = LocalConfig::with_participants(2);
        config.memory_overrides.insert(5, 1);
        assert!(matches!(config.validate(), Err(CommError::Config(_))));
    }

    #[test]
    fn invalid_json_is_config_error() {
        assert!(matches!(
            LocalConfig::from_json("{participants"),
            Err(CommError::Config(_))
        ));
    }

    #[test]
    fn from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"participants": 2, "memory_per_participant": 64}}"#).unwrap();
        let config = LocalConfig::from_file(file.path()).unwrap();
        assert_eq!(config.participants, 2);
        assert_eq!(config.memory_of(1), 64);
    }
}
