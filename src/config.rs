//! Adapter configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration for a [`OneToNAdapter`](crate::OneToNAdapter).
///
/// Fixed at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Compute one-hot targets per batch instead of caching a dense
    /// `[dataset_size, num_entities]` matrix (default: false).
    ///
    /// - `false`: O(dataset × vocabulary) memory, fast repeated epochs.
    /// - `true`: O(batch × vocabulary) memory, recomputed every pass.
    pub low_memory: bool,
}

impl AdapterConfig {
    /// Set low-memory mode (per-batch target encoding).
    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_eager() {
        assert!(!AdapterConfig::default().low_memory);
        assert!(AdapterConfig::default().with_low_memory(true).low_memory);
    }

    #[test]
    fn test_from_json() {
        let config = AdapterConfig::from_json(r#"{"low_memory": true}"#).unwrap();
        assert!(config.low_memory);

        let config = AdapterConfig::from_json("{}").unwrap();
        assert_eq!(config, AdapterConfig::default());

        assert!(AdapterConfig::from_json("{low_memory").is_err());
    }
}
