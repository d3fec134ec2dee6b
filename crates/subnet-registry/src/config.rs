//! Configuration structures for the subnet registry

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Subnet registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Name-server hostname to use for new subnets instead of guessing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ns_hostname: Option<String>,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the sled database
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Use a transient in-memory store instead of the database
    #[serde(default)]
    pub in_memory: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("/var/lib/subnet-registry/subnets.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            in_memory: false,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            ns_hostname: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        // Try YAML first, then JSON
        if path.extension().and_then(|s| s.to_str()) == Some("yaml")
            || path.extension().and_then(|s| s.to_str()) == Some("yml")
        {
            Ok(serde_yaml::from_str(&contents)?)
        } else {
            Ok(serde_json::from_str(&contents)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = RegistryConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: RegistryConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.store.db_path, config.store.db_path);
        assert!(!parsed.store.in_memory);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: RegistryConfig = serde_yaml::from_str("store:\n  in_memory: true\n").unwrap();
        assert!(parsed.store.in_memory);
        assert_eq!(parsed.store.db_path, default_db_path());
        assert!(parsed.ns_hostname.is_none());
    }
}
