//! Registry configuration
//!
//! Controls how large a component storage's sparse index may grow. The limit
//! stops a stray or hostile entity id from forcing a huge allocation.
//!
//! ```toml
//! initial_sparse_capacity = 1024
//! max_sparse_capacity = 1000000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Sizing limits applied to every component storage in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Sparse index length a new storage starts with (clamped to the maximum).
    pub initial_sparse_capacity: usize,
    /// Hard upper bound on a storage's sparse index length.
    pub max_sparse_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_sparse_capacity: 1024,
            max_sparse_capacity: 1_000_000,
        }
    }
}

impl RegistryConfig {
    /// Config with the given maximum and an initial capacity that fits under it.
    pub fn with_max_sparse_capacity(max_sparse_capacity: usize) -> Self {
        let defaults = Self::default();
        Self {
            initial_sparse_capacity: defaults.initial_sparse_capacity.min(max_sparse_capacity),
            max_sparse_capacity,
        }
    }

    /// Initial sparse length actually used by new storages.
    pub fn effective_initial_capacity(&self) -> usize {
        self.initial_sparse_capacity.min(self.max_sparse_capacity)
    }

    /// Reject configurations no storage could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sparse_capacity == 0 {
            return Err(ConfigError::Invalid(
                "max_sparse_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded registry config from {:?}", path);
        Ok(config)
    }

    /// Load a config file, or return defaults if it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No registry config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load registry config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Serialize to a TOML document.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = RegistryConfig::default();
        assert_eq!(config.initial_sparse_capacity, 1024);
        assert_eq!(config.max_sparse_capacity, 1_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = RegistryConfig::from_toml_str("max_sparse_capacity = 100").unwrap();
        assert_eq!(config.max_sparse_capacity, 100);
        assert_eq!(config.initial_sparse_capacity, 1024);
        assert_eq!(config.effective_initial_capacity(), 100);
    }

    #[test]
    fn zero_max_rejected() {
        let err = RegistryConfig::from_toml_str("max_sparse_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = RegistryConfig::from_toml_str("max_sparse_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn with_max_clamps_initial() {
        let config = RegistryConfig::with_max_sparse_capacity(16);
        assert_eq!(config.initial_sparse_capacity, 16);
        assert_eq!(config.max_sparse_capacity, 16);
    }

    #[test]
    fn load_from_file_and_fallback() {
        let dir = std::env::temp_dir().join(format!("tessera-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let path = dir.join("registry.toml");
        let config = RegistryConfig {
            initial_sparse_capacity: 32,
            max_sparse_capacity: 4096,
        };
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(RegistryConfig::load(&path).unwrap(), config);

        let missing = dir.join("missing.toml");
        assert!(matches!(
            RegistryConfig::load(&missing),
            Err(ConfigError::Io(_, _))
        ));
        assert_eq!(
            RegistryConfig::load_or_default(&missing),
            RegistryConfig::default()
        );

        fs::write(&path, "max_sparse_capacity = 0").unwrap();
        assert_eq!(
            RegistryConfig::load_or_default(&path),
            RegistryConfig::default()
        );

        fs::remove_dir_all(&dir).unwrap();
    }
}
