//! Typed configuration for the upload engine.
//!
//! Parsing a TOML file or overlaying environment variables is left to the
//! embedding application (the framework-wiring concern this crate does not
//! own); this module only defines the shape and defaults of the settings
//! the engine itself consumes, the way `TusOptions` did for the original
//! per-router configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_max_upload_size() -> u64 {
    1024 * 1024 * 1024
}

fn default_expiration_enabled() -> bool {
    true
}

fn default_expiration_timeout_secs() -> u64 {
    24 * 60 * 60
}

fn default_expiration_interval_secs() -> u64 {
    60 * 60
}

/// Settings for the object-storage promotion step.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

/// Settings for the best-effort completion webhook.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CallbackConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// Client-side chunk retry policy (also reused server-side nowhere, but kept
/// alongside the other config structs so the whole system's tunables live
/// in one place).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "RetryConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "RetryConfig::default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    fn default_max_attempts() -> u32 {
        3
    }
    fn default_initial_delay_ms() -> u64 {
        1000
    }
    fn default_max_delay_ms() -> u64 {
        30_000
    }
    fn default_multiplier() -> f64 {
        2.0
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            initial_delay_ms: Self::default_initial_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
            multiplier: Self::default_multiplier(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Local directory staging files are written under.
    pub storage_path: String,

    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Case-insensitive filename suffixes accepted on CREATE. Empty allows all.
    #[serde(default)]
    pub allowed_extensions: Vec<String>,

    #[serde(default = "default_expiration_enabled")]
    pub expiration_enabled: bool,

    #[serde(default = "default_expiration_timeout_secs")]
    pub expiration_timeout_secs: u64,

    #[serde(default = "default_expiration_interval_secs")]
    pub expiration_interval_secs: u64,

    pub object_store: Option<ObjectStoreConfig>,

    #[serde(default)]
    pub callback: CallbackConfig,
}

impl EngineConfig {
    pub fn expiration_timeout(&self) -> Duration {
        Duration::from_secs(self.expiration_timeout_secs)
    }

    pub fn expiration_interval(&self) -> Duration {
        Duration::from_secs(self.expiration_interval_secs)
    }

    pub fn extension_allowed(&self, filename: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }
        let lower = filename.to_ascii_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_ascii_lowercase()))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_path: "./data/uploads".to_string(),
            max_upload_size: default_max_upload_size(),
            allowed_extensions: Vec::new(),
            expiration_enabled: default_expiration_enabled(),
            expiration_timeout_secs: default_expiration_timeout_secs(),
            expiration_interval_secs: default_expiration_interval_secs(),
            object_store: None,
            callback: CallbackConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_upload_size, 1024 * 1024 * 1024);
        assert!(cfg.expiration_enabled);
        assert_eq!(cfg.expiration_timeout_secs, 24 * 60 * 60);
        assert_eq!(cfg.expiration_interval_secs, 60 * 60);
        assert!(cfg.allowed_extensions.is_empty());
    }

    #[test]
    fn extension_allowed_empty_allow_list() {
        let cfg = EngineConfig::default();
        assert!(cfg.extension_allowed("anything.exe"));
    }

    #[test]
    fn extension_allowed_case_insensitive_suffix_match() {
        let mut cfg = EngineConfig::default();
        cfg.allowed_extensions = vec![".PDF".to_string()];
        assert!(cfg.extension_allowed("report.pdf"));
        assert!(!cfg.extension_allowed("picture.png"));
    }

    #[test]
    fn retry_defaults() {
        let r = RetryConfig::default();
        assert_eq!(r.max_attempts, 3);
        assert_eq!(r.initial_delay_ms, 1000);
        assert_eq!(r.max_delay_ms, 30_000);
        assert_eq!(r.multiplier, 2.0);
    }
}
