//! Escrow agreement configuration.
//!
//! Loaded from the environment with [`EscrowConfig::from_env`] or from YAML
//! with [`EscrowConfig::from_yaml_str`]. Both fall back to
//! [`EscrowConfig::default`] for anything unset.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_RATING_WINDOW_SECS: u64 = 7 * 86_400;

/// Configuration for escrow agreements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// How long after settlement the parties may rate the arbitrator.
    #[serde(with = "arb_core::duration_secs")]
    pub rating_window: Duration,
    /// Whether a rating window opens at all.
    pub rating_enabled: bool,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            rating_window: Duration::from_secs(DEFAULT_RATING_WINDOW_SECS),
            rating_enabled: true,
        }
    }
}

impl EscrowConfig {
    /// Load configuration from environment variables.
    ///
    /// - `ESCROW_RATING_WINDOW_SECS` (default: 7 days)
    /// - `ESCROW_RATING_ENABLED` (`true`/`false`/`1`/`0`, default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let rating_window = match std::env::var("ESCROW_RATING_WINDOW_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ConfigError::InvalidValue("ESCROW_RATING_WINDOW_SECS".to_string(), raw)
            })?,
            Err(_) => defaults.rating_window,
        };
        let rating_enabled = match std::env::var("ESCROW_RATING_ENABLED") {
            Ok(raw) => parse_flag(&raw)
                .ok_or_else(|| ConfigError::InvalidValue("ESCROW_RATING_ENABLED".to_string(), raw))?,
            Err(_) => defaults.rating_enabled,
        };
        Ok(Self {
            rating_window,
            rating_enabled,
        })
    }

    /// Parse configuration from a YAML document. Missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held an unparseable value.
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    /// The YAML document did not parse.
    #[error("invalid escrow YAML: {0}")]
    Yaml(String),
}
