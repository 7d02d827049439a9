// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration
//!
//! ```toml
//! log_tail_capacity = 5000
//! serializable_by_default = false
//! shutdown_grace = "10s"
//! inherit_caller_context = true
//! ```

use burrow_core::{SerializabilityGate, DEFAULT_LOG_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading an engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Records retained per job log tail
    pub log_tail_capacity: usize,
    /// Keep every record, ignoring `log_tail_capacity`
    pub unbounded_log_tail: bool,
    /// Gate policy when no checker decides
    pub serializable_by_default: bool,
    /// How long `shutdown` waits for cancelled jobs to wind down
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
    /// Whether submitted jobs inherit from the caller's context
    pub inherit_caller_context: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_tail_capacity: DEFAULT_LOG_CAPACITY,
            unbounded_log_tail: false,
            serializable_by_default: true,
            shutdown_grace: Duration::from_secs(30),
            inherit_caller_context: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be honoured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unbounded_log_tail && self.log_tail_capacity == 0 {
            return Err(ConfigError::Invalid(
                "log_tail_capacity must be at least 1; use unbounded_log_tail to keep everything"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    /// Log tail capacity as a job environment expects it
    pub fn tail_capacity(&self) -> Option<usize> {
        if self.unbounded_log_tail {
            None
        } else {
            Some(self.log_tail_capacity)
        }
    }

    /// An empty gate applying this configuration's default policy
    pub fn gate(&self) -> SerializabilityGate {
        SerializabilityGate::new(self.serializable_by_default)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
