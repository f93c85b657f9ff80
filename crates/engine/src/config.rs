// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration loaded from TOML
//!
//! ```toml
//! [logger]
//! log_every = 10
//! backends = ["terminal", "jsonl"]
//! jsonl_path = "metrics.jsonl"
//!
//! [checkpoint]
//! every = "10m"
//! write = true
//! ```

use el_adapters::{
    Backend, JsonlBackend, NoOpBackend, TerminalBackend, TracedBackend, WebhookBackend,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating a run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Output backend selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Terminal,
    Jsonl,
    Webhook,
    Noop,
}

/// Complete configuration of a run
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub logger: LoggerConfig,
    pub checkpoint: CheckpointConfig,
}

/// Metric logging settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    /// Steps between flushes; 0 disables periodic flushing
    pub log_every: i64,
    pub backends: Vec<BackendKind>,
    /// Relative paths resolve against the run directory
    pub jsonl_path: PathBuf,
    pub webhook_url: Option<String>,
    #[serde(with = "humantime_serde")]
    pub webhook_timeout: Option<Duration>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_every: 10,
            backends: vec![BackendKind::Terminal, BackendKind::Jsonl],
            jsonl_path: PathBuf::from("metrics.jsonl"),
            webhook_url: None,
            webhook_timeout: None,
        }
    }
}

/// Checkpoint settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckpointConfig {
    /// Wall-clock period between saves
    #[serde(with = "humantime_serde")]
    pub every: Duration,
    /// When false, saves are collected but never written
    pub write: bool,
    /// Relative paths resolve against the run directory
    pub directory: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            every: Duration::from_secs(600),
            write: true,
            directory: PathBuf::from("checkpoint"),
        }
    }
}

impl RunConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logger.log_every < 0 {
            return Err(ConfigError::Invalid(format!(
                "logger.log_every must not be negative, got {}",
                self.logger.log_every
            )));
        }
        if self.logger.backends.contains(&BackendKind::Webhook)
            && self.logger.webhook_url.is_none()
        {
            return Err(ConfigError::Invalid(
                "webhook backend requires logger.webhook_url".to_string(),
            ));
        }
        Ok(())
    }

    /// Checkpoint directory for a run rooted at `run_dir`
    pub fn checkpoint_dir(&self, run_dir: &Path) -> PathBuf {
        run_dir.join(&self.checkpoint.directory)
    }

    /// Instantiate the configured backends, each wrapped with tracing
    pub fn build_backends(&self, run_dir: &Path) -> Result<Vec<Arc<dyn Backend>>, ConfigError> {
        self.validate()?;
        let mut backends: Vec<Arc<dyn Backend>> = Vec::new();
        for kind in &self.logger.backends {
            let backend: Arc<dyn Backend> = match kind {
                BackendKind::Terminal => Arc::new(TracedBackend::new(TerminalBackend::stdout())),
                BackendKind::Jsonl => Arc::new(TracedBackend::new(JsonlBackend::new(
                    run_dir.join(&self.logger.jsonl_path),
                ))),
                BackendKind::Webhook => {
                    let url = self.logger.webhook_url.clone().unwrap_or_default();
                    let webhook = match self.logger.webhook_timeout {
                        Some(timeout) => WebhookBackend::with_timeout(url, timeout),
                        None => WebhookBackend::new(url),
                    };
                    Arc::new(TracedBackend::new(webhook))
                }
                BackendKind::Noop => Arc::new(NoOpBackend::new()),
            };
            backends.push(backend);
        }
        Ok(backends)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
