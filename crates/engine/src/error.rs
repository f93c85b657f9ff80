// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the logging and checkpointing engine

use crate::config::ConfigError;
use el_storage::{CheckpointError, WriteError};
use thiserror::Error;

/// Errors that can occur while driving a run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("write error: {0}")]
    Write(#[from] WriteError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to prepare run directory {}: {source}", .path.display())]
    Directory {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
