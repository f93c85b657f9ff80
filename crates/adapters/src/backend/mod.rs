// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric output backends

mod jsonl;
mod noop;
mod terminal;
mod webhook;

pub use jsonl::JsonlBackend;
pub use noop::NoOpBackend;
pub use terminal::{format_scalar, TerminalBackend};
pub use webhook::WebhookBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FailingBackend, FakeBackend};

use async_trait::async_trait;
use el_core::Snapshot;
use thiserror::Error;

/// Errors from backend writes
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("rejected with status {status}")]
    Rejected { status: u16 },
}

/// Destination for flushed metric snapshots
///
/// Writes for one logger happen one snapshot at a time, in flush order.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Short name used in logs and error reports
    fn name(&self) -> &str;

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError>;

    /// Release held resources; called once when the run closes
    async fn close(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
