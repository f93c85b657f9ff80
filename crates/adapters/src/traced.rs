// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use crate::backend::{Backend, BackendError};
use async_trait::async_trait;
use el_core::Snapshot;
use tracing::Instrument;

/// Wrapper that adds tracing to any Backend
#[derive(Clone)]
pub struct TracedBackend<B> {
    inner: B,
}

impl<B> TracedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: Backend> Backend for TracedBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        let span = tracing::info_span!("backend.write", backend = self.inner.name());

        async {
            tracing::debug!(records = snapshot.len(), steps = ?snapshot.steps(), "writing");

            let start = std::time::Instant::now();
            let result = self.inner.write(snapshot).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "written"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "write failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn close(&self) -> Result<(), BackendError> {
        let result = self.inner.close().await;
        match &result {
            Ok(()) => tracing::debug!(backend = self.inner.name(), "closed"),
            Err(e) => tracing::warn!(backend = self.inner.name(), error = %e, "close failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
