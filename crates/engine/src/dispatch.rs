// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of snapshots to backends on the writer thread
//!
//! Every backend call runs as its own tokio task and is awaited before the
//! next one starts. A backend that errors or panics is recorded in the
//! writer's error sink; the remaining backends still receive the snapshot.

use el_adapters::{Backend, BackendError};
use el_core::Snapshot;
use el_storage::{ErrorSink, WriteError, WriteTask};
use std::future::Future;
use std::sync::Arc;

/// Ordered, frozen list of backends shared with writer tasks
pub type Backends = Arc<[Arc<dyn Backend>]>;

/// Task that writes `snapshot` to every backend in registration order
pub fn flush_task(snapshot: Arc<Snapshot>, backends: Backends, errors: ErrorSink) -> WriteTask {
    WriteTask::new("logger.flush", async move {
        let failed = dispatch(&snapshot, &backends, &errors).await;
        tracing::debug!(
            records = snapshot.len(),
            backends = backends.len(),
            failed,
            "snapshot dispatched"
        );
        Ok(())
    })
}

/// Task that closes every backend in registration order
pub fn close_task(backends: Backends, errors: ErrorSink) -> WriteTask {
    WriteTask::new("logger.close", async move {
        for backend in backends.iter() {
            let backend = Arc::clone(backend);
            let name = backend.name().to_string();
            isolate(&name, &errors, async move { backend.close().await }).await;
        }
        Ok(())
    })
}

/// Write one snapshot to each backend, returning how many failed
pub async fn dispatch(snapshot: &Arc<Snapshot>, backends: &[Arc<dyn Backend>], errors: &ErrorSink) -> usize {
    let mut failed = 0;
    for backend in backends {
        let backend = Arc::clone(backend);
        let snapshot = Arc::clone(snapshot);
        let name = backend.name().to_string();
        if !isolate(&name, errors, async move { backend.write(&snapshot).await }).await {
            failed += 1;
        }
    }
    failed
}

async fn isolate<F>(name: &str, errors: &ErrorSink, call: F) -> bool
where
    F: Future<Output = Result<(), BackendError>> + Send + 'static,
{
    let message = match tokio::spawn(call).await {
        Ok(Ok(())) => return true,
        Ok(Err(e)) => e.to_string(),
        Err(join_error) if join_error.is_panic() => "backend panicked".to_string(),
        Err(join_error) => join_error.to_string(),
    };
    tracing::warn!(backend = name, error = %message, "backend failed");
    errors.record(WriteError::Backend {
        backend: name.to_string(),
        message,
    });
    false
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
