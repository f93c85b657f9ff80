// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backends for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Backend, BackendError};
use async_trait::async_trait;
use el_core::Snapshot;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend that records every snapshot it receives
#[derive(Clone, Default)]
pub struct FakeBackend {
    name: String,
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    delay: Option<Duration>,
    closed: Arc<Mutex<bool>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::named("fake")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Sleep before recording each snapshot
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all recorded snapshots in arrival order
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Steps of every recorded record, in arrival order
    pub fn steps(&self) -> Vec<i64> {
        self.snapshots()
            .iter()
            .flat_map(|s| s.iter().map(|r| r.step).collect::<Vec<_>>())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(())
    }
}

/// Backend whose writes always fail, or panic when asked to
#[derive(Clone, Default)]
pub struct FailingBackend {
    attempts: Arc<Mutex<usize>>,
    panics: bool,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panic inside `write` instead of returning an error
    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Backend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    #[allow(clippy::panic)]
    async fn write(&self, _snapshot: &Snapshot) -> Result<(), BackendError> {
        *self.attempts.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        if self.panics {
            panic!("backend exploded");
        }
        Err(BackendError::Http("connection refused".to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
