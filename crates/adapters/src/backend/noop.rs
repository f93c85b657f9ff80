// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op backend for when metric output is disabled.

use super::{Backend, BackendError};
use async_trait::async_trait;
use el_core::Snapshot;

/// Backend that discards every snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpBackend;

impl NoOpBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for NoOpBackend {
    fn name(&self) -> &str {
        "noop"
    }

    async fn write(&self, _snapshot: &Snapshot) -> Result<(), BackendError> {
        Ok(())
    }
}
