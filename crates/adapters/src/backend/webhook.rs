// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP webhook receiving each snapshot as a JSON array

use super::{Backend, BackendError};
use async_trait::async_trait;
use el_core::Snapshot;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs every snapshot to a fixed URL
///
/// The request is blocking and runs on tokio's blocking pool.
#[derive(Clone)]
pub struct WebhookBackend {
    url: String,
    agent: ureq::Agent,
}

impl WebhookBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            url: url.into(),
            agent,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn post(agent: &ureq::Agent, url: &str, body: &[u8]) -> Result<(), BackendError> {
    match agent
        .post(url)
        .header("Content-Type", "application/json")
        .send(body)
    {
        Ok(_) => Ok(()),
        Err(ureq::Error::StatusCode(status)) => Err(BackendError::Rejected { status }),
        Err(e) => Err(BackendError::Http(e.to_string())),
    }
}

#[async_trait]
impl Backend for WebhookBackend {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        let body = serde_json::to_vec(snapshot)?;
        let agent = self.agent.clone();
        let url = self.url.clone();
        tracing::trace!(url = %url, bytes = body.len(), "posting snapshot");

        tokio::task::spawn_blocking(move || post(&agent, &url, &body))
            .await
            .map_err(|e| BackendError::Http(format!("request task failed: {e}")))?
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
