// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON Lines metric file

use super::{Backend, BackendError};
use async_trait::async_trait;
use el_core::Snapshot;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one JSON object per metric record to a `.jsonl` file
///
/// The file and its parent directory are created on the first write.
#[derive(Debug)]
pub struct JsonlBackend {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonlBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<File, BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        tracing::debug!(path = %self.path.display(), "opened metrics file");
        Ok(file)
    }
}

/// Render a snapshot as newline-terminated JSON rows
fn encode_lines(snapshot: &Snapshot) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    for record in snapshot {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

#[async_trait]
impl Backend for JsonlBackend {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        let lines = encode_lines(snapshot)?;
        let mut guard = self.file.lock().await;
        // A handle that failed a write is dropped and reopened next time
        let mut file = match guard.take() {
            Some(file) => file,
            None => self.open().await?,
        };
        file.write_all(&lines).await?;
        file.flush().await?;
        *guard = Some(file);
        Ok(())
    }

    async fn close(&self) -> Result<(), BackendError> {
        if let Some(file) = self.file.lock().await.take() {
            file.sync_all().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
