// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint archive format and atomic publication
//!
//! An archive is written to a uniquely named temporary sibling, synced, and
//! renamed over the canonical file. Readers of the canonical path therefore
//! see either the previous complete archive or the new complete archive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canonical archive file name inside a checkpoint directory
pub const ARCHIVE_FILE: &str = "checkpoint.json";

const TEMP_SUFFIX: &str = ".tmp";

/// Serialized state of one checkpointed object
pub type Payload = serde_json::Value;

/// Errors that can occur while reading or writing archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no checkpoint found at {}", .0.display())]
    Missing(PathBuf),
    #[error("corrupt checkpoint at {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Bundle of payloads keyed by entry name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    /// CRC32 of the serialized entries
    pub checksum: u32,
    pub entries: BTreeMap<String, Payload>,
}

impl Archive {
    /// Current version of the archive format
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(entries: BTreeMap<String, Payload>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            timestamp: Utc::now(),
            checksum: Self::calculate_checksum(&entries),
            entries,
        }
    }

    fn calculate_checksum(entries: &BTreeMap<String, Payload>) -> u32 {
        // Values and string-keyed maps always serialize
        let json = serde_json::to_string(entries).unwrap_or_default();
        crc32fast::hash(json.as_bytes())
    }

    /// Verify the checksum matches the entries
    pub fn verify(&self) -> bool {
        self.checksum == Self::calculate_checksum(&self.entries)
    }

    /// Time elapsed since the archive was created
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.timestamp)
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.entries.get(key)
    }
}

/// Path of the canonical archive inside `directory`
pub fn archive_path(directory: &Path) -> PathBuf {
    directory.join(ARCHIVE_FILE)
}

/// Whether `directory` holds a published archive
pub fn exists(directory: &Path) -> bool {
    archive_path(directory).is_file()
}

/// Read and validate the canonical archive of `directory`
pub fn read(directory: &Path) -> Result<Archive, ArchiveError> {
    let path = archive_path(directory);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ArchiveError::Missing(path)),
        Err(e) => return Err(e.into()),
    };

    let archive: Archive = serde_json::from_slice(&bytes).map_err(|e| ArchiveError::Corrupt {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    if archive.version != Archive::CURRENT_VERSION {
        return Err(ArchiveError::Corrupt {
            path,
            reason: format!(
                "unsupported version: {} (expected {})",
                archive.version,
                Archive::CURRENT_VERSION
            ),
        });
    }
    if !archive.verify() {
        return Err(ArchiveError::Corrupt {
            path,
            reason: "checksum mismatch".to_string(),
        });
    }

    Ok(archive)
}

/// A fully written and synced archive that is not yet visible to readers
///
/// Dropping it without calling [`StagedArchive::commit`] removes the
/// temporary file.
#[derive(Debug)]
pub struct StagedArchive {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedArchive {
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Atomically replace the canonical archive with the staged one
    pub fn commit(mut self) -> Result<PathBuf, ArchiveError> {
        fs::rename(&self.temp, &self.target)?;
        self.committed = true;

        if let Some(parent) = self.target.parent() {
            // Persist the rename itself; not supported on every platform
            if let Err(e) = File::open(parent).and_then(|dir| dir.sync_all()) {
                tracing::debug!(error = %e, "directory sync skipped");
            }
        }
        Ok(self.target.clone())
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = fs::remove_file(&self.temp) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.temp.display(), error = %e, "failed to remove temporary archive");
            }
        }
    }
}

/// Write `archive` to a temporary file in `directory` and sync it
pub fn stage(directory: &Path, archive: &Archive) -> Result<StagedArchive, ArchiveError> {
    fs::create_dir_all(directory)?;

    let staged = StagedArchive {
        temp: directory.join(format!(
            "{}.{}{}",
            ARCHIVE_FILE,
            uuid::Uuid::new_v4().simple(),
            TEMP_SUFFIX
        )),
        target: archive_path(directory),
        committed: false,
    };

    let file = File::create(&staged.temp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, archive)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    Ok(staged)
}

/// Stage and commit in one step
pub fn publish(directory: &Path, archive: &Archive) -> Result<PathBuf, ArchiveError> {
    stage(directory, archive)?.commit()
}

/// Remove temporary archives left behind by interrupted writes
pub fn remove_stale(directory: &Path) -> Result<usize, ArchiveError> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        let is_stale = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(ARCHIVE_FILE) && n.ends_with(TEMP_SUFFIX))
            .unwrap_or(false);
        if is_stale {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
