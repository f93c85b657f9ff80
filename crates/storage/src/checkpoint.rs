// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpointing of externally owned objects
//!
//! Payloads are captured synchronously on the caller's thread, while the
//! objects are in a consistent state. Serializing and publishing the archive
//! happens on the writer thread.

use crate::archive::{self, ArchiveError, Payload};
use crate::writer::{AsyncWriter, WriteError, WriteTask};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during checkpoint operations
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("write error: {0}")]
    Write(#[from] WriteError),
    #[error("key '{0}' not found in checkpoint")]
    MissingKey(String),
    #[error("no entry named '{0}' is attached")]
    UnknownEntry(String),
    #[error("entry '{0}' was dropped while still attached")]
    EntryDropped(String),
    #[error("entry name '{0}' is reserved")]
    ReservedName(String),
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("entry '{key}': {source}")]
    Entry {
        key: String,
        #[source]
        source: Box<CheckpointError>,
    },
}

/// An object whose state can be captured into and restored from a payload
pub trait Checkpointable: Send {
    fn save(&self) -> Result<Payload, CheckpointError>;
    fn load(&mut self, payload: Payload) -> Result<(), CheckpointError>;
}

/// Where and what to save
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Defaults to the checkpoint's own directory
    pub directory: Option<PathBuf>,
    /// Defaults to every attached entry
    pub keys: Option<Vec<String>>,
}

/// Where and what to load
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Defaults to the checkpoint's own directory
    pub directory: Option<PathBuf>,
    /// Defaults to every attached entry present in the archive; explicit
    /// keys must all be present
    pub keys: Option<Vec<String>>,
}

/// Outcome of [`Checkpoint::load_or_save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// An existing checkpoint was restored
    Loaded,
    /// No checkpoint existed; the current state was saved
    Saved,
}

struct Entry {
    name: String,
    handle: Weak<Mutex<dyn Checkpointable>>,
}

impl Entry {
    fn with_object<R>(
        &self,
        f: impl FnOnce(&mut dyn Checkpointable) -> Result<R, CheckpointError>,
    ) -> Result<R, CheckpointError> {
        let object = self
            .handle
            .upgrade()
            .ok_or_else(|| CheckpointError::EntryDropped(self.name.clone()))?;
        let mut guard = object.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard).map_err(|source| CheckpointError::Entry {
            key: self.name.clone(),
            source: Box::new(source),
        })
    }
}

/// Named, non-owning references to checkpointable objects
pub struct Checkpoint {
    directory: PathBuf,
    entries: Vec<Entry>,
    writer: Arc<AsyncWriter>,
    write: bool,
}

impl Checkpoint {
    pub fn new(directory: impl Into<PathBuf>, writer: Arc<AsyncWriter>) -> Self {
        Self {
            directory: directory.into(),
            entries: Vec::new(),
            writer,
            write: true,
        }
    }

    /// With `write == false`, saves capture payloads but never touch disk
    pub fn with_write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Attached entry names in attach order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Register `object` under `name`, replacing any previous entry
    ///
    /// Only a weak handle is kept; the caller remains the owner.
    pub fn attach<T>(&mut self, name: &str, object: &Arc<Mutex<T>>) -> Result<(), CheckpointError>
    where
        T: Checkpointable + 'static,
    {
        if name.is_empty() || name.starts_with('_') {
            return Err(CheckpointError::ReservedName(name.to_string()));
        }
        let object: Arc<Mutex<dyn Checkpointable>> = object.clone();
        let handle = Arc::downgrade(&object);

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.handle = handle,
            None => self.entries.push(Entry {
                name: name.to_string(),
                handle,
            }),
        }
        Ok(())
    }

    pub fn detach(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    /// Whether a published archive exists in the checkpoint directory
    pub fn exists(&self) -> bool {
        archive::exists(&self.directory)
    }

    pub fn save(&self) -> Result<(), CheckpointError> {
        self.save_with(SaveOptions::default())
    }

    /// Capture payloads now and queue the archive for atomic publication
    pub fn save_with(&self, options: SaveOptions) -> Result<(), CheckpointError> {
        let directory = options.directory.unwrap_or_else(|| self.directory.clone());
        let selected = self.select(options.keys.as_deref())?;

        let span = tracing::info_span!("checkpoint.save", directory = %directory.display());
        let _guard = span.enter();

        let mut payloads = BTreeMap::new();
        for entry in selected {
            let payload = entry.with_object(|object| object.save())?;
            payloads.insert(entry.name.clone(), payload);
        }

        if !self.write {
            debug!(entries = payloads.len(), "checkpoint writing disabled");
            return Ok(());
        }

        info!(entries = payloads.len(), "writing checkpoint");
        let archive = archive::Archive::new(payloads);
        self.writer
            .submit(WriteTask::blocking("checkpoint.save", move || {
                let path = archive::publish(&directory, &archive)?;
                info!(path = %path.display(), "wrote checkpoint");
                Ok(())
            }))?;
        Ok(())
    }

    pub fn load(&self) -> Result<(), CheckpointError> {
        self.load_with(LoadOptions::default())
    }

    /// Restore attached objects from an archive, after pending saves land
    pub fn load_with(&self, options: LoadOptions) -> Result<(), CheckpointError> {
        self.settle();

        let directory = options.directory.unwrap_or_else(|| self.directory.clone());
        let span = tracing::info_span!("checkpoint.load", directory = %directory.display());
        let _guard = span.enter();

        let archive = archive::read(&directory)?;
        let explicit = options.keys.is_some();
        let mut selected = self.select(options.keys.as_deref())?;

        // Check every key before touching any object
        if explicit {
            if let Some(missing) = selected.iter().find(|e| !archive.entries.contains_key(&e.name)) {
                return Err(CheckpointError::MissingKey(missing.name.clone()));
            }
        } else {
            selected.retain(|e| {
                let present = archive.entries.contains_key(&e.name);
                if !present {
                    info!(key = %e.name, "entry not in checkpoint, keeping current state");
                }
                present
            });
        }
        for key in archive.entries.keys() {
            if !self.entries.iter().any(|e| &e.name == key) {
                debug!(key, "ignoring archive entry with no attached object");
            }
        }

        for entry in &selected {
            let payload = archive.entries[&entry.name].clone();
            entry.with_object(|object| object.load(payload))?;
        }

        info!(
            entries = selected.len(),
            age_secs = archive.age().num_seconds(),
            "loaded checkpoint"
        );
        Ok(())
    }

    /// Resume from an existing checkpoint, or write the initial one
    pub fn load_or_save(&self) -> Result<Resume, CheckpointError> {
        self.settle();
        match archive::remove_stale(&self.directory) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "removed interrupted checkpoint writes"),
            Err(e) => warn!(error = %e, "failed to scan for interrupted checkpoint writes"),
        }

        if self.exists() {
            info!(directory = %self.directory.display(), "found existing checkpoint");
            self.load()?;
            Ok(Resume::Loaded)
        } else {
            info!(directory = %self.directory.display(), "did not find any checkpoint");
            self.save()?;
            Ok(Resume::Saved)
        }
    }

    fn settle(&self) {
        // A closed writer has already run every save
        if let Err(e) = self.writer.wait() {
            debug!(error = %e, "writer not waited on");
        }
    }

    fn select(&self, keys: Option<&[String]>) -> Result<Vec<&Entry>, CheckpointError> {
        let Some(keys) = keys else {
            return Ok(self.entries.iter().collect());
        };
        keys.iter()
            .map(|key| {
                self.entries
                    .iter()
                    .find(|e| &e.name == key)
                    .ok_or_else(|| CheckpointError::UnknownEntry(key.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
