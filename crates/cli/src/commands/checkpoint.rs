// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint inspection

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use el_storage::archive;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(clap::Args)]
pub struct CheckpointArgs {
    /// Checkpoint directory, or a run directory containing `checkpoint/`
    dir: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(Serialize)]
struct EntrySummary {
    name: String,
    bytes: usize,
}

#[derive(Serialize)]
struct CheckpointSummary {
    path: PathBuf,
    version: u32,
    timestamp: String,
    age_secs: u64,
    checksum: String,
    entries: Vec<EntrySummary>,
}

impl fmt::Display for CheckpointSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let age = humantime::format_duration(Duration::from_secs(self.age_secs));
        writeln!(f, "Checkpoint: {}", self.path.display())?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Created: {} ({} ago)", self.timestamp, age)?;
        writeln!(f, "  Checksum: {} (verified)", self.checksum)?;
        write!(f, "  Entries: {}", self.entries.len())?;
        for entry in &self.entries {
            write!(f, "\n    {:<24} {} B", entry.name, entry.bytes)?;
        }
        Ok(())
    }
}

/// Accept either the checkpoint directory itself or its run directory
fn resolve(dir: &Path) -> PathBuf {
    let nested = dir.join("checkpoint");
    if !archive::exists(dir) && archive::exists(&nested) {
        nested
    } else {
        dir.to_path_buf()
    }
}

pub fn handle(args: CheckpointArgs) -> Result<()> {
    let dir = resolve(&args.dir);
    let archive = archive::read(&dir)
        .with_context(|| format!("cannot open checkpoint in {}", args.dir.display()))?;

    let entries = archive
        .entries
        .iter()
        .map(|(name, payload)| EntrySummary {
            name: name.clone(),
            bytes: payload.to_string().len(),
        })
        .collect();

    let summary = CheckpointSummary {
        path: archive::archive_path(&dir),
        version: archive.version,
        timestamp: archive.timestamp.to_rfc3339(),
        age_secs: archive.age().num_seconds().max(0) as u64,
        checksum: format!("{:08x}", archive.checksum),
        entries,
    };
    output::print(&summary, args.output)
}
