// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! el-storage: background writes and durable checkpoints
//!
//! This crate provides:
//! - A single-worker writer that runs tasks in submission order
//! - A versioned, checksummed archive format published by atomic rename
//! - Checkpoints over named, caller-owned objects

pub mod archive;
pub mod checkpoint;
pub mod saveable;
pub mod writer;

pub use archive::{Archive, ArchiveError, Payload, ARCHIVE_FILE};
pub use checkpoint::{
    Checkpoint, CheckpointError, Checkpointable, LoadOptions, Resume, SaveOptions,
};
pub use saveable::{from_payload, to_payload, Saveable};
pub use writer::{AsyncWriter, ErrorSink, WriteError, WriteTask};
