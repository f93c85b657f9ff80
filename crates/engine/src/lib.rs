// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Metric logging and checkpoint scheduling on a shared background writer

pub mod config;
pub mod dispatch;
mod error;
mod logger;
mod run;

pub use config::{BackendKind, CheckpointConfig, ConfigError, LoggerConfig, RunConfig};
pub use error::EngineError;
pub use logger::Logger;
pub use run::{Run, Tick, STEP_KEY};
