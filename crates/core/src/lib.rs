// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! el-core: leaf types for the elements persistence pipeline
//!
//! This crate provides:
//! - A clock abstraction with a controllable fake for tests
//! - The step counter
//! - Triggers that decide when logging or checkpointing is due
//! - The metric model handed to output backends
//! - An aggregator that reduces repeated values between flushes

pub mod agg;
pub mod clock;
pub mod counter;
pub mod metric;
pub mod when;

// Re-exports
pub use agg::{Agg, AggError, Reduce};
pub use clock::{Clock, FakeClock, SystemClock};
pub use counter::Counter;
pub use metric::{MetricKind, MetricRecord, MetricValue, Snapshot};
pub use when::{Every, Once, Ratio, Trigger, Until};
