// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step counter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing step index
///
/// Serializes to its raw integer so checkpoints stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counter {
    value: i64,
}

impl Counter {
    pub fn new(value: i64) -> Self {
        Self { value }
    }

    pub fn get(&self) -> i64 {
        self.value
    }

    /// Advance by one and return the new value
    pub fn increment(&mut self) -> i64 {
        self.increment_by(1)
    }

    /// Advance by `amount`; negative amounts are ignored
    pub fn increment_by(&mut self, amount: i64) -> i64 {
        self.value = self.value.saturating_add(amount.max(0));
        self.value
    }

    /// Overwrite the value, e.g. when resuming from a checkpoint
    pub fn set(&mut self, value: i64) {
        self.value = value;
    }
}

impl From<Counter> for i64 {
    fn from(counter: Counter) -> Self {
        counter.value
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
#[path = "counter_tests.rs"]
mod tests;
