// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric logger
//!
//! Values are buffered in memory on the caller's thread. `flush` moves the
//! buffer into an immutable snapshot and queues it on the writer; backends
//! see snapshots in flush order.

use crate::dispatch::{self, Backends};
use el_adapters::Backend;
use el_core::metric::Pixels;
use el_core::{MetricRecord, MetricValue, Snapshot};
use el_storage::{AsyncWriter, WriteError};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Buffers metrics per step and hands them to backends on flush
pub struct Logger {
    buffer: BTreeMap<(i64, String), MetricRecord>,
    backends: Backends,
    writer: Arc<AsyncWriter>,
}

impl Logger {
    pub fn new(writer: Arc<AsyncWriter>, backends: Vec<Arc<dyn Backend>>) -> Self {
        Self {
            buffer: BTreeMap::new(),
            backends: Arc::from(backends),
            writer,
        }
    }

    pub fn backends(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.name())
    }

    /// Record a value; a later value for the same name and step replaces it
    pub fn accumulate(&mut self, name: &str, value: impl Into<MetricValue>, step: i64) {
        let record = MetricRecord::new(step, name, value);
        self.buffer.insert((step, name.to_string()), record);
    }

    pub fn scalar(&mut self, name: &str, value: f64, step: i64) {
        self.accumulate(name, MetricValue::Scalar(value), step);
    }

    pub fn vector(&mut self, name: &str, values: Vec<f64>, step: i64) {
        self.accumulate(name, MetricValue::Vector(values), step);
    }

    pub fn image(&mut self, name: &str, pixels: Pixels, step: i64) {
        self.accumulate(name, MetricValue::Image(pixels), step);
    }

    pub fn video(&mut self, name: &str, frames: Pixels, step: i64) {
        self.accumulate(name, MetricValue::Video(frames), step);
    }

    pub fn text(&mut self, name: &str, text: impl Into<String>, step: i64) {
        self.accumulate(name, MetricValue::Text(text.into()), step);
    }

    /// Accumulate every entry of `values`, naming each `prefix/key`
    pub fn add<I, K, V>(&mut self, values: I, prefix: &str, step: i64)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetricValue>,
    {
        for (key, value) in values {
            let name = if prefix.is_empty() {
                key.as_ref().to_string()
            } else {
                format!("{}/{}", prefix, key.as_ref())
            };
            self.accumulate(&name, value, step);
        }
    }

    /// Records buffered since the last flush
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Queue everything buffered so far for the backends
    ///
    /// Returns as soon as the snapshot is queued. On a closed writer the
    /// buffer is kept and [`WriteError::Closed`] is returned.
    pub fn flush(&mut self) -> Result<(), WriteError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if self.writer.is_closed() {
            return Err(WriteError::Closed);
        }

        let snapshot = Arc::new(Snapshot::from(std::mem::take(&mut self.buffer)));
        tracing::debug!(records = snapshot.len(), steps = ?snapshot.steps(), "flushing metrics");
        self.writer.submit(dispatch::flush_task(
            snapshot,
            Arc::clone(&self.backends),
            self.writer.errors(),
        ))
    }

    /// Flush, then queue closing every backend behind it
    pub fn close(&mut self) -> Result<(), WriteError> {
        self.flush()?;
        self.writer.submit(dispatch::close_task(
            Arc::clone(&self.backends),
            self.writer.errors(),
        ))
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
