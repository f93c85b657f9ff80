// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text summary of each flushed step

use super::{Backend, BackendError};
use async_trait::async_trait;
use el_core::{MetricRecord, MetricValue, Snapshot};
use std::io::Write;
use std::sync::Mutex;

/// Prints the scalar and text metrics of every step, one line per step
///
/// ```text
/// step 120 | loss 0.0312 | lr 0.001 | phase warmup
/// ```
pub struct TerminalBackend {
    out: Mutex<Box<dyn Write + Send>>,
}

impl TerminalBackend {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

/// Format a scalar without trailing noise
pub fn format_scalar(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else if value.abs() >= 1e-3 && value.abs() < 1e6 {
        let fixed = format!("{value:.4}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        format!("{value:.3e}")
    }
}

fn format_step(step: i64, records: &[&MetricRecord]) -> Option<String> {
    let fields: Vec<String> = records
        .iter()
        .filter_map(|record| match &record.value {
            MetricValue::Scalar(v) => Some(format!("{} {}", record.name, format_scalar(*v))),
            MetricValue::Text(t) => Some(format!("{} {}", record.name, t)),
            _ => None,
        })
        .collect();
    if fields.is_empty() {
        return None;
    }
    Some(format!("step {} | {}", step, fields.join(" | ")))
}

/// Render every step of a snapshot that has something printable
fn render(snapshot: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();
    for step in snapshot.steps() {
        let records: Vec<&MetricRecord> = snapshot.iter().filter(|r| r.step == step).collect();
        if let Some(line) = format_step(step, &records) {
            lines.push(line);
        }
    }
    lines
}

#[async_trait]
impl Backend for TerminalBackend {
    fn name(&self) -> &str {
        "terminal"
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), BackendError> {
        let lines = render(snapshot);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        for line in lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
