// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics file viewer

use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use el_adapters::format_scalar;
use el_core::{MetricRecord, MetricValue};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub struct MetricsArgs {
    /// JSONL metrics file, or a run directory containing `metrics.jsonl`
    file: PathBuf,

    /// Number of rows to show, counted from the end
    #[arg(long, default_value = "20")]
    tail: usize,

    /// Only show metrics with this name
    #[arg(long)]
    name: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

/// One printed row
#[derive(Serialize)]
#[serde(transparent)]
struct Row(MetricRecord);

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match &self.0.value {
            MetricValue::Scalar(v) => format_scalar(*v),
            MetricValue::Text(t) => t.clone(),
            MetricValue::Vector(values) => format!("vector[{}]", values.len()),
            MetricValue::Image(p) | MetricValue::Video(p) => format!(
                "{}[{}]",
                self.0.kind(),
                p.shape
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join("x")
            ),
        };
        write!(f, "{:>8}  {:<24} {}", self.0.step, self.0.name, value)
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join("metrics.jsonl")
    } else {
        path.to_path_buf()
    }
}

/// Parse every well-formed row, skipping and reporting the rest
fn parse(content: &str) -> Vec<MetricRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "skipping malformed metrics row");
                None
            }
        })
        .collect()
}

pub fn handle(args: MetricsArgs) -> Result<()> {
    let path = resolve(&args.file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read metrics from {}", path.display()))?;

    let mut rows: Vec<Row> = parse(&content)
        .into_iter()
        .filter(|r| match &args.name {
            Some(name) => &r.name == name,
            None => true,
        })
        .map(Row)
        .collect();
    let skip = rows.len().saturating_sub(args.tail);
    let rows = rows.split_off(skip);

    if rows.is_empty() && matches!(args.output, OutputFormat::Text) {
        println!("No metrics");
        return Ok(());
    }
    output::print_list(&rows, args.output)
}
