// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric records and the immutable snapshots handed to backends

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Scalar,
    Vector,
    Image,
    Video,
    Text,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Scalar => "scalar",
            MetricKind::Vector => "vector",
            MetricKind::Image => "image",
            MetricKind::Video => "video",
            MetricKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Raw pixel payload; `shape` is `[H, W, C]` for images, `[T, H, W, C]` for videos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pixels {
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

/// Payload of a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Image(Pixels),
    Video(Pixels),
    Text(String),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Scalar(_) => MetricKind::Scalar,
            MetricValue::Vector(_) => MetricKind::Vector,
            MetricValue::Image(_) => MetricKind::Image,
            MetricValue::Video(_) => MetricKind::Video,
            MetricValue::Text(_) => MetricKind::Text,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Scalar(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        MetricValue::Scalar(f64::from(value))
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Scalar(value as f64)
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(value: Vec<f64>) -> Self {
        MetricValue::Vector(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        MetricValue::Text(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::Text(value.to_string())
    }
}

/// A single metric observation at a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub step: i64,
    pub name: String,
    #[serde(flatten)]
    pub value: MetricValue,
}

impl MetricRecord {
    pub fn new(step: i64, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        Self {
            step,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }
}

/// Immutable capture of buffered metrics, ordered by step then name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<MetricRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricRecord> {
        self.records.iter()
    }

    /// Latest record for `name`
    pub fn get(&self, name: &str) -> Option<&MetricRecord> {
        self.records.iter().rev().find(|r| r.name == name)
    }

    /// Distinct steps in ascending order
    pub fn steps(&self) -> Vec<i64> {
        let mut steps: Vec<i64> = self.records.iter().map(|r| r.step).collect();
        steps.dedup();
        steps
    }
}

impl From<BTreeMap<(i64, String), MetricRecord>> for Snapshot {
    fn from(buffer: BTreeMap<(i64, String), MetricRecord>) -> Self {
        Self {
            records: buffer.into_values().collect(),
        }
    }
}

impl FromIterator<MetricRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = MetricRecord>>(iter: I) -> Self {
        let mut records: Vec<MetricRecord> = iter.into_iter().collect();
        records.sort_by(|a, b| (a.step, &a.name).cmp(&(b.step, &b.name)));
        Self { records }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a MetricRecord;
    type IntoIter = std::slice::Iter<'a, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
#[path = "metric_tests.rs"]
mod tests;
