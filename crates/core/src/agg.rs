// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregation of repeated metric values between flushes

use crate::metric::MetricValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while aggregating
#[derive(Debug, Error, PartialEq)]
pub enum AggError {
    #[error("cannot reduce {kind} metric '{name}' with {reduce:?}")]
    Unsupported {
        name: String,
        kind: crate::metric::MetricKind,
        reduce: Reduce,
    },
    #[error("metric '{name}' changed shape: expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("metric '{name}' changed kind")]
    KindMismatch { name: String },
}

/// Reduction applied to repeated values of one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Mean,
    Sum,
    Min,
    Max,
    Last,
    /// Concatenate values into one vector
    Stack,
}

impl Reduce {
    /// Default reduction: text and media keep the last value, scalars
    /// average, vectors concatenate
    pub fn infer(value: &MetricValue) -> Self {
        match value {
            MetricValue::Scalar(_) => Reduce::Mean,
            MetricValue::Vector(_) => Reduce::Stack,
            _ => Reduce::Last,
        }
    }
}

#[derive(Debug, Clone)]
enum Numbers {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Numbers {
    fn has_nan(&self) -> bool {
        match self {
            Numbers::Scalar(v) => v.is_nan(),
            Numbers::Vector(v) => v.iter().any(|x| x.is_nan()),
        }
    }

    fn combine(&mut self, other: Numbers, name: &str, op: fn(f64, f64) -> f64) -> Result<(), AggError> {
        match (self, other) {
            (Numbers::Scalar(a), Numbers::Scalar(b)) => *a = op(*a, b),
            (Numbers::Vector(a), Numbers::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(AggError::ShapeMismatch {
                        name: name.to_string(),
                        expected: a.len(),
                        actual: b.len(),
                    });
                }
                a.iter_mut().zip(b).for_each(|(x, y)| *x = op(*x, y));
            }
            _ => {
                return Err(AggError::KindMismatch {
                    name: name.to_string(),
                })
            }
        }
        Ok(())
    }

    fn into_value(self) -> MetricValue {
        match self {
            Numbers::Scalar(v) => MetricValue::Scalar(v),
            Numbers::Vector(v) => MetricValue::Vector(v),
        }
    }
}

#[derive(Debug, Clone)]
enum Reducer {
    Fold {
        reduce: Reduce,
        acc: Numbers,
        count: u64,
    },
    Last(MetricValue),
    Stack(Vec<f64>),
}

/// Accumulates metric values by name and reduces them on `result`
#[derive(Debug, Clone)]
pub struct Agg {
    reducers: BTreeMap<String, Reducer>,
    maxlen: usize,
}

impl Agg {
    pub fn new() -> Self {
        Self::with_maxlen(1_000_000)
    }

    /// Cap the number of elements a `Stack` reduction keeps
    pub fn with_maxlen(maxlen: usize) -> Self {
        Self {
            reducers: BTreeMap::new(),
            maxlen,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Add a value, inferring the reduction from the first value when `reduce` is None
    pub fn add(
        &mut self,
        name: &str,
        value: impl Into<MetricValue>,
        reduce: Option<Reduce>,
    ) -> Result<(), AggError> {
        let value = value.into();
        match self.reducers.get_mut(name) {
            Some(reducer) => update(reducer, name, value, self.maxlen),
            None => {
                let reduce = reduce.unwrap_or_else(|| Reduce::infer(&value));
                let reducer = initial(name, value, reduce, self.maxlen)?;
                self.reducers.insert(name.to_string(), reducer);
                Ok(())
            }
        }
    }

    /// Add every entry of `values` under `prefix/`
    pub fn add_all<I, K, V>(&mut self, values: I, prefix: &str) -> Result<(), AggError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<MetricValue>,
    {
        for (key, value) in values {
            let name = prefixed(prefix, key.as_ref());
            self.add(&name, value, None)?;
        }
        Ok(())
    }

    /// Reduced values, keyed by `prefix/name`; resets the aggregator
    pub fn result(&mut self, prefix: &str) -> BTreeMap<String, MetricValue> {
        std::mem::take(&mut self.reducers)
            .into_iter()
            .map(|(name, reducer)| (prefixed(prefix, &name), current(reducer)))
            .collect()
    }
}

impl Default for Agg {
    fn default() -> Self {
        Self::new()
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

fn numbers(name: &str, value: MetricValue, reduce: Reduce) -> Result<Numbers, AggError> {
    match value {
        MetricValue::Scalar(v) => Ok(Numbers::Scalar(v)),
        MetricValue::Vector(v) => Ok(Numbers::Vector(v)),
        other => Err(AggError::Unsupported {
            name: name.to_string(),
            kind: other.kind(),
            reduce,
        }),
    }
}

fn stack_values(name: &str, value: MetricValue) -> Result<Vec<f64>, AggError> {
    match value {
        MetricValue::Scalar(v) => Ok(vec![v]),
        MetricValue::Vector(v) => Ok(v),
        other => Err(AggError::Unsupported {
            name: name.to_string(),
            kind: other.kind(),
            reduce: Reduce::Stack,
        }),
    }
}

fn initial(name: &str, value: MetricValue, reduce: Reduce, maxlen: usize) -> Result<Reducer, AggError> {
    match reduce {
        Reduce::Last => Ok(Reducer::Last(value)),
        Reduce::Stack => {
            let mut values = stack_values(name, value)?;
            values.truncate(maxlen);
            Ok(Reducer::Stack(values))
        }
        _ => Ok(Reducer::Fold {
            reduce,
            acc: numbers(name, value, reduce)?,
            count: 1,
        }),
    }
}

fn update(reducer: &mut Reducer, name: &str, value: MetricValue, maxlen: usize) -> Result<(), AggError> {
    match reducer {
        Reducer::Last(last) => *last = value,
        Reducer::Stack(values) => {
            let incoming = stack_values(name, value)?;
            let room = maxlen.saturating_sub(values.len());
            values.extend(incoming.into_iter().take(room));
        }
        Reducer::Fold { reduce, acc, count } => {
            let incoming = numbers(name, value, *reduce)?;
            if incoming.has_nan() {
                tracing::trace!(name, "ignoring NaN update");
                return Ok(());
            }
            if acc.has_nan() {
                *acc = incoming;
                return Ok(());
            }
            let op: fn(f64, f64) -> f64 = match reduce {
                Reduce::Min => f64::min,
                Reduce::Max => f64::max,
                _ => |a, b| a + b,
            };
            acc.combine(incoming, name, op)?;
            *count += 1;
        }
    }
    Ok(())
}

fn current(reducer: Reducer) -> MetricValue {
    match reducer {
        Reducer::Last(value) => value,
        Reducer::Stack(values) => MetricValue::Vector(values),
        Reducer::Fold {
            reduce: Reduce::Mean,
            acc,
            count,
        } => {
            let n = count.max(1) as f64;
            match acc {
                Numbers::Scalar(v) => MetricValue::Scalar(v / n),
                Numbers::Vector(v) => MetricValue::Vector(v.into_iter().map(|x| x / n).collect()),
            }
        }
        Reducer::Fold { acc, .. } => acc.into_value(),
    }
}

#[cfg(test)]
#[path = "agg_tests.rs"]
mod tests;
