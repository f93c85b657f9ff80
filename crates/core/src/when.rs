// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers that decide when a scheduled action is due
//!
//! Positions passed to a trigger must be non-decreasing. Callers may skip
//! positions; a trigger still fires for the point it would have fired at.

use crate::clock::{Clock as TimeSource, SystemClock};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A stateful predicate over a position
pub trait Trigger<P = i64> {
    /// Whether the action is due at `position`, updating internal state
    fn fires(&mut self, position: P) -> bool;
}

/// Fires whenever the position enters a new multiple of `every`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Every {
    every: i64,
    last_bucket: Option<i64>,
}

impl Every {
    /// `every == 0` (or negative) disables the trigger
    pub fn new(every: i64) -> Self {
        Self {
            every,
            last_bucket: None,
        }
    }
}

impl Trigger for Every {
    fn fires(&mut self, step: i64) -> bool {
        if self.every <= 0 {
            return false;
        }
        let bucket = step.div_euclid(self.every);
        if self.last_bucket == Some(bucket) {
            return false;
        }
        self.last_bucket = Some(bucket);
        true
    }
}

/// Fires on a fixed fraction of positions without drift
///
/// The accumulator gains `ratio` per position advanced (one position for the
/// first call) and each fire consumes one unit. After a large jump the
/// carried backlog is capped at one pending fire, so a skip produces at most
/// two consecutive fires instead of a long burst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    ratio: f64,
    accumulator: f64,
    last_step: Option<i64>,
}

impl Ratio {
    /// `ratio` is clamped to `[0, 1]`
    pub fn new(ratio: f64) -> Self {
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };
        Self {
            ratio,
            accumulator: 0.0,
            last_step: None,
        }
    }
}

impl Trigger for Ratio {
    fn fires(&mut self, step: i64) -> bool {
        let advanced = match self.last_step {
            None => 1,
            Some(last) => step.saturating_sub(last).max(0),
        };
        self.last_step = Some(step);
        self.accumulator += self.ratio * advanced as f64;
        // Tolerance absorbs rounding, e.g. three additions of 1/3
        if self.accumulator >= 1.0 - 1e-9 {
            self.accumulator = (self.accumulator - 1.0).min(1.0);
            return true;
        }
        false
    }
}

/// Fires on the first call only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Once {
    fired: bool,
}

impl Once {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> Trigger<P> for Once {
    fn fires(&mut self, _position: P) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }
}

/// Fires while the position is below `limit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Until {
    limit: i64,
}

impl Until {
    pub fn new(limit: i64) -> Self {
        Self { limit }
    }
}

impl Trigger for Until {
    fn fires(&mut self, step: i64) -> bool {
        step < self.limit
    }
}

/// Fires when at least `period` of wall-clock time passed since the last fire
///
/// Positions are durations since the trigger was created. `fires_now` reads
/// them from the clock; `fires` accepts them explicitly.
#[derive(Debug, Clone)]
pub struct Clock<C: TimeSource = SystemClock> {
    period: Duration,
    origin: Instant,
    last_fire: Option<Duration>,
    clock: C,
}

impl Clock<SystemClock> {
    pub fn new(period: Duration) -> Self {
        Self::with_clock(period, SystemClock)
    }
}

impl<C: TimeSource> Clock<C> {
    pub fn with_clock(period: Duration, clock: C) -> Self {
        Self {
            period,
            origin: clock.now(),
            last_fire: None,
            clock,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check the trigger against the current time of its clock
    pub fn fires_now(&mut self) -> bool {
        let elapsed = self.clock.now().saturating_duration_since(self.origin);
        self.fires(elapsed)
    }
}

impl<C: TimeSource> Trigger<Duration> for Clock<C> {
    fn fires(&mut self, elapsed: Duration) -> bool {
        let due = match self.last_fire {
            None => true,
            Some(last) => elapsed.saturating_sub(last) >= self.period,
        };
        if due {
            self.last_fire = Some(elapsed);
        }
        due
    }
}

#[cfg(test)]
#[path = "when_tests.rs"]
mod tests;
