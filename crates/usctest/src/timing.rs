//! Running statistics over timed calls.

use serde::Serialize;

/// Max/min/total/count accumulator.
///
/// A fresh block is neutral: `max` starts at `i64::MIN` and `min` at
/// `i64::MAX` so the first sample sets both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingBlock {
    max: i64,
    min: i64,
    total: i64,
    count: i64,
}

impl Default for TimingBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingBlock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max: i64::MIN,
            min: i64::MAX,
            total: 0,
            count: 0,
        }
    }

    pub fn record(&mut self, sample: i64) {
        self.max = self.max.max(sample);
        self.min = self.min.min(sample);
        self.total = self.total.saturating_add(sample);
        self.count += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub const fn max(&self) -> Option<i64> {
        if self.count == 0 { None } else { Some(self.max) }
    }

    #[must_use]
    pub const fn min(&self) -> Option<i64> {
        if self.count == 0 { None } else { Some(self.min) }
    }

    #[must_use]
    pub const fn total(&self) -> i64 {
        self.total
    }

    #[must_use]
    pub const fn count(&self) -> i64 {
        self.count
    }

    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total as f64 / self.count as f64)
    }

    #[must_use]
    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            count: self.count,
            total: self.total,
            max: self.max(),
            min: self.min(),
            mean: self.mean(),
        }
    }
}

/// Serializable snapshot of a [`TimingBlock`], in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub count: i64,
    pub total: i64,
    pub max: Option<i64>,
    pub min: Option<i64>,
    pub mean: Option<f64>,
}
