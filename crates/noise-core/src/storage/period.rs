//! A single aggregation bucket.

use crate::loki::LogLine;
use crate::metrics::{Metrics, average, sort_samples};

/// Samples that fell into one fixed-length period.
///
/// A period is *active* while it is the newest period of the store and
/// receives samples. Once the next period starts it is *sealed*: its
/// samples are sorted once so quantile reads need no further sorting.
#[derive(Debug, Clone)]
pub struct Period {
    id: i64,
    /// Milliseconds since epoch of the first observation
    start_ms: i64,
    measurements: Vec<f64>,
    sealed: bool,
    log_sent: bool,
}

impl Period {
    /// Open a new active period
    pub(super) fn open(id: i64, start_ms: i64) -> Self {
        Self {
            id,
            start_ms,
            measurements: Vec::new(),
            sealed: false,
            log_sent: false,
        }
    }

    /// A sealed period with no samples, standing in for a skipped id
    pub(super) fn gap(id: i64, period_millis: i64) -> Self {
        Self {
            id,
            start_ms: id.saturating_mul(period_millis),
            measurements: Vec::new(),
            sealed: true,
            log_sent: false,
        }
    }

    pub(super) fn push(&mut self, value: f64) {
        self.measurements.push(value);
    }

    /// Stop accepting samples and sort them for quantile lookup
    pub(super) fn seal(&mut self) {
        if !self.sealed {
            sort_samples(&mut self.measurements);
            self.sealed = true;
        }
    }

    pub(super) fn mark_sent(&mut self) {
        self.log_sent = true;
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn log_sent(&self) -> bool {
        self.log_sent
    }

    /// Summary statistics, `None` for a period without samples
    pub fn metrics(&self) -> Option<Metrics> {
        if self.sealed {
            Metrics::from_sorted(&self.measurements)
        } else {
            Metrics::from_unsorted(&self.measurements)
        }
    }

    /// Mean loudness, `None` for a period without samples
    pub fn average(&self) -> Option<f64> {
        average(&self.measurements)
    }

    /// Log line for this period: nanosecond timestamp and JSON summary
    pub fn log_line(&self) -> Option<LogLine> {
        let metrics = self.metrics()?;
        Some(LogLine::new(self.start_ms, &metrics))
    }
}
