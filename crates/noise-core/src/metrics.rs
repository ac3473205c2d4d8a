//! Summary statistics for a period of loudness samples
//!
//! A period is summarized by a handful of nearest-rank quantiles, its
//! maximum and its arithmetic mean. Summaries are always derived from the
//! raw samples on read and never stored.

use serde::Serialize;

/// Quantile thresholds reported for every period, in output order.
///
/// The last threshold (1.0) is the maximum.
pub const QUANTILE_THRESHOLDS: [f64; 6] = [0.5, 0.75, 0.9, 0.95, 0.99, 1.0];

/// Summary of one period's loudness samples
///
/// Field order is the JSON key order of the emitted log payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub q50: f64,
    pub q75: f64,
    pub q90: f64,
    pub q95: f64,
    pub q99: f64,
    pub max: f64,
    pub avg: f64,
}

impl Metrics {
    /// Summarize an ascending slice of samples.
    ///
    /// Returns `None` for an empty slice; a period without samples has no
    /// meaningful quantiles or average.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let q = quantiles(&QUANTILE_THRESHOLDS, sorted)?;

        Some(Self {
            q50: q[0],
            q75: q[1],
            q90: q[2],
            q95: q[3],
            q99: q[4],
            max: q[5],
            avg: average(sorted)?,
        })
    }

    /// Summarize samples in arbitrary order (sorts a copy).
    pub fn from_unsorted(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sort_samples(&mut sorted);
        Self::from_sorted(&sorted)
    }

    /// Serialize to the compact JSON object used as a log line payload
    pub fn to_json(&self) -> String {
        // A struct of plain f64 fields cannot fail to serialize; non-finite
        // values become `null`.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Nearest-rank quantiles of an ascending slice.
///
/// For each threshold `t` selects `sorted[round((n - 1) * t)]`. No
/// interpolation happens between neighbouring ranks: `t = 0` is always the
/// minimum and `t = 1` always the maximum. Thresholds outside `[0, 1]` are
/// clamped. Returns `None` when `sorted` is empty.
pub fn quantiles(thresholds: &[f64], sorted: &[f64]) -> Option<Vec<f64>> {
    if sorted.is_empty() {
        return None;
    }

    let last = sorted.len() - 1;
    Some(
        thresholds
            .iter()
            .map(|threshold| {
                let t = threshold.clamp(0.0, 1.0);
                let index = ((last as f64) * t).round() as usize;
                sorted[index.min(last)]
            })
            .collect(),
    )
}

/// Arithmetic mean, `None` for an empty slice
pub fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sort samples ascending using the IEEE total order (NaN sorts last).
pub fn sort_samples(values: &mut [f64]) {
    values.sort_by(f64::total_cmp);
}
