//! Windowed aggregation of loudness samples.
//!
//! Samples are bucketed into fixed-length periods (3 seconds by default)
//! keyed by `floor(timestamp_ms / 1000 / period_seconds)`. A bounded
//! trailing window of periods is retained; see [`NoiseStore`].

mod period;
mod store;

pub use period::Period;
pub use store::{NoiseStore, PeriodSummary};
