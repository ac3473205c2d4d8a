use crate::chart::ChartData;
use crate::loki::LogLine;

/// Channel capacity for pub-sub events
/// Rollovers happen every few seconds, so a handful of slots absorbs any
/// burst without the drive loop ever waiting
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to noise events
/// - Subscriber 0: display manager (chart rendering)
/// - Subscriber 1: log emitter (Loki push)
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the drive loop)
pub const EVENT_PUBLISHERS: usize = 1;

/// Events published by the drive loop when the active period rolls over
#[derive(Debug, Clone)]
pub enum NoiseEvent {
    /// Fresh chart series covering the completed periods
    Chart(ChartData),
    /// Periods that have not been logged yet, oldest first
    LogBatch(Vec<LogLine>),
}
