use std::collections::VecDeque;

use log::debug;

use super::Period;
use crate::config::{GapPolicy, StoreConfig};
use crate::loki::LogLine;
use crate::metrics::Metrics;

/// Summary of a completed period, as handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSummary {
    pub period_id: i64,
    pub start_ms: i64,
    pub metrics: Metrics,
}

/// In-memory store bucketing loudness samples into fixed-length periods
///
/// The store owns a ring buffer of [`Period`]s ordered oldest to newest.
/// The newest period is the active one; every other period is sealed.
///
/// ## Retention
///
/// At most [`StoreConfig::capacity`] periods are kept (60 completed periods
/// plus the active one by default). Older periods are dropped from the
/// front; the average of each dropped period is folded into a running
/// total so [`NoiseStore::noise_level_total`] stays exact without keeping
/// the samples.
///
/// ## Log emission
///
/// Each period is handed out as a log line exactly once. The `unsent_*`
/// methods mark what they return as sent; nothing is re-queued if the
/// caller later fails to deliver it. A period evicted before it was handed
/// out keeps its log line in a pending queue that the next `unsent_*` call
/// drains first.
///
/// ```rust,ignore
/// let mut store = NoiseStore::new(StoreConfig::default());
/// store.add_measurement(0.12, now_ms);
/// let series = store.last_periods_summaries(KEEP_PERIODS);
/// let lines = store.unsent_sealed_log_lines();
/// ```
#[derive(Debug)]
pub struct NoiseStore {
    config: StoreConfig,
    /// Ring buffer of periods, oldest first
    periods: VecDeque<Period>,
    /// Sum of the averages of every evicted non-empty period
    evicted_average_total: f64,
    /// Log lines of evicted periods that were never handed out, oldest first
    evicted_unsent: Vec<LogLine>,
}

impl NoiseStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            periods: VecDeque::with_capacity(config.capacity() + 1),
            evicted_average_total: 0.0,
            evicted_unsent: Vec::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Period id containing `timestamp_ms`: `floor(timestamp_ms / 1000 / period_seconds)`
    pub fn period_id_for(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.config.period_millis())
    }

    /// Record one loudness sample taken at `timestamp_ms`.
    ///
    /// A sample whose period id differs from the active period seals it and
    /// opens a new period. Values are stored as given, without validation.
    pub fn add_measurement(&mut self, value: f64, timestamp_ms: i64) {
        let period_id = self.period_id_for(timestamp_ms);

        let needs_new_period = self
            .periods
            .back()
            .is_none_or(|current| current.id() != period_id);

        if needs_new_period {
            self.start_period(period_id, timestamp_ms);
        }

        if let Some(current) = self.periods.back_mut() {
            current.push(value);
        }
    }

    fn start_period(&mut self, period_id: i64, timestamp_ms: i64) {
        let previous_id = match self.periods.back_mut() {
            Some(previous) => {
                previous.seal();
                debug!(
                    "Sealed period {} with {} samples",
                    previous.id(),
                    previous.len()
                );
                Some(previous.id())
            }
            None => None,
        };

        if let (Some(previous_id), GapPolicy::Fill) = (previous_id, self.config.gap_policy) {
            self.fill_gap(previous_id, period_id);
        }

        self.periods.push_back(Period::open(period_id, timestamp_ms));
        self.evict_excess();
    }

    /// Insert empty periods for ids strictly between `previous_id` and `next_id`.
    ///
    /// Only the ids that can still be retained are materialized.
    fn fill_gap(&mut self, previous_id: i64, next_id: i64) {
        if next_id <= previous_id.saturating_add(1) {
            return;
        }

        let retained = self.config.capacity().saturating_sub(1) as i64;
        let first = (previous_id + 1).max(next_id.saturating_sub(retained));
        debug!("Filling {} skipped periods", next_id - first);

        for id in first..next_id {
            self.periods
                .push_back(Period::gap(id, self.config.period_millis()));
            self.evict_excess();
        }
    }

    fn evict_excess(&mut self) {
        while self.periods.len() > self.config.capacity() {
            let Some(evicted) = self.periods.pop_front() else {
                break;
            };
            if let Some(avg) = evicted.average() {
                self.evicted_average_total += avg;
            }
            if !evicted.log_sent()
                && let Some(line) = evicted.log_line()
            {
                debug!("Period {} evicted before it was logged", evicted.id());
                self.evicted_unsent.push(line);
            }
        }
    }

    /// Summaries of up to `count` most recent completed periods, oldest first.
    ///
    /// The active period is never included, nor is any period without
    /// samples. Empty until at least two periods exist.
    pub fn last_periods_summaries(&self, count: usize) -> Vec<PeriodSummary> {
        let completed = self.periods.len().saturating_sub(1);
        let skip = completed.saturating_sub(count);

        self.periods
            .iter()
            .take(completed)
            .skip(skip)
            .filter_map(|period| {
                period.metrics().map(|metrics| PeriodSummary {
                    period_id: period.id(),
                    start_ms: period.start_ms(),
                    metrics,
                })
            })
            .collect()
    }

    /// Log lines for every period not handed out yet, active one included.
    ///
    /// Returned periods are marked as sent, so an immediate second call
    /// yields nothing.
    pub fn unsent_log_lines(&mut self) -> Vec<LogLine> {
        self.take_unsent(|_| true)
    }

    /// Log lines for sealed periods not handed out yet.
    ///
    /// Same contract as [`NoiseStore::unsent_log_lines`] but leaves the
    /// active period alone, so every period is logged with its full set
    /// of samples.
    pub fn unsent_sealed_log_lines(&mut self) -> Vec<LogLine> {
        self.take_unsent(Period::is_sealed)
    }

    fn take_unsent(&mut self, eligible: impl Fn(&Period) -> bool) -> Vec<LogLine> {
        let mut lines = std::mem::take(&mut self.evicted_unsent);

        for period in self
            .periods
            .iter_mut()
            .filter(|period| !period.log_sent() && eligible(&**period))
        {
            // Empty gap periods have nothing to log but count as handled.
            if let Some(line) = period.log_line() {
                lines.push(line);
            }
            period.mark_sent();
        }

        lines
    }

    /// Sum of per-period averages over the whole lifetime of the store
    pub fn noise_level_total(&self) -> f64 {
        self.evicted_average_total
            + self
                .periods
                .iter()
                .filter_map(Period::average)
                .sum::<f64>()
    }

    /// Number of periods currently held
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Id of the active period, if any sample was recorded yet
    pub fn active_period_id(&self) -> Option<i64> {
        self.periods.back().map(Period::id)
    }

    /// Read-only view of the retained periods, oldest first
    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEEP_PERIODS;

    const PERIOD_MS: i64 = 3000;
    /// Start of period 1000 (a period-aligned timestamp)
    const T0: i64 = 1000 * PERIOD_MS;

    fn store() -> NoiseStore {
        NoiseStore::new(StoreConfig::default())
    }

    fn collapsing_store() -> NoiseStore {
        NoiseStore::new(StoreConfig {
            gap_policy: GapPolicy::Collapse,
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_period_id_for() {
        let store = store();
        assert_eq!(store.period_id_for(0), 0);
        assert_eq!(store.period_id_for(2999), 0);
        assert_eq!(store.period_id_for(3000), 1);
        assert_eq!(store.period_id_for(-1), -1);
        assert_eq!(store.period_id_for(1_700_000_000_123), 566_666_666);
    }

    #[test]
    fn test_same_period_samples_share_bucket() {
        let mut store = store();
        store.add_measurement(0.1, T0);
        store.add_measurement(0.2, T0 + 1500);
        store.add_measurement(0.3, T0 + PERIOD_MS - 1);

        assert_eq!(store.len(), 1);
        assert_eq!(store.periods().next().unwrap().len(), 3);
    }

    #[test]
    fn test_completed_period_average() {
        let mut store = store();
        store.add_measurement(0.1, T0);
        store.add_measurement(0.1, T0 + 500);
        store.add_measurement(0.9, T0 + 1000);
        assert!(store.last_periods_summaries(KEEP_PERIODS).is_empty());

        store.add_measurement(0.2, T0 + PERIOD_MS);
        let summaries = store.last_periods_summaries(KEEP_PERIODS);

        assert_eq!(summaries.len(), 1);
        assert!((summaries[0].metrics.avg - 0.366_666_666).abs() < 1e-6);
        assert_eq!(summaries[0].metrics.max, 0.9);
        assert_eq!(summaries[0].start_ms, T0);
    }

    #[test]
    fn test_retention_caps_summaries() {
        let mut store = store();
        for i in 0..70 {
            store.add_measurement(i as f64, T0 + i * PERIOD_MS);
            assert!(store.len() <= store.config().capacity());
        }

        let summaries = store.last_periods_summaries(KEEP_PERIODS);
        assert_eq!(summaries.len(), 60);
        // Period 69 is active, so completed periods 9..=68 remain
        assert_eq!(summaries.first().unwrap().metrics.avg, 9.0);
        assert_eq!(summaries.last().unwrap().metrics.avg, 68.0);
        assert!(
            summaries
                .windows(2)
                .all(|pair| pair[0].period_id < pair[1].period_id)
        );
    }

    #[test]
    fn test_summaries_respect_count() {
        let mut store = store();
        for i in 0..10 {
            store.add_measurement(1.0, T0 + i * PERIOD_MS);
        }
        let summaries = store.last_periods_summaries(3);
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2].period_id, 1008);
    }

    #[test]
    fn test_unsent_log_lines_at_most_once() {
        let mut store = store();
        store.add_measurement(0.5, T0);
        store.add_measurement(0.5, T0 + PERIOD_MS);

        let first = store.unsent_log_lines();
        assert_eq!(first.len(), 2);
        assert!(store.unsent_log_lines().is_empty());

        // A sample in an already sent period does not resend it
        store.add_measurement(0.7, T0 + PERIOD_MS + 10);
        assert!(store.unsent_log_lines().is_empty());
    }

    #[test]
    fn test_unsent_log_lines_only_new_periods() {
        let mut store = store();
        store.add_measurement(0.1, T0);
        let p1 = store.unsent_log_lines();
        assert_eq!(p1.len(), 1);

        store.add_measurement(0.2, T0 + PERIOD_MS);
        let p2 = store.unsent_log_lines();
        assert_eq!(p2.len(), 1);
        assert_eq!(p2[0].timestamp_nanos(), ((T0 + PERIOD_MS) * 1_000_000).to_string());
        assert!(store.unsent_log_lines().is_empty());

        store.add_measurement(0.3, T0 + 2 * PERIOD_MS);
        let p3 = store.unsent_log_lines();
        assert_eq!(p3.len(), 1);
        assert_eq!(
            p3[0].timestamp_nanos(),
            ((T0 + 2 * PERIOD_MS) * 1_000_000).to_string()
        );
    }

    #[test]
    fn test_unsent_log_lines_chronological() {
        let mut store = store();
        for i in 0..4 {
            store.add_measurement(0.1 * i as f64, T0 + i * PERIOD_MS + 7);
        }
        let lines = store.unsent_log_lines();
        let stamps: Vec<i128> = lines
            .iter()
            .map(|line| line.timestamp_nanos().parse().unwrap())
            .collect();
        assert_eq!(stamps.len(), 4);
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_unsent_sealed_log_lines_skip_active_period() {
        let mut store = store();
        store.add_measurement(0.1, T0);
        assert!(store.unsent_sealed_log_lines().is_empty());

        store.add_measurement(0.2, T0 + PERIOD_MS);
        let lines = store.unsent_sealed_log_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].timestamp_nanos(), (T0 * 1_000_000).to_string());

        // The active period is still pending for the unfiltered variant
        assert_eq!(store.unsent_log_lines().len(), 1);
    }

    #[test]
    fn test_gap_fill_keeps_wall_time() {
        let mut store = store();
        store.add_measurement(0.4, T0);
        store.add_measurement(0.6, T0 + 4 * PERIOD_MS);

        let ids: Vec<i64> = store.periods().map(Period::id).collect();
        assert_eq!(ids, vec![1000, 1001, 1002, 1003, 1004]);

        // Empty periods never show up in summaries or log lines
        let summaries = store.last_periods_summaries(KEEP_PERIODS);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].period_id, 1000);
        assert_eq!(store.unsent_sealed_log_lines().len(), 1);
        assert!(store.periods().take(4).all(Period::log_sent));
    }

    #[test]
    fn test_long_gap_is_bounded() {
        let mut store = store();
        store.add_measurement(0.4, T0);
        store.add_measurement(0.6, T0 + 1_000_000 * PERIOD_MS);

        assert_eq!(store.len(), store.config().capacity());
        assert!(store.last_periods_summaries(KEEP_PERIODS).is_empty());
        assert!((store.noise_level_total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_period_evicted_by_long_gap_is_still_logged() {
        let mut store = store();
        store.add_measurement(0.4, T0);
        store.add_measurement(0.5, T0 + 1000);
        store.add_measurement(0.6, T0 + 100 * PERIOD_MS);

        assert!(store.periods().all(|period| period.id() != 1000));

        let lines = store.unsent_sealed_log_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].timestamp_nanos(), (T0 * 1_000_000).to_string());
        assert!(store.unsent_sealed_log_lines().is_empty());
        assert_eq!(store.unsent_log_lines().len(), 1);
    }

    #[test]
    fn test_evicted_lines_come_before_retained_ones() {
        let mut store = store();
        for i in 0..70 {
            store.add_measurement(0.1, T0 + i * PERIOD_MS);
        }

        let stamps: Vec<i128> = store
            .unsent_sealed_log_lines()
            .iter()
            .map(|line| line.timestamp_nanos().parse().unwrap())
            .collect();
        // Periods 0..=68 are sealed; 0..=8 were evicted without being logged
        assert_eq!(stamps.len(), 69);
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_collapse_policy_ignores_gaps() {
        let mut store = collapsing_store();
        store.add_measurement(0.4, T0);
        store.add_measurement(0.6, T0 + 4 * PERIOD_MS);
        let ids: Vec<i64> = store.periods().map(Period::id).collect();
        assert_eq!(ids, vec![1000, 1004]);
    }

    #[test]
    fn test_backwards_timestamp_opens_new_period() {
        let mut store = store();
        store.add_measurement(0.4, T0 + PERIOD_MS);
        store.add_measurement(0.6, T0);
        let ids: Vec<i64> = store.periods().map(Period::id).collect();
        assert_eq!(ids, vec![1001, 1000]);
    }

    #[test]
    fn test_noise_level_total_survives_eviction() {
        let mut store = store();
        let mut expected = 0.0;
        for i in 0..150 {
            let a = (i % 7) as f64 * 0.01;
            let b = (i % 5) as f64 * 0.02;
            store.add_measurement(a, T0 + i * PERIOD_MS);
            store.add_measurement(b, T0 + i * PERIOD_MS + 100);
            expected += (a + b) / 2.0;
        }

        assert_eq!(store.len(), store.config().capacity());
        assert!((store.noise_level_total() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_values_are_accepted() {
        let mut store = store();
        store.add_measurement(f64::NAN, T0);
        store.add_measurement(-1.0, T0 + 1);
        store.add_measurement(0.1, T0 + PERIOD_MS);

        let summaries = store.last_periods_summaries(KEEP_PERIODS);
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].metrics.avg.is_nan());
        // NaN sorts last, negative values stay first
        assert!(summaries[0].metrics.max.is_nan());
        let first = store.periods().next().unwrap();
        assert_eq!(first.len(), 2);
    }
}
