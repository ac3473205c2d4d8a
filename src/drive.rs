//! The drive loop: one loudness reading per frame into the store, and a
//! pair of events on every period rollover.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};

use noise_core::chart::ChartData;
use noise_core::events::NoiseEvent;
use noise_core::sampling::Sampler;
use noise_core::storage::NoiseStore;

use crate::app_state::{AppRunState, NoisePublisher};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Owns the store and the sampler, and is the only code that mutates the
/// store.
///
/// Each [`tick`](Self::tick) adds one reading. When the tick lands in a
/// different period than the previous one, the drive loop publishes the
/// fresh chart and the log lines of every period that completed since the
/// last batch. Publishing never waits; a slow subscriber just lags.
pub struct DriveLoop<'a, S: Sampler> {
    store: NoiseStore,
    sampler: S,
    publisher: NoisePublisher<'a>,
    last_displayed_period: Option<i64>,
    run_state: AppRunState,
}

impl<'a, S: Sampler> DriveLoop<'a, S> {
    pub fn new(store: NoiseStore, sampler: S, publisher: NoisePublisher<'a>) -> Self {
        Self {
            store,
            sampler,
            publisher,
            last_displayed_period: None,
            run_state: AppRunState::Uninitialized,
        }
    }

    pub fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub fn store(&self) -> &NoiseStore {
        &self.store
    }

    /// Take one reading at `now_ms` and publish on rollover.
    pub fn tick(&mut self, now_ms: i64) {
        let period_id = self.store.period_id_for(now_ms);
        let loudness = self.sampler.sample();
        self.store.add_measurement(f64::from(loudness), now_ms);

        if self.run_state == AppRunState::Uninitialized {
            self.run_state = AppRunState::Measuring;
        }

        if self.last_displayed_period == Some(period_id) {
            return;
        }
        self.last_displayed_period = Some(period_id);
        self.on_rollover(period_id);
    }

    fn on_rollover(&mut self, active_period_id: i64) {
        let config = *self.store.config();
        let summaries = self.store.last_periods_summaries(config.keep_periods);
        if summaries.is_empty() {
            debug!("Period {} opened, nothing to chart", active_period_id);
        } else {
            let chart =
                ChartData::from_summaries(&summaries, active_period_id, config.period_seconds);
            debug!(
                "Period {} opened, charting {} completed periods",
                active_period_id,
                summaries.len()
            );
            self.publisher.publish_immediate(NoiseEvent::Chart(chart));
        }

        // Periods evicted by a long gap still need their line sent
        let lines = self.store.unsent_sealed_log_lines();
        if lines.is_empty() {
            return;
        }
        self.publisher.publish_immediate(NoiseEvent::LogBatch(lines));

        if self.run_state == AppRunState::Measuring {
            info!("First period completed, reporting started");
            self.run_state = AppRunState::Reporting;
        }
    }

    /// Tick every `frame` until the future is dropped.
    pub async fn run(&mut self, frame: Duration) {
        info!("Drive loop started, frame every {:?}", frame);

        let mut interval = tokio::time::interval(frame);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.tick(now_millis());
        }
    }

    /// Mark the loop as stopped; called once ticking has ended
    pub fn stop(&mut self) {
        info!(
            "Drive loop stopped after {} periods, running noise total {:.5}",
            self.store.len(),
            self.store.noise_level_total()
        );
        self.run_state = AppRunState::Stopped;
    }
}
