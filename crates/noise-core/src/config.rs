use serde::{Deserialize, Serialize};

/// Length of one aggregation period in seconds
pub const PERIOD_SECONDS: u32 = 3;

/// Number of completed periods exposed for charting
pub const KEEP_PERIODS: usize = 60;

/// Extra periods retained beyond [`KEEP_PERIODS`] (the active period)
pub const RETENTION_SLACK: usize = 1;

/// How the store treats period ids that received no samples at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapPolicy {
    /// Insert empty periods for skipped ids so the window follows wall time.
    #[default]
    Fill,
    /// Ignore skipped ids; the next sample simply opens a new period.
    Collapse,
}

/// Aggregation store configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub period_seconds: u32,
    pub keep_periods: usize,
    pub retention_slack: usize,
    pub gap_policy: GapPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            period_seconds: PERIOD_SECONDS,
            keep_periods: KEEP_PERIODS,
            retention_slack: RETENTION_SLACK,
            gap_policy: GapPolicy::Fill,
        }
    }
}

impl StoreConfig {
    /// Maximum number of periods held in memory
    pub const fn capacity(&self) -> usize {
        self.keep_periods + self.retention_slack
    }

    /// Period length in milliseconds
    pub const fn period_millis(&self) -> i64 {
        self.period_seconds as i64 * 1000
    }
}

/// Values entered on the start form: which device is measuring and the
/// credential used for the Loki push.
///
/// Stored on disk as JSON with the same keys the web form used.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct StartFormParams {
    pub device: String,
    pub loki_basic_auth: String,
}

impl StartFormParams {
    /// Decode persisted form values, falling back to empty values when the
    /// stored text is missing or not valid JSON.
    pub fn parse_or_default(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(params) => params,
            Err(e) => {
                if !raw.trim().is_empty() {
                    log::warn!("Ignoring corrupt start form params: {}", e);
                }
                Self::default()
            }
        }
    }

    /// Overlay explicitly provided values on top of remembered ones
    pub fn merged(self, device: Option<String>, loki_basic_auth: Option<String>) -> Self {
        Self {
            device: device.unwrap_or(self.device),
            loki_basic_auth: loki_basic_auth.unwrap_or(self.loki_basic_auth),
        }
    }
}
