//! Grafana Loki push payload.
//!
//! Each emitted log line pairs a nanosecond Unix timestamp (as a decimal
//! string) with a JSON encoded [`Metrics`] summary. Lines are grouped into
//! a single stream labelled with the job name and the measuring device.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::metrics::Metrics;

/// Value of the `job` stream label
pub const JOB_NAME: &str = "noise_level";

const NANOS_PER_MILLI: i128 = 1_000_000;

/// One `[timestamp, line]` entry of a Loki stream
///
/// Serializes as a two element JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine(String, String);

impl LogLine {
    /// Build a line for a period that started at `start_ms`
    pub fn new(start_ms: i64, metrics: &Metrics) -> Self {
        let nanos = i128::from(start_ms) * NANOS_PER_MILLI;
        Self(nanos.to_string(), metrics.to_json())
    }

    /// Nanoseconds since the Unix epoch, as a decimal string
    pub fn timestamp_nanos(&self) -> &str {
        &self.0
    }

    /// JSON encoded summary
    pub fn payload(&self) -> &str {
        &self.1
    }
}

/// Labels identifying a stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamLabels {
    pub job: String,
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    pub stream: StreamLabels,
    pub values: Vec<LogLine>,
}

/// Body of a `POST /loki/api/v1/push` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushRequest {
    pub streams: Vec<Stream>,
}

impl PushRequest {
    /// Wrap a batch of lines for one device into a push request
    pub fn new(device: &str, values: Vec<LogLine>) -> Self {
        Self {
            streams: vec![Stream {
                stream: StreamLabels {
                    job: JOB_NAME.into(),
                    device: device.into(),
                },
                values,
            }],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// `Authorization` header value for a `user:password` credential string
pub fn basic_authorization(credentials: &str) -> String {
    format!("Basic {}", STANDARD.encode(credentials))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(value: f64) -> Metrics {
        Metrics::from_sorted(&[value]).unwrap()
    }

    #[test]
    fn test_log_line_timestamp_is_nanoseconds() {
        let line = LogLine::new(1_700_000_001_000, &metrics(0.25));
        assert_eq!(line.timestamp_nanos(), "1700000001000000000");
        assert!(line.payload().starts_with(r#"{"q50":0.25"#));
    }

    #[test]
    fn test_push_request_shape() {
        let request = PushRequest::new("office", vec![LogLine::new(1000, &metrics(0.5))]);
        let value: serde_json::Value = serde_json::from_str(&request.to_json().unwrap()).unwrap();

        assert_eq!(value["streams"][0]["stream"]["job"], "noise_level");
        assert_eq!(value["streams"][0]["stream"]["device"], "office");
        assert_eq!(value["streams"][0]["values"][0][0], "1000000000");

        let payload = value["streams"][0]["values"][0][1].as_str().unwrap();
        let decoded: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded["avg"], 0.5);
    }

    #[test]
    fn test_basic_authorization() {
        assert_eq!(basic_authorization("user:pass"), "Basic dXNlcjpwYXNz");
    }
}
