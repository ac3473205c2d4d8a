//! Ships completed periods to Loki through the relay.
//!
//! Every [`NoiseEvent::LogBatch`] becomes one detached task that POSTs the
//! push payload. Failures are logged and appended to the shared
//! [`ErrorPanel`]; the batch is not retried.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use embassy_sync::pubsub::WaitResult;
use log::{debug, error, info, warn};
use thiserror::Error;

use noise_core::events::NoiseEvent;
use noise_core::loki::{LogLine, PushRequest, basic_authorization};

use crate::app_state::NoiseSubscriber;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("Bad response status code (see server logs)")]
    BadStatus(u16),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Number of transmission errors the panel keeps
pub const ERROR_PANEL_CAPACITY: usize = 16;

/// Most recent transmission errors collected for display, oldest first
#[derive(Debug, Clone, Default)]
pub struct ErrorPanel {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl ErrorPanel {
    pub fn push(&self, message: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push_back(message);
            while lines.len() > ERROR_PANEL_CAPACITY {
                lines.pop_front();
            }
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().ok().and_then(|l| l.back().cloned())
    }
}

/// Everything a send task needs, cheap to clone into each task
#[derive(Clone)]
struct Target {
    client: reqwest::Client,
    endpoint: String,
    device: String,
    authorization: String,
}

impl Target {
    async fn send(&self, lines: Vec<LogLine>) -> Result<(), EmitError> {
        let body = PushRequest::new(&self.device, lines).to_json()?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Err(EmitError::BadStatus(status));
        }
        Ok(())
    }
}

pub struct LogEmitter {
    target: Target,
    errors: ErrorPanel,
}

impl LogEmitter {
    /// `endpoint` is the relay URL; `loki_basic_auth` is the raw
    /// `user:password` credential.
    pub fn new(
        endpoint: String,
        device: String,
        loki_basic_auth: &str,
        errors: ErrorPanel,
    ) -> Self {
        Self {
            target: Target {
                client: reqwest::Client::new(),
                endpoint,
                device,
                authorization: basic_authorization(loki_basic_auth),
            },
            errors,
        }
    }

    /// Send `lines` in the background. Empty batches are skipped.
    pub fn emit(&self, lines: Vec<LogLine>) -> Option<tokio::task::JoinHandle<()>> {
        if lines.is_empty() {
            return None;
        }

        debug!("Emitting {} log lines", lines.len());
        let target = self.target.clone();
        let errors = self.errors.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = target.send(lines).await {
                error!("Failed to send log batch: {}", e);
                errors.push(e.to_string());
            }
        }))
    }

    /// Emit every log batch published on `subscriber`.
    pub async fn run(&self, mut subscriber: NoiseSubscriber<'_>) {
        info!("Log emitter started, sending to {}", self.target.endpoint);

        loop {
            match subscriber.next_message().await {
                WaitResult::Message(NoiseEvent::LogBatch(lines)) => {
                    self.emit(lines);
                }
                WaitResult::Message(NoiseEvent::Chart(_)) => {}
                WaitResult::Lagged(missed) => {
                    warn!("Log emitter lagged, {} events lost", missed);
                }
            }
        }
    }
}
