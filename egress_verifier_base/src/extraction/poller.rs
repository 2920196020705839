// src/extraction/poller.rs
//! Bounded polling harness around [`scan_for_payload`]
//!
//! Fetches the latest raw output from an [`OutputSource`] at a fixed interval,
//! decodes it, and stops on the first terminal scan state, the deadline, or
//! cancellation. Fetch and decode faults are transient: the loop keeps going
//! and the last fault is attached to the timeout error.

use crate::extraction::cancel::CancellationToken;
use crate::extraction::decode::OutputEncoding;
use crate::extraction::scan::{scan_for_payload, TokenScan};
use crate::workload::WorkloadError;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(4 * 60);

/// Anything that can hand back the current raw output blob of a workload
pub trait OutputSource {
    fn encoding(&self) -> OutputEncoding;

    fn fetch_raw(&self) -> Result<String, WorkloadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

/// Terminal poll failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Timed out after {waited:?} waiting for probe output ({attempts} fetches){}",
        .last_fault.as_ref().map(|f| format!("; last fault: {}", f)).unwrap_or_default())]
    Timeout {
        waited: Duration,
        attempts: u32,
        last_fault: Option<String>,
    },

    #[error("Probe output corrupted: {reason}")]
    Corrupted { reason: String },

    #[error("Polling cancelled after {attempts} fetches")]
    Cancelled { attempts: u32 },
}

pub struct OutputPoller {
    config: PollConfig,
    cancel: CancellationToken,
}

impl OutputPoller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(config: PollConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `source` until the payload between the tokens is available
    pub fn poll<S: OutputSource + ?Sized>(
        &self,
        source: &S,
        starting_token: &str,
        ending_token: &str,
    ) -> Result<String, PollError> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last_fault: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled { attempts });
            }

            attempts += 1;
            let fetched = source
                .fetch_raw()
                .map_err(|e| e.to_string())
                .and_then(|raw| source.encoding().decode(&raw).map_err(|e| e.to_string()));

            match fetched {
                Ok(text) => match scan_for_payload(&text, starting_token, ending_token) {
                    TokenScan::Complete(payload) => {
                        log::info!(
                            "Probe output complete after {} fetches ({} bytes)",
                            attempts,
                            payload.len()
                        );
                        return Ok(payload);
                    }
                    TokenScan::Corrupted(reason) => {
                        return Err(PollError::Corrupted { reason });
                    }
                    TokenScan::InProgress => {
                        log::debug!("Probe running, waiting for '{}'", ending_token);
                    }
                    TokenScan::NotStarted => {
                        log::debug!("Probe output not yet available");
                    }
                },
                Err(fault) => {
                    log::warn!("Output fetch attempt {} failed: {}", attempts, fault);
                    last_fault = Some(fault);
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.config.max_wait {
                return Err(PollError::Timeout {
                    waited: elapsed,
                    attempts,
                    last_fault,
                });
            }

            let nap = self.config.interval.min(self.config.max_wait - elapsed);
            if self.cancel.sleep(nap) {
                return Err(PollError::Cancelled { attempts });
            }
        }
    }
}
