//! # Verification Report
//!
//! Serializable record of one verification run, built from an
//! [`OutputModel`] once the run has finished.

use super::model::OutputModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Complete result of one egress verification run
#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Unique identifier for this run
    pub run_id: String,

    /// Probe that generated the workload script and parsed its output
    pub probe: String,

    /// Substrate the workload ran on (e.g. "aws", "container")
    pub backend: String,

    /// Free-form target label (subnet, network, region)
    pub target: String,

    /// Host the verifier itself ran on
    pub host: HostContext,

    pub timestamp: TimestampInfo,

    pub failures: Vec<String>,
    pub exceptions: Vec<String>,
    pub errors: Vec<String>,

    /// Overall verdict, equal to `OutputModel::is_successful`
    pub passed: bool,
}

/// Host execution context
#[derive(Debug, Serialize, Deserialize)]
pub struct HostContext {
    pub hostname: String,
    pub os_info: String,
}

/// Timestamp information for the run
#[derive(Debug, Serialize, Deserialize)]
pub struct TimestampInfo {
    /// When the run started (RFC3339 format)
    pub run_start: DateTime<Utc>,

    /// When the run completed (RFC3339 format)
    pub run_end: DateTime<Utc>,

    pub duration_ms: u64,
}

impl HostContext {
    /// Create host context from system information
    pub fn from_system() -> Self {
        Self {
            hostname: hostname::get()
                .unwrap_or_else(|_| std::ffi::OsString::from("unknown"))
                .to_string_lossy()
                .to_string(),
            os_info: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

impl TimestampInfo {
    pub fn new(run_start: DateTime<Utc>, run_end: DateTime<Utc>) -> Self {
        let duration_ms = (run_end - run_start).num_milliseconds().max(0) as u64;
        Self {
            run_start,
            run_end,
            duration_ms,
        }
    }
}

impl VerificationReport {
    /// Snapshot an output model into a report
    pub fn from_output(
        output: &OutputModel,
        probe: impl Into<String>,
        backend: impl Into<String>,
        target: impl Into<String>,
        run_start: DateTime<Utc>,
    ) -> Self {
        let (failures, exceptions, errors) = output.parse();
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            probe: probe.into(),
            backend: backend.into(),
            target: target.into(),
            host: HostContext::from_system(),
            timestamp: TimestampInfo::new(run_start, Utc::now()),
            failures: failures.to_vec(),
            exceptions: exceptions.to_vec(),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            passed: output.is_successful(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
