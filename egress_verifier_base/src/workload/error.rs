use crate::workload::command_executor::CommandError;

/// Workload backend errors
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("Failed to launch workload on '{backend}': {reason}")]
    LaunchFailed { backend: String, reason: String },

    #[error("Failed to fetch output of workload '{workload_id}': {reason}")]
    FetchFailed { workload_id: String, reason: String },

    #[error("Failed to terminate workload '{workload_id}': {reason}")]
    TerminateFailed { workload_id: String, reason: String },

    #[error("Invalid backend configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

impl WorkloadError {
    pub fn launch_failed(backend: &str, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn fetch_failed(workload_id: &str, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            workload_id: workload_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn terminate_failed(workload_id: &str, reason: impl Into<String>) -> Self {
        Self::TerminateFailed {
            workload_id: workload_id.to_string(),
            reason: reason.into(),
        }
    }
}
