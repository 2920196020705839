// src/probes/errors.rs
//! Error types for the probe module

use crate::template::TemplateError;

/// Errors raised while preparing a probe's workload script
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Userdata template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Probe '{probe_id}' received an invalid value for '{variable}': {reason}")]
    InvalidVariable {
        probe_id: String,
        variable: String,
        reason: String,
    },

    #[error("Probe '{probe_id}' does not support {feature}")]
    Unsupported { probe_id: String, feature: String },
}

/// Probe registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown probe: {0}")]
    UnknownProbe(String),

    #[error("Duplicate probe registration: {probe_id}")]
    DuplicateProbe { probe_id: String },

    #[error("Probe '{probe_id}' rejected: {reason}")]
    RegistrationFailed { probe_id: String, reason: String },

    #[error("Registry is empty - no probes registered")]
    EmptyRegistry,
}
