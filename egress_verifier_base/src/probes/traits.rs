// src/probes/traits.rs
//! Probe contract
//!
//! A probe decides what the disposable workload runs and how its output is
//! read back. Every probe provides the same four operations; the orchestrator
//! never needs to know which probe it is driving.

use crate::output::OutputModel;
use crate::probes::errors::ProbeError;
use std::collections::HashMap;

/// Pluggable strategy for instructing a workload and interpreting its output
pub trait Probe: Send + Sync {
    /// Registry identifier (e.g. `curl-json`)
    fn probe_id(&self) -> &str;

    /// Sentinel printed immediately before the diagnostic payload
    fn starting_token(&self) -> &str;

    /// Sentinel printed immediately after the diagnostic payload
    fn ending_token(&self) -> &str;

    /// Expand the probe's script template with caller-supplied variables
    ///
    /// Token sentinels and other probe-internal values are fixed by the probe;
    /// supplying them is an error.
    fn expanded_userdata(&self, vars: &HashMap<String, String>) -> Result<String, ProbeError>;

    /// Interpret the payload found between the tokens and record the verdict
    fn parse_probe_output(&self, payload: &str, output: &mut OutputModel);

    /// Optional: one-line description for listings
    fn description(&self) -> &str {
        ""
    }
}
