//! # Egress Verifier Base
//!
//! Probe execution and result classification for network egress
//! verification. A probe script is launched in a disposable workload inside
//! the network under test; its output is pulled back from a shared console
//! or log stream, cut out between the probe's tokens, and classified into
//! failures, exceptions and errors.
//!
//! Substrate backends (cloud instances, containers) live in the SDK crate
//! and plug in through [`workload::WorkloadBackend`].

pub mod command;
pub mod config;
pub mod endpoints;
pub mod extraction;
pub mod output;
pub mod probes;
pub mod template;
pub mod verifier;
pub mod workload;

pub use probes::ProbeRegistry;
pub use verifier::EgressVerifier;

pub mod prelude {
    pub use crate::config::{ConfigError, VerifierConfig};
    pub use crate::endpoints::{EndpointError, EndpointList, EndpointSpec, EndpointUrls};
    pub use crate::extraction::{
        scan_for_payload, CancellationToken, OutputEncoding, OutputPoller, PollConfig, PollError,
        TokenScan,
    };
    pub use crate::output::{OutputError, OutputModel, VerificationReport};
    pub use crate::probes::{Probe, ProbeError, ProbeInfo, ProbeRegistry, RegistryError};
    pub use crate::verifier::{
        merge_results, run_parallel, EgressVerifier, TargetResult, VerificationTarget,
        VerifierError,
    };
    pub use crate::workload::{
        CommandError, CommandOutput, LaunchRequest, SystemCommandExecutor, WorkloadBackend,
        WorkloadError, WorkloadHandle,
    };
}
