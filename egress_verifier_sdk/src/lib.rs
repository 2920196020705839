//! # Egress Verifier SDK
//!
//! Workload backends and wiring for the `egress-verifier` binary.
//! Provides AWS instance, container and replay backends on top of the
//! probe engine in `egress_verifier_base`.

pub mod backends;
pub mod commands;

use egress_verifier_base::probes::{ProbeRegistry, RegistryError};

pub use backends::{create_backend, BackendError, BackendOptions, Platform};

/// Create a registry with all available probes
///
/// Includes:
/// - `curl-json` - structured curl write-out, the default
/// - `legacy` - validator container with regex classification
/// - `dummy` - no network access, for backend smoke tests
pub fn create_probe_registry() -> Result<ProbeRegistry, RegistryError> {
    let registry = ProbeRegistry::with_builtin_probes()?;
    log::debug!("Probe registry ready with {} probes", registry.len());
    Ok(registry)
}
