// src/probes/mod.rs
//! Probe module
//!
//! A probe pairs a workload script generator with an output parser:
//! - [`Probe`] - the four-operation contract every probe implements
//! - [`CurlJsonProbe`] - structured curl write-out (default)
//! - [`LegacyProbe`] - regex classification of text output (deprecated)
//! - [`DummyProbe`] - no-op probe for backend smoke tests
//! - [`ProbeRegistry`] - lookup by identifier

pub mod curl_json;
pub mod dummy;
pub mod errors;
pub mod legacy;
pub mod registry;
pub mod result;
pub mod traits;

pub use curl_json::{CurlJsonProbe, CURL_JSON_PROBE_ID};
pub use dummy::{DummyProbe, DUMMY_PROBE_ID};
pub use errors::{ProbeError, RegistryError};
pub use legacy::{LegacyProbe, LEGACY_PROBE_ID};
pub use registry::{ProbeInfo, ProbeRegistry};
pub use result::{ProbeResult, SchemeClass, CURL_OK, TELNET_CONNECTED_EXIT_CODE};
pub use traits::Probe;
