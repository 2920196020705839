// src/workload/traits.rs
//! Execution substrate abstraction
//!
//! A backend launches one disposable workload per verification run, hands
//! back its raw output on request, and tears it down afterwards. The core
//! never interprets the output itself; it only knows how it is encoded.

use crate::extraction::{OutputEncoding, OutputSource};
use crate::workload::error::WorkloadError;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// What to run inside the target network
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Fully expanded probe script
    pub userdata: String,
    pub probe_id: String,
    /// Labels applied to the workload where the substrate supports them
    pub tags: BTreeMap<String, String>,
}

impl LaunchRequest {
    pub fn new(probe_id: impl Into<String>, userdata: impl Into<String>) -> Self {
        Self {
            userdata: userdata.into(),
            probe_id: probe_id.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Identifies a launched workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadHandle {
    pub id: String,
    pub backend: String,
    pub launched_at: DateTime<Utc>,
}

impl WorkloadHandle {
    pub fn new(id: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            backend: backend.into(),
            launched_at: Utc::now(),
        }
    }
}

pub trait WorkloadBackend: Send + Sync {
    fn backend_id(&self) -> &str;

    /// Encoding of the blobs returned by [`WorkloadBackend::fetch_output`]
    fn output_encoding(&self) -> OutputEncoding;

    /// Human-readable description of where workloads run (subnet, network, file)
    fn target(&self) -> String;

    fn launch(&self, request: &LaunchRequest) -> Result<WorkloadHandle, WorkloadError>;

    /// Latest raw output blob; may be empty while the workload boots
    fn fetch_output(&self, handle: &WorkloadHandle) -> Result<String, WorkloadError>;

    fn terminate(&self, handle: &WorkloadHandle) -> Result<(), WorkloadError>;
}

/// Adapts a backend and one of its workloads to the poller's [`OutputSource`]
pub struct WorkloadOutput<'a> {
    backend: &'a dyn WorkloadBackend,
    handle: &'a WorkloadHandle,
}

impl<'a> WorkloadOutput<'a> {
    pub fn new(backend: &'a dyn WorkloadBackend, handle: &'a WorkloadHandle) -> Self {
        Self { backend, handle }
    }
}

impl OutputSource for WorkloadOutput<'_> {
    fn encoding(&self) -> OutputEncoding {
        self.backend.output_encoding()
    }

    fn fetch_raw(&self) -> Result<String, WorkloadError> {
        self.backend.fetch_output(self.handle)
    }
}
