//! Replay backend
//!
//! Feeds a previously captured console or log file through the same
//! extraction and classification path as a live run. Nothing is launched.

use egress_verifier_base::extraction::OutputEncoding;
use egress_verifier_base::workload::{LaunchRequest, WorkloadBackend, WorkloadError, WorkloadHandle};
use std::path::PathBuf;

pub const REPLAY_BACKEND_ID: &str = "replay";

pub struct ReplayBackend {
    path: PathBuf,
    encoding: OutputEncoding,
}

impl ReplayBackend {
    /// Files ending in `.b64` are treated as base64
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let encoding = match path.extension().and_then(|e| e.to_str()) {
            Some("b64") => OutputEncoding::Base64,
            _ => OutputEncoding::Plain,
        };
        Self { path, encoding }
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl WorkloadBackend for ReplayBackend {
    fn backend_id(&self) -> &str {
        REPLAY_BACKEND_ID
    }

    fn output_encoding(&self) -> OutputEncoding {
        self.encoding
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }

    fn launch(&self, request: &LaunchRequest) -> Result<WorkloadHandle, WorkloadError> {
        if !self.path.is_file() {
            return Err(WorkloadError::launch_failed(
                REPLAY_BACKEND_ID,
                format!("{} is not a readable file", self.path.display()),
            ));
        }
        log::debug!(
            "Replaying {} for probe '{}' ({} byte script not executed)",
            self.path.display(),
            request.probe_id,
            request.userdata.len()
        );
        Ok(WorkloadHandle::new(self.path.display().to_string(), REPLAY_BACKEND_ID))
    }

    fn fetch_output(&self, handle: &WorkloadHandle) -> Result<String, WorkloadError> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| WorkloadError::fetch_failed(&handle.id, e.to_string()))
    }

    fn terminate(&self, _handle: &WorkloadHandle) -> Result<(), WorkloadError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_encoding_from_extension() {
        assert_eq!(ReplayBackend::new("console.b64").output_encoding(), OutputEncoding::Base64);
        assert_eq!(ReplayBackend::new("console.log").output_encoding(), OutputEncoding::Plain);
    }

    #[test]
    fn test_replays_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "boot\nNV_DUMMY_BEGIN\nok\nNV_DUMMY_END\n").unwrap();

        let backend = ReplayBackend::new(file.path());
        let handle = backend.launch(&LaunchRequest::new("dummy", "")).unwrap();
        let output = backend.fetch_output(&handle).unwrap();
        assert!(output.contains("NV_DUMMY_END"));
        assert!(backend.terminate(&handle).is_ok());
    }

    #[test]
    fn test_missing_file_fails_launch() {
        let backend = ReplayBackend::new("/nonexistent/console.log");
        assert!(backend.launch(&LaunchRequest::new("dummy", "")).is_err());
    }
}
