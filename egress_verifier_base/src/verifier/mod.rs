// src/verifier/mod.rs
//! Verification orchestration
//!
//! One run: expand the probe script, launch a workload, poll its output for
//! the probe payload, classify the payload, tear the workload down. Every
//! outcome after expansion lands in the [`OutputModel`]; only expansion
//! failures abort the run.

pub mod parallel;

pub use parallel::{merge_results, run_parallel, TargetResult, VerificationTarget};

use crate::extraction::{CancellationToken, OutputPoller, PollConfig, PollError};
use crate::output::{OutputError, OutputModel};
use crate::probes::{Probe, ProbeError};
use crate::workload::{LaunchRequest, WorkloadBackend, WorkloadOutput};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("Probe script could not be generated: {0}")]
    Probe(#[from] ProbeError),
}

pub struct EgressVerifier {
    probe: Arc<dyn Probe>,
    poll_config: PollConfig,
    cancel: CancellationToken,
    dry_run: bool,
    tags: BTreeMap<String, String>,
}

impl EgressVerifier {
    pub fn new(probe: Arc<dyn Probe>, poll_config: PollConfig) -> Self {
        Self {
            probe,
            poll_config,
            cancel: CancellationToken::new(),
            dry_run: false,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Expand the script and stop before launching anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn probe(&self) -> &Arc<dyn Probe> {
        &self.probe
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run one verification against `backend`
    pub fn verify(
        &self,
        backend: &dyn WorkloadBackend,
        vars: &HashMap<String, String>,
    ) -> Result<OutputModel, VerifierError> {
        let mut output = OutputModel::new();
        let probe_id = self.probe.probe_id();

        let userdata = match self.probe.expanded_userdata(vars) {
            Ok(script) => script,
            Err(ProbeError::Unsupported { probe_id, feature }) => {
                output.add_exception(format!(
                    "probe '{}' does not support {} on backend '{}'",
                    probe_id,
                    feature,
                    backend.backend_id()
                ));
                return Ok(output);
            }
            Err(e) => return Err(e.into()),
        };
        log::debug!("Expanded {} byte script for probe '{}'", userdata.len(), probe_id);

        if self.dry_run {
            log::info!("Dry run: not launching on '{}'", backend.backend_id());
            output.add_debug(format!("dry run script:\n{}", userdata));
            return Ok(output);
        }

        if self.cancel.is_cancelled() {
            output.add_exception("verification cancelled before launch");
            return Ok(output);
        }

        let mut request = LaunchRequest::new(probe_id, userdata);
        for (key, value) in &self.tags {
            request = request.with_tag(key.clone(), value.clone());
        }

        let handle = match backend.launch(&request) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Launch on '{}' failed: {}", backend.backend_id(), e);
                output.add_error(OutputError::with_context(
                    format!("launching workload on {}", backend.backend_id()),
                    e,
                ));
                return Ok(output);
            }
        };
        log::info!("Launched workload {} on '{}'", handle.id, backend.backend_id());

        let poller = OutputPoller::with_cancellation(self.poll_config, self.cancel.clone());
        let source = WorkloadOutput::new(backend, &handle);
        match poller.poll(&source, self.probe.starting_token(), self.probe.ending_token()) {
            Ok(payload) => self.probe.parse_probe_output(&payload, &mut output),
            Err(e) => {
                log::warn!("No probe verdict from workload {}: {}", handle.id, e);
                output.add_exception(poll_exception(&handle.id, &e));
            }
        }

        match backend.terminate(&handle) {
            Ok(()) => log::info!("Terminated workload {}", handle.id),
            Err(e) => {
                log::error!("Failed to terminate workload {}: {}", handle.id, e);
                output.add_error(OutputError::with_context(
                    format!("terminating workload {}", handle.id),
                    e,
                ));
            }
        }

        Ok(output)
    }
}

fn poll_exception(workload_id: &str, err: &PollError) -> String {
    match err {
        PollError::Cancelled { .. } => format!("workload {}: verification cancelled", workload_id),
        other => format!("workload {}: {}", workload_id, other),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StaticBackend;
    use super::*;
    use crate::probes::curl_json::vars;
    use crate::probes::{CurlJsonProbe, DummyProbe};
    use crate::template::TemplateError;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(20),
        }
    }

    fn curl_verifier() -> EgressVerifier {
        EgressVerifier::new(Arc::new(CurlJsonProbe::new().unwrap()), fast())
    }

    fn curl_vars() -> HashMap<String, String> {
        [
            (vars::TIMEOUT, "2"),
            (vars::DELAY, "1"),
            (vars::URLS, "https://x.com:443"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    const PASSING_CONSOLE: &str = "boot\nNV_CURLJSON_BEGIN\n\
        @NV@{\"scheme\":\"HTTPS\",\"exitcode\":0,\"errormsg\":null,\"url\":\"https://x.com:443\"}\n\
        NV_CURLJSON_END\n";

    #[test]
    fn test_successful_run_terminates_workload() {
        let backend = StaticBackend::new(PASSING_CONSOLE);
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();

        assert!(output.is_successful());
        assert_eq!(*backend.terminated.lock().unwrap(), vec!["w-123".to_string()]);
        let launched = backend.launched.lock().unwrap();
        assert_eq!(launched.len(), 1);
        assert!(launched[0].userdata.contains("'https://x.com:443'"));
    }

    #[test]
    fn test_blocked_endpoint_is_failure() {
        let console = "NV_CURLJSON_BEGIN\n\
            @NV@{\"scheme\":null,\"exitcode\":28,\"errormsg\":\"Connection timed out after 2001 milliseconds\",\"url\":\"https://x.com:443\"}\n\
            NV_CURLJSON_END\n";
        let backend = StaticBackend::new(console);
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();

        assert_eq!(output.failures().len(), 1);
        assert!(output.exceptions().is_empty());
        assert!(output.errors().is_empty());
    }

    #[test]
    fn test_timeout_is_exception() {
        let backend = StaticBackend::new("NV_CURLJSON_BEGIN\nstill running");
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();

        assert!(output.failures().is_empty());
        assert_eq!(output.exceptions().len(), 1);
        assert!(output.exceptions()[0].contains("Timed out"));
        assert_eq!(backend.terminated.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupted_output_is_exception() {
        let backend = StaticBackend::new("NV_CURLJSON_END\n");
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();
        assert_eq!(output.exceptions().len(), 1);
        assert!(output.exceptions()[0].contains("corrupted"));
    }

    #[test]
    fn test_launch_failure_is_error() {
        let mut backend = StaticBackend::new(PASSING_CONSOLE);
        backend.fail_launch = true;
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();

        assert_eq!(output.errors().len(), 1);
        assert!(output.errors()[0].to_string().contains("quota exceeded"));
        assert!(backend.terminated.lock().unwrap().is_empty());
    }

    #[test]
    fn test_teardown_failure_is_error_after_verdict() {
        let mut backend = StaticBackend::new(PASSING_CONSOLE);
        backend.fail_terminate = true;
        let output = curl_verifier().verify(&backend, &curl_vars()).unwrap();

        assert!(output.failures().is_empty());
        assert_eq!(output.errors().len(), 1);
        assert!(!output.is_successful());
    }

    #[test]
    fn test_template_error_aborts_run() {
        let backend = StaticBackend::new(PASSING_CONSOLE);
        let mut supplied = curl_vars();
        supplied.remove(vars::TIMEOUT);

        let result = curl_verifier().verify(&backend, &supplied);
        assert_matches!(
            result,
            Err(VerifierError::Probe(ProbeError::Template(
                TemplateError::MissingRequiredVariable { .. }
            )))
        );
        assert!(backend.launched.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_does_not_launch() {
        let backend = StaticBackend::new("");
        let output = curl_verifier()
            .with_dry_run(true)
            .verify(&backend, &curl_vars())
            .unwrap();

        assert!(output.is_successful());
        assert!(backend.launched.lock().unwrap().is_empty());
        assert!(output.debug_log()[0].contains("NV_CURLJSON_BEGIN"));
    }

    #[test]
    fn test_cancelled_run_is_exception() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let backend = StaticBackend::new(PASSING_CONSOLE);
        let output = curl_verifier()
            .with_cancellation(cancel)
            .verify(&backend, &curl_vars())
            .unwrap();

        assert_eq!(output.exceptions().len(), 1);
        assert!(output.exceptions()[0].contains("cancelled"));
        assert!(backend.launched.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_during_poll_still_terminates() {
        let backend = StaticBackend::new("NV_CURLJSON_BEGIN\nstill running\n");
        let verifier = EgressVerifier::new(
            Arc::new(CurlJsonProbe::new().unwrap()),
            PollConfig {
                interval: Duration::from_secs(10),
                max_wait: Duration::from_secs(60),
            },
        );
        let canceller = verifier.cancellation().clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        let output = verifier.verify(&backend, &curl_vars()).unwrap();
        handle.join().unwrap();

        assert!(!output.is_successful());
        assert_eq!(output.exceptions(), &["workload w-123: verification cancelled".to_string()]);
        assert_eq!(backend.launched.lock().unwrap().len(), 1);
        assert_eq!(*backend.terminated.lock().unwrap(), vec!["w-123".to_string()]);
    }

    #[test]
    fn test_tags_reach_launch_request() {
        let backend = StaticBackend::new("NV_DUMMY_BEGIN\ndummy probe ran\nNV_DUMMY_END\n");
        let mut tags = BTreeMap::new();
        tags.insert("owner".to_string(), "netops".to_string());

        let verifier = EgressVerifier::new(Arc::new(DummyProbe::new().unwrap()), fast()).with_tags(tags);
        let output = verifier.verify(&backend, &HashMap::new()).unwrap();

        assert!(output.is_successful());
        let launched = backend.launched.lock().unwrap();
        assert_eq!(launched[0].tags["owner"], "netops");
        assert_eq!(launched[0].probe_id, "dummy");
    }
}
