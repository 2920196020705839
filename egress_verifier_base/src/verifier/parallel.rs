// src/verifier/parallel.rs
//! Concurrent verification of independent targets
//!
//! Each target gets its own thread, its own workload and its own
//! [`OutputModel`]; nothing is shared between poll loops. Models are merged
//! only after every thread has joined.

use super::{EgressVerifier, VerifierError};
use crate::output::{OutputError, OutputModel};
use crate::workload::WorkloadBackend;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::thread;

/// One independent verification: a backend plus the probe variables for it
pub struct VerificationTarget<'a> {
    pub label: String,
    pub backend: &'a dyn WorkloadBackend,
    pub vars: HashMap<String, String>,
}

pub struct TargetResult {
    pub label: String,
    pub backend: String,
    pub started: DateTime<Utc>,
    pub outcome: Result<OutputModel, VerifierError>,
}

/// Verify every target, at most `max_threads` at a time
///
/// Results come back in target order.
pub fn run_parallel(
    verifier: &EgressVerifier,
    targets: &[VerificationTarget<'_>],
    max_threads: usize,
) -> Vec<TargetResult> {
    let max_threads = max_threads.max(1);
    let mut results = Vec::with_capacity(targets.len());

    log::info!(
        "Verifying {} targets with up to {} concurrent workloads",
        targets.len(),
        max_threads
    );

    for chunk in targets.chunks(max_threads) {
        thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|target| {
                    let started = Utc::now();
                    let handle = scope.spawn(move || verifier.verify(target.backend, &target.vars));
                    (target, started, handle)
                })
                .collect();

            for (target, started, handle) in handles {
                let outcome = match handle.join() {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        log::error!("Verification thread for '{}' panicked", target.label);
                        let mut output = OutputModel::new();
                        output.add_error(OutputError::unclassified(format!(
                            "verification of '{}' panicked",
                            target.label
                        )));
                        Ok(output)
                    }
                };
                results.push(TargetResult {
                    label: target.label.clone(),
                    backend: target.backend.backend_id().to_string(),
                    started,
                    outcome,
                });
            }
        });
    }

    results
}

/// Fold per-target outcomes into one model
///
/// A target whose script could not be generated contributes an error.
pub fn merge_results(results: Vec<TargetResult>) -> OutputModel {
    let mut merged = OutputModel::new();
    for result in results {
        match result.outcome {
            Ok(output) => merged.merge(output),
            Err(e) => merged.add_error(OutputError::with_context(
                format!("verifying {}", result.label),
                e,
            )),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PollConfig;
    use crate::probes::curl_json::vars;
    use crate::probes::CurlJsonProbe;
    use crate::verifier::test_support::StaticBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn console(exitcode: i64, url: &str) -> String {
        format!(
            "NV_CURLJSON_BEGIN\n@NV@{{\"scheme\":\"HTTPS\",\"exitcode\":{},\"errormsg\":\"err\",\"url\":\"{}\"}}\nNV_CURLJSON_END\n",
            exitcode, url
        )
    }

    fn target_vars(url: &str) -> HashMap<String, String> {
        [(vars::TIMEOUT, "2"), (vars::DELAY, "1"), (vars::URLS, url)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_targets_are_independent() {
        let verifier = EgressVerifier::new(
            Arc::new(CurlJsonProbe::new().unwrap()),
            PollConfig {
                interval: Duration::from_millis(1),
                max_wait: Duration::from_millis(20),
            },
        );
        let ok = StaticBackend::new(&console(0, "https://a.com:443"));
        let blocked = StaticBackend::new(&console(7, "https://b.com:443"));
        let stuck = StaticBackend::new("NV_CURLJSON_BEGIN\n");

        let targets = vec![
            VerificationTarget {
                label: "subnet-a".to_string(),
                backend: &ok,
                vars: target_vars("https://a.com:443"),
            },
            VerificationTarget {
                label: "subnet-b".to_string(),
                backend: &blocked,
                vars: target_vars("https://b.com:443"),
            },
            VerificationTarget {
                label: "subnet-c".to_string(),
                backend: &stuck,
                vars: target_vars("https://c.com:443"),
            },
        ];

        let results = run_parallel(&verifier, &targets, 2);
        let labels: Vec<_> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["subnet-a", "subnet-b", "subnet-c"]);

        let outputs: Vec<_> = results
            .iter()
            .map(|r| r.outcome.as_ref().unwrap())
            .collect();
        assert!(outputs[0].is_successful());
        assert_eq!(outputs[1].failures().len(), 1);
        assert_eq!(outputs[2].exceptions().len(), 1);

        let merged = merge_results(results);
        assert_eq!(merged.failures().len(), 1);
        assert_eq!(merged.exceptions().len(), 1);
        assert!(merged.errors().is_empty());
    }

    #[test]
    fn test_expansion_error_becomes_error_on_merge() {
        let verifier = EgressVerifier::new(
            Arc::new(CurlJsonProbe::new().unwrap()),
            PollConfig::default(),
        );
        let backend = StaticBackend::new("");
        let targets = vec![VerificationTarget {
            label: "bad".to_string(),
            backend: &backend,
            vars: HashMap::new(),
        }];

        let merged = merge_results(run_parallel(&verifier, &targets, 4));
        assert_eq!(merged.errors().len(), 1);
        assert!(merged.errors()[0].to_string().starts_with("verifying bad"));
    }
}
