// src/output/model.rs
//! Three-tier verdict container for one verification run

use super::error::OutputError;
use std::fmt;

/// Verdict of a single verification run
///
/// Failures, exceptions and errors are kept in separate lists and are never
/// collapsed. The model is append-only: once anything is recorded,
/// [`OutputModel::is_successful`] stays false for the lifetime of the value.
#[derive(Debug, Default)]
pub struct OutputModel {
    /// Egress endpoints confirmed unreachable
    failures: Vec<String>,

    /// Conditions that kept the run from reaching a conclusive verdict
    exceptions: Vec<String>,

    /// Unexpected faults in the verification machinery
    errors: Vec<OutputError>,

    /// Diagnostic lines, excluded from the verdict
    debug_log: Vec<String>,
}

impl OutputModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unreachable endpoint
    pub fn add_failure(&mut self, failure: impl Into<String>) {
        self.failures.push(failure.into());
    }

    /// Record an inconclusive-run condition
    pub fn add_exception(&mut self, exception: impl Into<String>) {
        self.exceptions.push(exception.into());
    }

    pub fn add_error(&mut self, error: OutputError) {
        self.errors.push(error);
    }

    pub fn add_debug(&mut self, line: impl Into<String>) {
        self.debug_log.push(line.into());
    }

    /// True iff no failure, exception or error has been recorded
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty() && self.exceptions.is_empty() && self.errors.is_empty()
    }

    /// Structured accessor: `(failures, exceptions, errors)`
    pub fn parse(&self) -> (&[String], &[String], &[OutputError]) {
        (&self.failures, &self.exceptions, &self.errors)
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn exceptions(&self) -> &[String] {
        &self.exceptions
    }

    pub fn errors(&self) -> &[OutputError] {
        &self.errors
    }

    pub fn debug_log(&self) -> &[String] {
        &self.debug_log
    }

    /// Append everything recorded in `other`
    ///
    /// Used to combine per-target models after their poll loops finish.
    pub fn merge(&mut self, other: OutputModel) {
        self.failures.extend(other.failures);
        self.exceptions.extend(other.exceptions);
        self.errors.extend(other.errors);
        self.debug_log.extend(other.debug_log);
    }

    /// Human-readable report with one labeled section per tier
    pub fn summary(&self) -> String {
        let mut out = String::new();

        if self.is_successful() {
            out.push_str("All egress endpoints reachable.\n");
            return out;
        }

        push_section(&mut out, "Failures (egress blocked)", &self.failures);
        push_section(&mut out, "Exceptions (verification inconclusive)", &self.exceptions);

        let errors: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        push_section(&mut out, "Errors (unexpected faults)", &errors);

        out
    }
}

fn push_section(out: &mut String, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("{} [{}]:\n", title, entries.len()));
    for entry in entries {
        out.push_str(&format!("  - {}\n", entry));
    }
}

impl fmt::Display for OutputModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_model_is_successful() {
        let model = OutputModel::new();
        assert!(model.is_successful());
        let (failures, exceptions, errors) = model.parse();
        assert!(failures.is_empty() && exceptions.is_empty() && errors.is_empty());
    }

    #[test]
    fn test_any_single_entry_flips_success() {
        let mut model = OutputModel::new();
        model.add_failure("https://a.example:443 (timeout)");
        assert!(!model.is_successful());

        let mut model = OutputModel::new();
        model.add_exception("timed out waiting for probe output");
        assert!(!model.is_successful());

        let mut model = OutputModel::new();
        model.add_error(OutputError::unclassified("Failed to start"));
        assert!(!model.is_successful());
    }

    #[test]
    fn test_debug_log_does_not_affect_verdict() {
        let mut model = OutputModel::new();
        model.add_debug("launched workload i-123");
        assert!(model.is_successful());
        assert_eq!(model.debug_log().len(), 1);
    }

    #[test]
    fn test_merge_keeps_tiers_separate() {
        let mut first = OutputModel::new();
        first.add_failure("x.com:443 (blocked)");

        let mut second = OutputModel::new();
        second.add_exception("corrupted output");
        second.add_error(OutputError::unclassified("boom"));
        second.add_debug("region b");

        first.merge(second);
        let (failures, exceptions, errors) = first.parse();
        assert_eq!(failures.len(), 1);
        assert_eq!(exceptions.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(first.debug_log(), &["region b".to_string()]);
    }

    #[test]
    fn test_summary_sections() {
        let mut model = OutputModel::new();
        assert!(model.summary().contains("All egress endpoints reachable"));

        model.add_failure("https://x.com:443 (SSL certificate problem)");
        model.add_error(OutputError::unclassified("command not found"));
        let summary = model.to_string();

        assert!(summary.contains("Failures (egress blocked) [1]"));
        assert!(summary.contains("  - https://x.com:443 (SSL certificate problem)"));
        assert!(!summary.contains("Exceptions"));
        assert!(summary.contains("Errors (unexpected faults) [1]"));
    }
}
