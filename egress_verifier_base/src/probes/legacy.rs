// src/probes/legacy.rs
//! Legacy text probe
//!
//! Kept for workloads that still run the older validator image. Its output is
//! free text, so classification is done with line-anchored patterns:
//!
//! - `Success!` anywhere means every endpoint was reached.
//! - `Unable to reach <target>` records a failure for `<target>`.
//! - A line containing `Cannot`, `Could not`, `Failed` or `command not found`
//!   is an unclassified error, unless the same line also mentions retrying.
//!
//! Known precision limit: the retry exemption only looks at the matching
//! line. When the validator prints the failure and the retry notice on
//! separate lines, a transient failure is reported as an error.

use crate::output::{OutputError, OutputModel};
use crate::probes::errors::ProbeError;
use crate::probes::traits::Probe;
use crate::template::{TemplateSpec, ValueRules};
use regex::Regex;
use std::collections::HashMap;

pub const LEGACY_PROBE_ID: &str = "legacy";

const STARTING_TOKEN: &str = "USERDATA BEGIN";
const ENDING_TOKEN: &str = "USERDATA END";

const USERDATA_TEMPLATE: &str = include_str!("assets/legacy_userdata.sh");

const RESERVED: [&str; 2] = ["USERDATA_BEGIN", "USERDATA_END"];

/// Regex-classified probe for the text-output validator
pub struct LegacyProbe {
    template: TemplateSpec,
    success: Regex,
    generic_failure: Regex,
    retrying: Regex,
    unreachable: Regex,
}

impl LegacyProbe {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self {
            template: TemplateSpec::parse(USERDATA_TEMPLATE)?,
            success: compile(r"Success!"),
            generic_failure: compile(r"(?m)^.*(?:Cannot|Could not|Failed|command not found).*$"),
            retrying: compile(r"(?i)retrying"),
            unreachable: compile(r"Unable to reach (\S+)"),
        })
    }

    fn rules() -> ValueRules {
        ValueRules::new()
            .with_duration("TIMEOUT")
            .with_duration("DELAY")
    }
}

fn invalid(variable: &str, reason: impl Into<String>) -> ProbeError {
    ProbeError::InvalidVariable {
        probe_id: LEGACY_PROBE_ID.to_string(),
        variable: variable.to_string(),
        reason: reason.into(),
    }
}

fn is_plain_arg_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || "-_.,:=/@%+".contains(c)
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("legacy probe patterns are valid")
}

impl Probe for LegacyProbe {
    fn probe_id(&self) -> &str {
        LEGACY_PROBE_ID
    }

    fn starting_token(&self) -> &str {
        STARTING_TOKEN
    }

    fn ending_token(&self) -> &str {
        ENDING_TOKEN
    }

    fn expanded_userdata(&self, supplied: &HashMap<String, String>) -> Result<String, ProbeError> {
        if let Some(image) = supplied.get("VALIDATOR_IMAGE") {
            if image.trim().is_empty() || image.contains('\'') || image.contains('\n') {
                return Err(invalid("VALIDATOR_IMAGE", "must be a non-empty image reference"));
            }
        }
        // Interpolated unquoted so it splits into separate arguments
        if let Some(args) = supplied.get("VALIDATOR_ARGS") {
            if let Some(bad) = args.chars().find(|c| !is_plain_arg_char(*c)) {
                return Err(invalid(
                    "VALIDATOR_ARGS",
                    format!("character {:?} is not allowed in unquoted arguments", bad),
                ));
            }
        }

        let reserved: HashMap<String, String> = RESERVED
            .iter()
            .zip([STARTING_TOKEN, ENDING_TOKEN])
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(self.template.expand(&reserved, supplied, &Self::rules())?)
    }

    fn parse_probe_output(&self, payload: &str, output: &mut OutputModel) {
        if self.success.is_match(payload) {
            output.add_debug("legacy validator reported success");
            return;
        }

        for caps in self.unreachable.captures_iter(payload) {
            output.add_failure(caps[1].to_string());
        }

        for found in self.generic_failure.find_iter(payload) {
            let line = found.as_str().trim();
            if self.retrying.is_match(line) {
                log::debug!("Ignoring transient legacy probe message: {}", line);
                output.add_debug(format!("transient: {}", line));
                continue;
            }
            output.add_error(OutputError::unclassified(line));
        }
    }

    fn description(&self) -> &str {
        "text output matched with regular expressions (deprecated)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn probe() -> LegacyProbe {
        LegacyProbe::new().expect("embedded template parses")
    }

    #[test]
    fn test_success_short_circuits() {
        let mut output = OutputModel::new();
        probe().parse_probe_output(
            "Unable to reach quay.io:443\nSuccess!\nFailed something\n",
            &mut output,
        );
        assert!(output.is_successful());
    }

    #[test]
    fn test_unreachable_targets_become_failures() {
        let mut output = OutputModel::new();
        probe().parse_probe_output(
            "Unable to reach quay.io:443\nUnable to reach registry.redhat.io:443\n",
            &mut output,
        );
        assert_eq!(
            output.failures(),
            &["quay.io:443".to_string(), "registry.redhat.io:443".to_string()]
        );
        assert!(output.errors().is_empty());
    }

    #[test]
    fn test_generic_failures_and_retry_heuristic() {
        let payload = "Failed to connect, retrying in 2s\n\
                       Could not open /etc/validator.yaml\n\
                       sh: validator: command not found\n";
        let mut output = OutputModel::new();
        probe().parse_probe_output(payload, &mut output);

        assert!(output.failures().is_empty());
        assert_eq!(output.errors().len(), 2);
        assert_matches!(output.errors()[0], OutputError::Unclassified { .. });
        assert!(output.errors()[0].to_string().contains("Could not open"));
        assert_eq!(output.debug_log().len(), 1);
    }

    #[test]
    fn test_retry_on_next_line_is_not_recognized() {
        let mut output = OutputModel::new();
        probe().parse_probe_output("Failed to connect\nretrying\n", &mut output);
        assert_eq!(output.errors().len(), 1);
    }

    #[test]
    fn test_expanded_userdata() {
        let supplied: HashMap<String, String> = [
            ("VALIDATOR_IMAGE", "quay.io/app-sre/osd-network-verifier:v1"),
            ("TIMEOUT", "2"),
            ("DELAY", "10"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let script = probe().expanded_userdata(&supplied).unwrap();
        assert!(script.contains("echo \"USERDATA BEGIN\""));
        assert!(script.contains("echo \"USERDATA END\""));
        assert!(script.contains("$RUNTIME run --rm 'quay.io/app-sre/osd-network-verifier:v1' --timeout=2s"));
    }

    #[test]
    fn test_missing_image_is_rejected() {
        let supplied: HashMap<String, String> = [("TIMEOUT", "2"), ("DELAY", "10")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_matches!(
            probe().expanded_userdata(&supplied),
            Err(ProbeError::Template(_))
        );
    }

    #[test]
    fn test_validator_args_must_be_plain_words() {
        let mut supplied: HashMap<String, String> = [
            ("VALIDATOR_IMAGE", "quay.io/app-sre/osd-network-verifier:v1"),
            ("TIMEOUT", "2"),
            ("DELAY", "10"),
            ("VALIDATOR_ARGS", "--config=/etc/v.yaml --debug"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let script = probe().expanded_userdata(&supplied).unwrap();
        assert!(script.contains("--timeout=2s --config=/etc/v.yaml --debug"));

        for hostile in ["--x; rm -rf /", "$(reboot)", "`id`", "a | b", "a\nb", "'x'", "a > /etc/x"] {
            supplied.insert("VALIDATOR_ARGS".to_string(), hostile.to_string());
            assert_matches!(
                probe().expanded_userdata(&supplied),
                Err(ProbeError::InvalidVariable { ref variable, .. }) if variable == "VALIDATOR_ARGS"
            );
        }
    }
}
