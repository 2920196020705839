// src/probes/curl_json.rs
//! curl JSON probe
//!
//! The workload runs a single composite curl command whose write-out emits one
//! `@NV@`-prefixed JSON object per endpoint. Parsing is tolerant per line: a
//! bad line is recorded as an error and the remaining lines are still judged.

use crate::command::{CurlCommand, CurlOptions, DEFAULT_LINE_PREFIX};
use crate::output::{OutputError, OutputModel};
use crate::probes::errors::ProbeError;
use crate::probes::result::ProbeResult;
use crate::probes::traits::Probe;
use crate::template::{validate_count, validate_duration, TemplateSpec, ValueRules};
use std::collections::HashMap;
use std::time::Duration;

pub const CURL_JSON_PROBE_ID: &str = "curl-json";

const STARTING_TOKEN: &str = "NV_CURLJSON_BEGIN";
const ENDING_TOKEN: &str = "NV_CURLJSON_END";

const USERDATA_TEMPLATE: &str = include_str!("assets/curl_json_userdata.sh");

/// Caller-facing variable names
pub mod vars {
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const DELAY: &str = "DELAY";
    pub const URLS: &str = "URLS";
    pub const TLS_DISABLED_URLS: &str = "TLS_DISABLED_URLS";
    pub const NOTLS: &str = "NOTLS";
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
    pub const CA_PATHS: &str = "CA_PATHS";
    pub const PROXY_CACERT_PATH: &str = "PROXY_CACERT_PATH";
    pub const HTTP_PROXY: &str = "HTTP_PROXY";
    pub const HTTPS_PROXY: &str = "HTTPS_PROXY";
    pub const NO_PROXY: &str = "NO_PROXY";

    /// Fixed by the probe
    pub const USERDATA_BEGIN: &str = "USERDATA_BEGIN";
    pub const USERDATA_END: &str = "USERDATA_END";
    pub const CURL_COMMAND: &str = "CURL_COMMAND";
}

const RESERVED: [&str; 3] = [vars::USERDATA_BEGIN, vars::USERDATA_END, vars::CURL_COMMAND];

/// Values interpolated into single-quoted shell words
const QUOTED_VALUES: [&str; 6] = [
    vars::URLS,
    vars::TLS_DISABLED_URLS,
    vars::CA_PATHS,
    vars::HTTP_PROXY,
    vars::HTTPS_PROXY,
    vars::NO_PROXY,
];

/// Probe driving curl's structured `--write-out '%{json}'` mode
pub struct CurlJsonProbe {
    template: TemplateSpec,
    line_prefix: String,
}

impl CurlJsonProbe {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self {
            template: TemplateSpec::parse(USERDATA_TEMPLATE)?,
            line_prefix: DEFAULT_LINE_PREFIX.to_string(),
        })
    }

    fn rules() -> ValueRules {
        ValueRules::new()
            .with_duration(vars::TIMEOUT)
            .with_duration(vars::DELAY)
            .with_count(vars::MAX_RETRIES)
    }

    fn invalid(&self, variable: &str, reason: impl Into<String>) -> ProbeError {
        ProbeError::InvalidVariable {
            probe_id: CURL_JSON_PROBE_ID.to_string(),
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }

    /// Build curl options from already-validated variables
    fn curl_options(&self, supplied: &HashMap<String, String>) -> Result<CurlOptions, ProbeError> {
        let mut options = CurlOptions {
            line_prefix: self.line_prefix.clone(),
            ..CurlOptions::default()
        };

        if let Some(timeout) = supplied.get(vars::TIMEOUT) {
            options.timeout = Duration::from_secs_f64(validate_duration(vars::TIMEOUT, timeout)?);
        }
        if let Some(retries) = supplied.get(vars::MAX_RETRIES) {
            options.max_retries = validate_count(vars::MAX_RETRIES, retries)? as u32;
        }
        if let Some(paths) = supplied.get(vars::CA_PATHS) {
            options.ca_paths = split_list(paths);
        }
        if let Some(path) = supplied.get(vars::PROXY_CACERT_PATH) {
            if !path.trim().is_empty() {
                options.proxy_cacert = Some(path.trim().to_string());
            }
        }
        if let Some(no_tls) = supplied.get(vars::NOTLS) {
            options.no_tls = match no_tls.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "0" | "no" => false,
                "true" | "1" | "yes" => true,
                other => {
                    return Err(self.invalid(vars::NOTLS, format!("'{}' is not a boolean", other)))
                }
            };
        }

        Ok(options)
    }

    fn check_shell_safe(&self, supplied: &HashMap<String, String>) -> Result<(), ProbeError> {
        for name in QUOTED_VALUES {
            if let Some(value) = supplied.get(name) {
                if value.contains('\'') || value.contains('\n') || value.contains('\r') {
                    return Err(self.invalid(name, "must not contain quotes or line breaks"));
                }
            }
        }
        Ok(())
    }

    /// Decode one payload line; `None` for blank lines
    fn parse_line(&self, line: &str) -> Option<Result<ProbeResult, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(idx) = line.find(&self.line_prefix) else {
            return Some(Err(format!("missing {} prefix", self.line_prefix)));
        };

        let json = line[idx + self.line_prefix.len()..].trim();
        Some(ProbeResult::from_json(json).map_err(|e| format!("invalid probe JSON: {}", e)))
    }
}

impl Probe for CurlJsonProbe {
    fn probe_id(&self) -> &str {
        CURL_JSON_PROBE_ID
    }

    fn starting_token(&self) -> &str {
        STARTING_TOKEN
    }

    fn ending_token(&self) -> &str {
        ENDING_TOKEN
    }

    fn expanded_userdata(&self, supplied: &HashMap<String, String>) -> Result<String, ProbeError> {
        let rules = Self::rules();
        self.template.validate(&RESERVED, supplied, &rules)?;
        self.check_shell_safe(supplied)?;

        let options = self.curl_options(supplied)?;
        let tls_urls = supplied.get(vars::URLS).map(|u| split_list(u)).unwrap_or_default();
        let tls_disabled_urls = supplied
            .get(vars::TLS_DISABLED_URLS)
            .map(|u| split_list(u))
            .unwrap_or_default();

        let command = CurlCommand::generate(&tls_urls, &tls_disabled_urls, &options);
        log::debug!(
            "Generated curl command ({} TLS, {} TLS-disabled URLs, chained: {})",
            tls_urls.len(),
            tls_disabled_urls.len(),
            command.is_chained()
        );

        let reserved: HashMap<String, String> = [
            (vars::USERDATA_BEGIN, STARTING_TOKEN.to_string()),
            (vars::USERDATA_END, ENDING_TOKEN.to_string()),
            (vars::CURL_COMMAND, command.render()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Ok(self.template.expand(&reserved, supplied, &rules)?)
    }

    fn parse_probe_output(&self, payload: &str, output: &mut OutputModel) {
        let mut checked = 0usize;
        let mut unreachable = 0usize;

        for (idx, line) in payload.lines().enumerate() {
            let line_number = idx + 1;
            match self.parse_line(line) {
                None => continue,
                Some(Err(reason)) => {
                    log::warn!("Unparseable probe line {}: {}", line_number, reason);
                    output.add_error(OutputError::MalformedProbeLine {
                        line_number,
                        reason,
                    });
                }
                Some(Ok(result)) => {
                    checked += 1;
                    if result.is_successful_connection() {
                        output.add_debug(format!("reachable: {}", result.url));
                    } else {
                        unreachable += 1;
                        output.add_failure(result.failure_message());
                    }
                }
            }
        }

        log::info!(
            "Parsed {} endpoint results, {} unreachable",
            checked,
            unreachable
        );
    }

    fn description(&self) -> &str {
        "curl with structured JSON write-out (default)"
    }
}

/// Split a whitespace- or comma-separated list
fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
