// src/config/mod.rs
//! Verifier runtime configuration
//!
//! Layering, lowest precedence first:
//! 1. Built-in defaults
//! 2. `EGRESS_VERIFIER_*` environment variables (read by `Default`)
//! 3. An optional TOML file (absent keys keep the layers above)
//! 4. CLI flags, applied by the binary

pub mod error;

pub use error::ConfigError;

use crate::endpoints::EndpointUrls;
use crate::extraction::PollConfig;
use crate::probes::curl_json::vars;
use crate::template::{MAX_COUNT, MAX_DURATION_SECS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PROBE: &str = "curl-json";
pub const DEFAULT_VALIDATOR_IMAGE: &str = "quay.io/app-sre/osd-network-verifier:latest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Probe id from the registry
    pub probe: String,

    /// Per-attempt curl timeout, seconds
    pub timeout_secs: f64,

    /// Pause before probing so the workload network settles, seconds
    pub delay_secs: f64,

    pub max_retries: u32,

    /// CA directories for TLS verification
    pub ca_paths: Vec<String>,

    pub proxy_cacert: Option<String>,

    /// Disable certificate verification for every endpoint
    pub no_tls: bool,

    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,

    /// Container image run by the legacy probe
    pub validator_image: String,

    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,

    pub region: Option<String>,

    /// Endpoint file or directory; embedded list when unset
    pub endpoints_path: Option<PathBuf>,

    /// Upper bound on concurrently verified targets
    pub parallelism: usize,

    /// Labels attached to launched workloads
    pub tags: BTreeMap<String, String>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            probe: env::var("EGRESS_VERIFIER_PROBE").unwrap_or_else(|_| DEFAULT_PROBE.to_string()),
            timeout_secs: env::var("EGRESS_VERIFIER_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2.0),
            delay_secs: env::var("EGRESS_VERIFIER_DELAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5.0),
            max_retries: env::var("EGRESS_VERIFIER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            ca_paths: env::var("EGRESS_VERIFIER_CA_PATHS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or_else(|| vec!["/etc/pki/tls/certs/".to_string()]),
            proxy_cacert: env::var("EGRESS_VERIFIER_PROXY_CACERT").ok(),
            no_tls: env::var("EGRESS_VERIFIER_NO_TLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            http_proxy: env::var("EGRESS_VERIFIER_HTTP_PROXY").ok(),
            https_proxy: env::var("EGRESS_VERIFIER_HTTPS_PROXY").ok(),
            no_proxy: env::var("EGRESS_VERIFIER_NO_PROXY").ok(),
            validator_image: env::var("EGRESS_VERIFIER_VALIDATOR_IMAGE")
                .unwrap_or_else(|_| DEFAULT_VALIDATOR_IMAGE.to_string()),
            poll_interval_secs: env::var("EGRESS_VERIFIER_POLL_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            max_wait_secs: env::var("EGRESS_VERIFIER_MAX_WAIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(240),
            region: env::var("EGRESS_VERIFIER_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            endpoints_path: env::var("EGRESS_VERIFIER_ENDPOINTS").ok().map(PathBuf::from),
            parallelism: env::var("EGRESS_VERIFIER_PARALLELISM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(4)
                }),
            tags: BTreeMap::new(),
        }
    }
}

impl VerifierConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check ranges before anything is launched
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, secs) in [("timeout_secs", self.timeout_secs), ("delay_secs", self.delay_secs)] {
            if !secs.is_finite() || secs <= 0.0 || secs > MAX_DURATION_SECS {
                return Err(ConfigError::invalid(
                    field,
                    format!("{} is outside (0, {}] seconds", secs, MAX_DURATION_SECS),
                ));
            }
        }
        if u64::from(self.max_retries) > MAX_COUNT {
            return Err(ConfigError::invalid(
                "max_retries",
                format!("{} exceeds {}", self.max_retries, MAX_COUNT),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("poll_interval_secs", "must be positive"));
        }
        if self.max_wait_secs < self.poll_interval_secs {
            return Err(ConfigError::invalid(
                "max_wait_secs",
                "must be at least one poll interval",
            ));
        }
        if self.parallelism == 0 {
            return Err(ConfigError::invalid("parallelism", "must be positive"));
        }
        if self.probe.trim().is_empty() {
            return Err(ConfigError::invalid("probe", "must not be empty"));
        }
        Ok(())
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    /// Variables for endpoint-list placeholder resolution
    pub fn endpoint_vars(&self) -> HashMap<String, String> {
        let mut out = HashMap::new();
        if let Some(region) = &self.region {
            out.insert("AWS_REGION".to_string(), region.clone());
        }
        out
    }

    /// Template variables handed to a probe's `expanded_userdata`
    ///
    /// Unset optional values are omitted and expand to empty strings.
    pub fn to_probe_vars(&self, urls: &EndpointUrls) -> HashMap<String, String> {
        let mut out = HashMap::new();
        let mut set = |k: &str, v: String| {
            out.insert(k.to_string(), v);
        };

        set(vars::TIMEOUT, format_secs(self.timeout_secs));
        set(vars::DELAY, format_secs(self.delay_secs));
        set(vars::URLS, urls.tls.join(" "));
        set(vars::TLS_DISABLED_URLS, urls.tls_disabled.join(" "));
        set(vars::NOTLS, self.no_tls.to_string());
        set(vars::MAX_RETRIES, self.max_retries.to_string());
        set(vars::CA_PATHS, self.ca_paths.join(","));
        set("VALIDATOR_IMAGE", self.validator_image.clone());

        for (name, value) in [
            (vars::PROXY_CACERT_PATH, &self.proxy_cacert),
            (vars::HTTP_PROXY, &self.http_proxy),
            (vars::HTTPS_PROXY, &self.https_proxy),
            (vars::NO_PROXY, &self.no_proxy),
        ] {
            if let Some(v) = value {
                set(name, v.clone());
            }
        }
        out
    }
}

fn format_secs(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{}", secs)
    }
}
