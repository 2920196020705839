// src/endpoints/mod.rs
//! Endpoint lists
//!
//! YAML documents of the form:
//!
//! ```yaml
//! endpoints:
//!   - host: quay.io
//!     ports: [443]
//!   - host: mirror.openshift.com
//!     ports: [80]
//!     tlsDisabled: true
//! ```
//!
//! `$VAR` / `${VAR}` placeholders are resolved before parsing. Each
//! host/port pair becomes one URL: 443 is probed over https, 80 over http,
//! anything else as a raw TCP connect (`telnet://`).

pub mod error;

pub use error::EndpointError;

use crate::template::substitute;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const DEFAULT_ENDPOINTS: &str = include_str!("assets/default.yaml");
const DEFAULT_ORIGIN: &str = "<embedded default>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub host: String,
    pub ports: Vec<u16>,
    #[serde(default, rename = "tlsDisabled")]
    pub tls_disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointList {
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

/// URLs split by TLS policy, ready for command generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointUrls {
    pub tls: Vec<String>,
    pub tls_disabled: Vec<String>,
}

impl EndpointUrls {
    pub fn len(&self) -> usize {
        self.tls.len() + self.tls_disabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EndpointList {
    /// The built-in list
    pub fn embedded_default(vars: &HashMap<String, String>) -> Result<Self, EndpointError> {
        Self::from_yaml_str(DEFAULT_ENDPOINTS, DEFAULT_ORIGIN, vars)
    }

    /// Load from a file, a directory of `*.yaml`/`*.yml` files, or the
    /// embedded default when `path` is `None`
    pub fn load(path: Option<&Path>, vars: &HashMap<String, String>) -> Result<Self, EndpointError> {
        match path {
            None => Self::embedded_default(vars),
            Some(p) if p.is_dir() => Self::from_dir(p, vars),
            Some(p) => Self::from_file(p, vars),
        }
    }

    pub fn from_file(path: &Path, vars: &HashMap<String, String>) -> Result<Self, EndpointError> {
        let raw = std::fs::read_to_string(path).map_err(|source| EndpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw, &path.display().to_string(), vars)
    }

    /// Concatenate every YAML file under `dir`, in path order
    pub fn from_dir(dir: &Path, vars: &HashMap<String, String>) -> Result<Self, EndpointError> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).follow_links(true) {
            let entry = entry?;
            let is_yaml = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            if entry.file_type().is_file() && is_yaml {
                files.push(entry.into_path());
            }
        }
        files.sort();

        let mut merged = EndpointList::default();
        for file in &files {
            let list = Self::from_file(file, vars)?;
            log::debug!("Loaded {} endpoints from {}", list.endpoints.len(), file.display());
            merged.endpoints.extend(list.endpoints);
        }

        if merged.endpoints.is_empty() {
            return Err(EndpointError::Empty {
                origin: dir.display().to_string(),
            });
        }
        Ok(merged)
    }

    /// Parse after placeholder substitution
    ///
    /// `vars` takes precedence over the process environment; names found in
    /// neither resolve to the empty string.
    pub fn from_yaml_str(
        raw: &str,
        origin: &str,
        vars: &HashMap<String, String>,
    ) -> Result<Self, EndpointError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let resolved = substitute(raw, |name| {
            vars.get(name).or_else(|| env.get(name)).map(String::as_str)
        });

        let list: EndpointList =
            serde_yaml::from_str(&resolved).map_err(|source| EndpointError::Yaml {
                origin: origin.to_string(),
                source,
            })?;
        list.validate(origin)?;
        Ok(list)
    }

    pub fn validate(&self, origin: &str) -> Result<(), EndpointError> {
        if self.endpoints.is_empty() {
            return Err(EndpointError::Empty {
                origin: origin.to_string(),
            });
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let invalid = |reason: &str| EndpointError::InvalidEndpoint {
                origin: origin.to_string(),
                index,
                host: endpoint.host.clone(),
                reason: reason.to_string(),
            };

            if endpoint.host.trim().is_empty() {
                return Err(invalid("host is empty"));
            }
            if endpoint.host.starts_with('.') || endpoint.host.contains("..") {
                return Err(invalid("host has an empty label (unresolved variable?)"));
            }
            if endpoint
                .host
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '/' | '\\' | '`' | '$'))
            {
                return Err(invalid("host contains characters not allowed in a hostname"));
            }
            if endpoint.ports.is_empty() {
                return Err(invalid("no ports listed"));
            }
            if endpoint.ports.contains(&0) {
                return Err(invalid("port 0 is not valid"));
            }
        }
        Ok(())
    }

    /// Derive probe URLs, bucketed by the endpoint's TLS flag
    ///
    /// Duplicate URLs are dropped, keeping the first occurrence.
    pub fn to_urls(&self) -> EndpointUrls {
        let mut urls = EndpointUrls::default();
        let mut seen = HashSet::new();

        for endpoint in &self.endpoints {
            for &port in &endpoint.ports {
                let url = endpoint_url(&endpoint.host, port);
                if !seen.insert(url.clone()) {
                    log::debug!("Skipping duplicate endpoint {}", url);
                    continue;
                }
                if endpoint.tls_disabled {
                    urls.tls_disabled.push(url);
                } else {
                    urls.tls.push(url);
                }
            }
        }
        urls
    }
}

/// `https://` for 443, `http://` for 80, `telnet://` for everything else
pub fn endpoint_url(host: &str, port: u16) -> String {
    let scheme = match port {
        443 => "https",
        80 => "http",
        _ => "telnet",
    };
    format!("{}://{}:{}", scheme, host, port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_url_derivation_and_buckets() {
        let raw = "endpoints:\n  - host: a.com\n    ports: [443, 9997]\n  - host: b.com\n    ports: [80]\n    tlsDisabled: true\n";
        let list = EndpointList::from_yaml_str(raw, "test", &HashMap::new()).unwrap();
        let urls = list.to_urls();

        assert_eq!(urls.tls, vec!["https://a.com:443", "telnet://a.com:9997"]);
        assert_eq!(urls.tls_disabled, vec!["http://b.com:80"]);
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_variable_substitution() {
        let raw = "endpoints:\n  - host: ec2.${NV_TEST_REGION}.amazonaws.com\n    ports: [443]\n";
        let list =
            EndpointList::from_yaml_str(raw, "test", &vars(&[("NV_TEST_REGION", "us-east-2")]))
                .unwrap();
        assert_eq!(list.endpoints[0].host, "ec2.us-east-2.amazonaws.com");
    }

    #[test]
    fn test_unresolved_variable_is_rejected() {
        let raw = "endpoints:\n  - host: ec2.${NV_TEST_UNSET_REGION_XYZ}.amazonaws.com\n    ports: [443]\n";
        let result = EndpointList::from_yaml_str(raw, "test", &HashMap::new());
        assert_matches!(result, Err(EndpointError::InvalidEndpoint { index: 0, .. }));
    }

    #[test]
    fn test_invalid_entries() {
        let bad_port = "endpoints:\n  - host: a.com\n    ports: [0]\n";
        assert_matches!(
            EndpointList::from_yaml_str(bad_port, "t", &HashMap::new()),
            Err(EndpointError::InvalidEndpoint { .. })
        );

        let no_ports = "endpoints:\n  - host: a.com\n    ports: []\n";
        assert_matches!(
            EndpointList::from_yaml_str(no_ports, "t", &HashMap::new()),
            Err(EndpointError::InvalidEndpoint { .. })
        );

        let quoted = "endpoints:\n  - host: \"a.com'\"\n    ports: [443]\n";
        assert_matches!(
            EndpointList::from_yaml_str(quoted, "t", &HashMap::new()),
            Err(EndpointError::InvalidEndpoint { .. })
        );

        assert_matches!(
            EndpointList::from_yaml_str("endpoints: []\n", "t", &HashMap::new()),
            Err(EndpointError::Empty { .. })
        );
        assert_matches!(
            EndpointList::from_yaml_str("endpoints: [", "t", &HashMap::new()),
            Err(EndpointError::Yaml { .. })
        );
    }

    #[test]
    fn test_duplicates_dropped() {
        let raw = "endpoints:\n  - host: a.com\n    ports: [443]\n  - host: a.com\n    ports: [443, 80]\n";
        let urls = EndpointList::from_yaml_str(raw, "t", &HashMap::new())
            .unwrap()
            .to_urls();
        assert_eq!(urls.tls, vec!["https://a.com:443", "http://a.com:80"]);
    }

    #[test]
    fn test_embedded_default() {
        let list = EndpointList::embedded_default(&vars(&[("AWS_REGION", "us-east-1")])).unwrap();
        let urls = list.to_urls();
        assert!(urls.tls.contains(&"https://quay.io:443".to_string()));
        assert!(urls.tls.contains(&"https://ec2.us-east-1.amazonaws.com:443".to_string()));
        assert_eq!(urls.tls_disabled, vec!["http://mirror.openshift.com:80"]);
    }

    #[test]
    fn test_directory_loading() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("b.yaml"),
            "endpoints:\n  - host: b.com\n    ports: [443]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("a.yml"),
            "endpoints:\n  - host: a.com\n    ports: [443]\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = EndpointList::load(Some(dir.path()), &HashMap::new()).unwrap();
        let hosts: Vec<_> = list.endpoints.iter().map(|e| e.host.as_str()).collect();
        assert_eq!(hosts, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_missing_file() {
        let result = EndpointList::load(Some(Path::new("/nonexistent/endpoints.yaml")), &HashMap::new());
        assert_matches!(result, Err(EndpointError::Io { .. }));
    }
}
