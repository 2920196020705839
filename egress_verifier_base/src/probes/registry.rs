// src/probes/registry.rs
//! Probe registry
//!
//! Central lookup of probes by identifier, with validation at registration
//! time so a half-configured probe cannot be selected later.

use crate::probes::curl_json::{CurlJsonProbe, CURL_JSON_PROBE_ID};
use crate::probes::dummy::DummyProbe;
use crate::probes::errors::RegistryError;
use crate::probes::legacy::LegacyProbe;
use crate::probes::traits::Probe;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of available probes keyed by `probe_id`
pub struct ProbeRegistry {
    probes: BTreeMap<String, Arc<dyn Probe>>,
    default_probe: Option<String>,
}

/// Listing entry for a registered probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    pub probe_id: String,
    pub description: String,
    pub starting_token: String,
    pub ending_token: String,
    pub is_default: bool,
}

impl ProbeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            probes: BTreeMap::new(),
            default_probe: None,
        }
    }

    /// Registry with every built-in probe; `curl-json` is the default
    pub fn with_builtin_probes() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register(Box::new(CurlJsonProbe::new().map_err(builtin_failed)?))?;
        registry.register(Box::new(LegacyProbe::new().map_err(builtin_failed)?))?;
        registry.register(Box::new(DummyProbe::new().map_err(builtin_failed)?))?;
        registry.set_default(CURL_JSON_PROBE_ID)?;
        Ok(registry)
    }

    /// Register a probe
    ///
    /// Rejects duplicate ids and probes whose tokens are empty or identical.
    pub fn register(&mut self, probe: Box<dyn Probe>) -> Result<(), RegistryError> {
        let probe_id = probe.probe_id().to_string();

        if probe_id.is_empty() {
            return Err(RegistryError::RegistrationFailed {
                probe_id,
                reason: "probe id is empty".to_string(),
            });
        }
        if self.probes.contains_key(&probe_id) {
            return Err(RegistryError::DuplicateProbe { probe_id });
        }

        let (start, end) = (probe.starting_token(), probe.ending_token());
        if start.is_empty() || end.is_empty() {
            return Err(RegistryError::RegistrationFailed {
                probe_id,
                reason: "starting and ending tokens must be non-empty".to_string(),
            });
        }
        if start == end || start.contains(end) || end.contains(start) {
            return Err(RegistryError::RegistrationFailed {
                probe_id,
                reason: "starting and ending tokens must not contain each other".to_string(),
            });
        }

        log::debug!("Registered probe '{}'", probe_id);
        self.probes.insert(probe_id, Arc::from(probe));
        Ok(())
    }

    pub fn set_default(&mut self, probe_id: &str) -> Result<(), RegistryError> {
        if !self.probes.contains_key(probe_id) {
            return Err(RegistryError::UnknownProbe(probe_id.to_string()));
        }
        self.default_probe = Some(probe_id.to_string());
        Ok(())
    }

    pub fn get(&self, probe_id: &str) -> Result<Arc<dyn Probe>, RegistryError> {
        self.probes
            .get(probe_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProbe(probe_id.to_string()))
    }

    /// The default probe, or the first registered one
    pub fn default_probe(&self) -> Result<Arc<dyn Probe>, RegistryError> {
        match &self.default_probe {
            Some(id) => self.get(id),
            None => self
                .probes
                .values()
                .next()
                .cloned()
                .ok_or(RegistryError::EmptyRegistry),
        }
    }

    pub fn has_probe(&self, probe_id: &str) -> bool {
        self.probes.contains_key(probe_id)
    }

    pub fn list(&self) -> Vec<ProbeInfo> {
        self.probes
            .values()
            .map(|p| ProbeInfo {
                probe_id: p.probe_id().to_string(),
                description: p.description().to_string(),
                starting_token: p.starting_token().to_string(),
                ending_token: p.ending_token().to_string(),
                is_default: self.default_probe.as_deref() == Some(p.probe_id()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_failed(err: crate::probes::errors::ProbeError) -> RegistryError {
    RegistryError::RegistrationFailed {
        probe_id: "builtin".to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputModel;
    use crate::probes::errors::ProbeError;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    struct FixedProbe {
        id: &'static str,
        start: &'static str,
        end: &'static str,
    }

    impl Probe for FixedProbe {
        fn probe_id(&self) -> &str {
            self.id
        }
        fn starting_token(&self) -> &str {
            self.start
        }
        fn ending_token(&self) -> &str {
            self.end
        }
        fn expanded_userdata(&self, _vars: &HashMap<String, String>) -> Result<String, ProbeError> {
            Ok(String::new())
        }
        fn parse_probe_output(&self, _payload: &str, _output: &mut OutputModel) {}
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ProbeRegistry::with_builtin_probes().expect("builtins register");
        assert_eq!(registry.len(), 3);
        assert!(registry.has_probe("curl-json"));
        assert!(registry.has_probe("legacy"));
        assert!(registry.has_probe("dummy"));
        assert_eq!(registry.default_probe().unwrap().probe_id(), "curl-json");

        let listing = registry.list();
        assert_eq!(listing.iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ProbeRegistry::new();
        registry
            .register(Box::new(FixedProbe { id: "x", start: "B", end: "E" }))
            .unwrap();
        let result = registry.register(Box::new(FixedProbe { id: "x", start: "B2", end: "E2" }));
        assert_matches!(result, Err(RegistryError::DuplicateProbe { .. }));
    }

    #[test]
    fn test_overlapping_tokens_rejected() {
        let mut registry = ProbeRegistry::new();
        let result = registry.register(Box::new(FixedProbe {
            id: "x",
            start: "TOKEN",
            end: "TOKEN_END",
        }));
        assert_matches!(result, Err(RegistryError::RegistrationFailed { .. }));
    }

    #[test]
    fn test_unknown_and_empty() {
        let registry = ProbeRegistry::new();
        assert!(registry.is_empty());
        assert_matches!(registry.get("nope").err(), Some(RegistryError::UnknownProbe(_)));
        assert_matches!(registry.default_probe().err(), Some(RegistryError::EmptyRegistry));
    }
}
