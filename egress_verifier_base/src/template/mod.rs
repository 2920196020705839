// src/template/mod.rs
//! Userdata template engine
//!
//! A template is a script with `$NAME` / `${NAME}` placeholders. Its first line
//! may be a directive naming the variables a caller must supply:
//!
//! ```text
//! # network-verifier-required-variables=TIMEOUT,DELAY,URLS
//! ```
//!
//! The directive line is removed from the expanded output. Probes also pass a
//! set of reserved variables (token sentinels, generated commands) that the
//! caller may not override. Placeholders with no value expand to the empty
//! string, the same as shell expansion. `$$` produces a literal `$`.

pub mod error;

pub use error::TemplateError;

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Directive key recognized on a template's first line
pub const REQUIRED_VARIABLES_DIRECTIVE: &str = "network-verifier-required-variables";

/// Upper bound for any duration variable, in seconds
pub const MAX_DURATION_SECS: f64 = 3.0 * 60.0 * 60.0;

/// Upper bound for count variables such as retry limits
pub const MAX_COUNT: u64 = 10;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .expect("placeholder pattern is valid")
    })
}

/// Parsed template: body plus the variables its directive requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    body: String,
    required_vars: Vec<String>,
}

/// Typed validation applied to supplied values before substitution
#[derive(Debug, Clone, Default)]
pub struct ValueRules {
    /// Variables holding a duration in seconds
    pub durations: Vec<String>,

    /// Variables holding a small non-negative integer
    pub counts: Vec<String>,
}

impl ValueRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, name: impl Into<String>) -> Self {
        self.durations.push(name.into());
        self
    }

    pub fn with_count(mut self, name: impl Into<String>) -> Self {
        self.counts.push(name.into());
        self
    }
}

impl TemplateSpec {
    /// Split the optional directive from a raw template
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let (first_line, rest) = match raw.split_once('\n') {
            Some((first, rest)) => (first, rest),
            None => (raw, ""),
        };

        let directive = first_line
            .trim_end_matches('\r')
            .trim_start_matches('#')
            .trim();

        let Some(value) = directive
            .strip_prefix(REQUIRED_VARIABLES_DIRECTIVE)
            .filter(|_| first_line.trim_start().starts_with('#'))
        else {
            return Ok(Self {
                body: raw.to_string(),
                required_vars: Vec::new(),
            });
        };

        let value = value
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| TemplateError::MalformedDirective {
                reason: format!("expected '=' after '{}'", REQUIRED_VARIABLES_DIRECTIVE),
            })?;

        let mut required_vars = Vec::new();
        for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if !is_variable_name(name) {
                return Err(TemplateError::MalformedDirective {
                    reason: format!("'{}' is not a valid variable name", name),
                });
            }
            required_vars.push(name.to_string());
        }

        Ok(Self {
            body: rest.to_string(),
            required_vars,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn required_vars(&self) -> &[String] {
        &self.required_vars
    }

    /// Check the supplied variables against the template's contract
    ///
    /// Required variables must be present, reserved names must be absent and
    /// typed values must parse within bounds.
    pub fn validate(
        &self,
        reserved_names: &[&str],
        supplied: &HashMap<String, String>,
        rules: &ValueRules,
    ) -> Result<(), TemplateError> {
        for variable in &self.required_vars {
            if !supplied.contains_key(variable) {
                return Err(TemplateError::MissingRequiredVariable {
                    variable: variable.clone(),
                });
            }
        }

        let mut reserved_supplied: Vec<&&str> = reserved_names
            .iter()
            .filter(|name| supplied.contains_key(**name))
            .collect();
        reserved_supplied.sort();
        if let Some(variable) = reserved_supplied.first() {
            return Err(TemplateError::ReservedVariableSupplied {
                variable: variable.to_string(),
            });
        }

        for name in &rules.durations {
            if let Some(value) = supplied.get(name) {
                validate_duration(name, value)?;
            }
        }
        for name in &rules.counts {
            if let Some(value) = supplied.get(name) {
                validate_count(name, value)?;
            }
        }

        Ok(())
    }

    /// Validate the supplied variables and expand the template
    ///
    /// Reserved values take precedence over supplied ones during substitution.
    pub fn expand(
        &self,
        reserved: &HashMap<String, String>,
        supplied: &HashMap<String, String>,
        rules: &ValueRules,
    ) -> Result<String, TemplateError> {
        let reserved_names: Vec<&str> = reserved.keys().map(String::as_str).collect();
        self.validate(&reserved_names, supplied, rules)?;

        Ok(substitute(&self.body, |name| {
            reserved
                .get(name)
                .or_else(|| supplied.get(name))
                .map(String::as_str)
        }))
    }
}

/// Replace every placeholder using `lookup`; unknown names become empty
pub fn substitute<'a, F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            match caps.get(1).or_else(|| caps.get(2)) {
                Some(name) => lookup(name.as_str()).unwrap_or("").to_string(),
                None => "$".to_string(),
            }
        })
        .into_owned()
}

/// Parse a duration given in (possibly fractional) seconds
pub fn validate_duration(name: &str, value: &str) -> Result<f64, TemplateError> {
    let invalid = |reason: &str| TemplateError::InvalidDuration {
        variable: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid("not a number of seconds"))?;

    if !seconds.is_finite() {
        return Err(invalid("must be finite"));
    }
    if seconds <= 0.0 {
        return Err(invalid("must be greater than zero"));
    }
    if seconds > MAX_DURATION_SECS {
        return Err(invalid(&format!(
            "must not exceed {} seconds",
            MAX_DURATION_SECS
        )));
    }
    Ok(seconds)
}

pub fn validate_count(name: &str, value: &str) -> Result<u64, TemplateError> {
    let invalid = |reason: String| TemplateError::InvalidCount {
        variable: name.to_string(),
        value: value.to_string(),
        reason,
    };

    let count: u64 = value
        .trim()
        .parse()
        .map_err(|_| invalid("not a non-negative integer".to_string()))?;
    if count > MAX_COUNT {
        return Err(invalid(format!("must not exceed {}", MAX_COUNT)));
    }
    Ok(count)
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
