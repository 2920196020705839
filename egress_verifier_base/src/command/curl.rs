// src/command/curl.rs
//! Composite curl command generation
//!
//! One curl process probes every endpoint. TLS-verified URLs go in the first
//! invocation; TLS-disabled URLs go in a second invocation chained with
//! `--next`. Options that curl resets at `--next` are repeated there.
//!
//! Every transfer writes one machine-readable line to stderr, prefixed with a
//! private marker so it can be picked out of a shared console stream.

use std::time::Duration;

/// Marker prepended to each structured result line
pub const DEFAULT_LINE_PREFIX: &str = "@NV@";

/// Telnet option that curl rejects only after the TCP handshake succeeded
const TELNET_PROBE_OPTION: &str = "B=";

/// Options shared by every generated invocation
#[derive(Debug, Clone)]
pub struct CurlOptions {
    /// `--retry` count per transfer
    pub max_retries: u32,

    /// `-m` per-transfer time limit
    pub timeout: Duration,

    /// `--capath` directories used to verify server certificates
    pub ca_paths: Vec<String>,

    /// `--proxy-cacert` bundle for a TLS-intercepting proxy
    pub proxy_cacert: Option<String>,

    /// Disable certificate verification for every URL
    pub no_tls: bool,

    /// Structured output line marker
    pub line_prefix: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(2),
            ca_paths: vec!["/etc/pki/tls/certs/".to_string()],
            proxy_cacert: None,
            no_tls: false,
            line_prefix: DEFAULT_LINE_PREFIX.to_string(),
        }
    }
}

/// Generated command: a primary invocation and an optional `--next` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurlCommand {
    pub primary: String,
    pub continuation: Option<String>,
}

impl CurlCommand {
    /// Build the command for the given URL buckets
    pub fn generate(tls_urls: &[String], tls_disabled_urls: &[String], options: &CurlOptions) -> Self {
        if options.no_tls {
            let all: Vec<String> = tls_urls
                .iter()
                .chain(tls_disabled_urls.iter())
                .cloned()
                .collect();
            return Self {
                primary: format!("curl {}", insecure_clause(&all, options)),
                continuation: None,
            };
        }

        if tls_urls.is_empty() && !tls_disabled_urls.is_empty() {
            return Self {
                primary: format!("curl {}", insecure_clause(tls_disabled_urls, options)),
                continuation: None,
            };
        }

        let primary = format!("curl {}", secure_clause(tls_urls, options));
        let continuation = if tls_disabled_urls.is_empty() {
            None
        } else {
            Some(insecure_clause(tls_disabled_urls, options))
        };

        Self {
            primary,
            continuation,
        }
    }

    /// Whether a `--next` clause is present
    pub fn is_chained(&self) -> bool {
        self.continuation.is_some()
    }

    /// Single shell command string
    pub fn render(&self) -> String {
        match &self.continuation {
            Some(next) => format!("{} --next {}", self.primary, next),
            None => self.primary.clone(),
        }
    }
}

fn secure_clause(urls: &[String], options: &CurlOptions) -> String {
    let mut args = Vec::new();
    for ca_path in &options.ca_paths {
        args.push(format!("--capath {}", shell_quote(ca_path)));
    }
    args.extend(common_args(options));
    args.extend(urls.iter().map(|u| shell_quote(u)));
    args.join(" ")
}

fn insecure_clause(urls: &[String], options: &CurlOptions) -> String {
    let mut args = vec!["--insecure".to_string()];
    args.extend(common_args(options));
    args.extend(urls.iter().map(|u| shell_quote(u)));
    args.join(" ")
}

/// Flags that do not survive `--next` and so appear in every invocation
fn common_args(options: &CurlOptions) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(proxy_cacert) = &options.proxy_cacert {
        args.push(format!("--proxy-cacert {}", shell_quote(proxy_cacert)));
    }
    args.push(format!("--retry {}", options.max_retries));
    args.push("--retry-connrefused".to_string());
    args.push(format!("-t {}", TELNET_PROBE_OPTION));
    args.push("-s".to_string());
    args.push("-I".to_string());
    args.push(format!("-m {}", format_seconds(options.timeout)));
    args.push(format!(
        "-w {}",
        shell_quote(&format!("%{{stderr}}{}%{{json}}\\n", options.line_prefix))
    ));
    args
}

fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.3}", duration.as_secs_f64())
    }
}

/// POSIX single-quote a word
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
