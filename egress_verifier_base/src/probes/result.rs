// src/probes/result.rs
//! Per-endpoint result decoded from curl's `--write-out '%{json}'`

use serde::Deserialize;

/// curl exit code for a completed transfer
pub const CURL_OK: i64 = 0;

/// curl exit code for a malformed option (`CURLE_SETOPT_OPTION_SYNTAX`)
///
/// Raw TCP ports are probed with a telnet URL and a deliberately invalid
/// telnet option. curl only gets far enough to reject the option once the TCP
/// connection is up, so this code means "connected".
pub const TELNET_CONNECTED_EXIT_CODE: i64 = 49;

/// One attempted endpoint
///
/// `url` and `exitcode` are required; everything else mirrors curl's JSON
/// output and may be null or absent depending on the curl build.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub exitcode: i64,
    pub errormsg: Option<String>,
    pub scheme: Option<String>,

    pub url_effective: Option<String>,
    pub urlnum: Option<i64>,
    pub method: Option<String>,
    pub http_code: Option<i64>,
    pub response_code: Option<i64>,
    pub http_version: Option<String>,
    pub content_type: Option<String>,
    pub redirect_url: Option<String>,
    pub num_connects: Option<i64>,
    pub num_redirects: Option<i64>,
    pub local_ip: Option<String>,
    pub local_port: Option<i64>,
    pub remote_ip: Option<String>,
    pub remote_port: Option<i64>,
    pub ssl_verify_result: Option<i64>,
    pub proxy_ssl_verify_result: Option<i64>,
    pub size_download: Option<i64>,
    pub size_header: Option<i64>,
    pub size_request: Option<i64>,
    pub speed_download: Option<f64>,
    pub time_namelookup: Option<f64>,
    pub time_connect: Option<f64>,
    pub time_appconnect: Option<f64>,
    pub time_pretransfer: Option<f64>,
    pub time_starttransfer: Option<f64>,
    pub time_total: Option<f64>,
}

/// How a scheme is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeClass {
    Http,
    Telnet,
    Missing,
    Unrecognized,
}

impl ProbeResult {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn scheme_class(&self) -> SchemeClass {
        match self.scheme.as_deref().map(str::trim) {
            None | Some("") => SchemeClass::Missing,
            Some(scheme) => {
                let scheme = scheme.to_ascii_uppercase();
                if scheme.contains("HTTP") {
                    SchemeClass::Http
                } else if scheme.contains("TELNET") {
                    SchemeClass::Telnet
                } else {
                    SchemeClass::Unrecognized
                }
            }
        }
    }

    /// Whether the endpoint was reached
    pub fn is_successful_connection(&self) -> bool {
        match self.scheme_class() {
            SchemeClass::Http => self.exitcode == CURL_OK,
            SchemeClass::Telnet => self.exitcode == TELNET_CONNECTED_EXIT_CODE,
            SchemeClass::Missing => false,
            SchemeClass::Unrecognized => {
                log::warn!(
                    "Unrecognized scheme {:?} for {}; treating as unreachable",
                    self.scheme,
                    self.url
                );
                false
            }
        }
    }

    /// Failure entry in the form `"{url} ({errormsg})"`
    pub fn failure_message(&self) -> String {
        let message = match self.errormsg.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => format!("curl exit code {}", self.exitcode),
        };
        format!("{} ({})", self.url, message)
    }
}
