// src/extraction/scan.rs
//! Token scanning over a raw output blob
//!
//! Pure function: no I/O, no clock. The poller calls it once per fetched blob.

/// State of a probe payload within a raw output blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenScan {
    /// Neither token has appeared yet
    NotStarted,
    /// Starting token seen, ending token not yet
    InProgress,
    /// Payload strictly between the first starting token and the next ending token
    Complete(String),
    /// Terminal: the blob can never yield a payload
    Corrupted(String),
}

impl TokenScan {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenScan::Complete(_) | TokenScan::Corrupted(_))
    }
}

/// Locate the probe payload in `raw`
///
/// The payload is returned byte-for-byte, including leading and trailing
/// newlines. Content made only of whitespace is treated as empty.
pub fn scan_for_payload(raw: &str, starting_token: &str, ending_token: &str) -> TokenScan {
    let first_start = raw.find(starting_token);
    let first_end = raw.find(ending_token);

    match (first_start, first_end) {
        (None, None) => TokenScan::NotStarted,
        (None, Some(_)) => {
            TokenScan::Corrupted(format!("'{}' found without '{}'", ending_token, starting_token))
        }
        (Some(_), None) => TokenScan::InProgress,
        (Some(start), Some(end)) if end < start => TokenScan::Corrupted(format!(
            "'{}' found before '{}'",
            ending_token, starting_token
        )),
        (Some(start), Some(_)) => {
            let content_start = start + starting_token.len();
            let Some(offset) = raw[content_start..].find(ending_token) else {
                return TokenScan::InProgress;
            };
            let payload = &raw[content_start..content_start + offset];
            if payload.trim().is_empty() {
                TokenScan::Corrupted("no content between probe tokens".to_string())
            } else {
                TokenScan::Complete(payload.to_string())
            }
        }
    }
}
