//! Substrate-specific decoding of raw output blobs

use base64::Engine;
use serde::{Deserialize, Serialize};

/// How a backend encodes the output blob it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// Returned as-is (container logs, replay files)
    Plain,
    /// Standard base64 (EC2 console output)
    Base64,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid base64 output: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl OutputEncoding {
    /// Decode a raw blob into text
    ///
    /// Invalid UTF-8 is replaced rather than rejected; console streams
    /// routinely carry stray control bytes.
    pub fn decode(&self, raw: &str) -> Result<String, DecodeError> {
        match self {
            OutputEncoding::Plain => Ok(raw.to_string()),
            OutputEncoding::Base64 => {
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                if compact.is_empty() {
                    return Ok(String::new());
                }
                let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}
