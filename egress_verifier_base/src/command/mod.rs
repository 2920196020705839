//! # Command Generation
//!
//! Builds the diagnostic command a probe embeds in its workload script.

pub mod curl;

pub use curl::{CurlCommand, CurlOptions, DEFAULT_LINE_PREFIX};
