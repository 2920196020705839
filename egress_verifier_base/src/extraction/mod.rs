// src/extraction/mod.rs
//! Output extraction
//!
//! Probe payloads share a console or log stream with unrelated output. The
//! pure [`scan_for_payload`] function finds the payload between a probe's
//! tokens; [`OutputPoller`] repeats the scan against a live source until it
//! reaches a terminal state.

pub mod cancel;
pub mod decode;
pub mod poller;
pub mod scan;

pub use cancel::CancellationToken;
pub use decode::{DecodeError, OutputEncoding};
pub use poller::{
    OutputPoller, OutputSource, PollConfig, PollError, DEFAULT_MAX_WAIT, DEFAULT_POLL_INTERVAL,
};
pub use scan::{scan_for_payload, TokenScan};
