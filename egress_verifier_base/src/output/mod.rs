//! # Output Module
//!
//! Verdict types for egress verification.
//!
//! ## Core Types
//! - [`OutputModel`] - failures / exceptions / errors of one run
//! - [`OutputError`] - the error tier
//! - [`VerificationReport`] - serializable snapshot for reporting

pub mod error;
pub mod model;
pub mod report;

pub use error::OutputError;
pub use model::OutputModel;
pub use report::{HostContext, TimestampInfo, VerificationReport};
