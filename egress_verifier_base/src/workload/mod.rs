// src/workload/mod.rs
//! Workload substrate plumbing
//!
//! The [`WorkloadBackend`] trait is implemented per substrate in the SDK
//! crate; this module holds the trait, its error type, and the whitelisted
//! command executor backends use to reach their CLIs.

pub mod command_executor;
pub mod error;
pub mod traits;

pub use command_executor::{CommandError, CommandOutput, SystemCommandExecutor};
pub use error::WorkloadError;
pub use traits::{LaunchRequest, WorkloadBackend, WorkloadHandle, WorkloadOutput};
