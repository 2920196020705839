//! Command execution configurations for workload substrates
//!
//! Provides whitelisted command executors for each backend.

pub mod substrate;

pub use substrate::{create_aws_command_executor, create_container_command_executor};
