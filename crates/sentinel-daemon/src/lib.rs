//! Sentinel daemon library
//!
//! Configuration loading and the subcommands behind the `sentineld` binary.

pub mod commands;
pub mod config;
pub mod error;

pub use config::{DaemonConfig, LoggingConfig};
pub use error::{DaemonError, DaemonResult};
