//! # ct-core
//!
//! Pieces shared by every cmstools crate: the common error type, the
//! [`CommandRunner`] seam used to drive external tools (`brilcalc`,
//! `dasgoclient`), YAML config loading and log-level parsing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod log_level;
pub mod process;

pub use error::{Error, Result};
pub use log_level::parse_log_level;
pub use process::{CommandOutput, CommandRunner, DryRunRunner, RecordingRunner, ShellRunner};

/// cmstools version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
