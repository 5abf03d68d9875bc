//! Error types shared by the cmstools crates.

use thiserror::Error;

/// cmstools core error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML/JSON config parsing error
    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Semantically invalid configuration
    #[error("invalid config: {0}")]
    Config(String),

    /// An external command exited unsuccessfully
    #[error("command `{command}` failed ({status})")]
    CommandFailed {
        /// The script handed to the shell.
        command: String,
        /// Human-readable exit status.
        status: String,
        /// Captured stdout, if the command was run with capture.
        stdout: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
