//! Error type for job creation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from job-directory creation.
#[derive(Error, Debug)]
pub enum JobError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config loading or subprocess failure
    #[error(transparent)]
    Core(#[from] ct_core::Error),

    /// Dataset name not in the catalog.
    #[error("unknown dataset '{name}' (known: {})", .known.join(", "))]
    UnknownDataset {
        /// Requested name.
        name: String,
        /// Catalog names.
        known: Vec<String>,
    },

    /// dasgoclient returned no files.
    #[error("no files found for dataset {0}")]
    NoFiles(String),

    /// The job directory exists and `force` was not set.
    #[error("job folder {} exists; run again with --force to recreate it", .0.display())]
    JobDirExists(PathBuf),

    /// The cmsRun configuration to copy is missing.
    #[error("configuration file {} not found", .0.display())]
    MissingCfg(PathBuf),

    /// Neither `$HOME` nor a passwd entry gives a home directory.
    #[error("cannot determine the home directory ($HOME is not set and no passwd entry)")]
    NoHome,
}

/// Result alias for job creation.
pub type Result<T> = std::result::Result<T, JobError>;
