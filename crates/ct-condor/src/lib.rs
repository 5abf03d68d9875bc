//! # ct-condor
//!
//! Builds HTCondor job directories for running a cmsRun configuration over
//! every file of a DAS dataset: one `Chunk_<i>` per input file, a shared
//! `condor.sub`, and a per-chunk `batchScript.sh` + `run_cfg.py`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod das;
pub mod error;
pub mod flavour;
pub mod jobs;
pub mod templates;

pub use catalog::{DEFAULT_DATASET, DatasetCatalog};
pub use error::{JobError, Result};
pub use flavour::JobFlavour;
pub use jobs::{JobRequest, JobSummary, create_jobs};
