//! File templates written into job directories.

use std::path::Path;

use crate::flavour::JobFlavour;

const CONDOR_SUB: &str = include_str!("../templates/condor.sub");

/// Per-chunk job script: runs cmsRun on `run_cfg.py` in the scratch area.
pub const BATCH_SCRIPT: &str = include_str!("../templates/batchScript.sh");

/// Render `condor.sub` for jobs under `main_dir` (absolute).
pub fn condor_sub(main_dir: &Path, flavour: JobFlavour, home: &Path, uid: u32) -> String {
    CONDOR_SUB
        .replace("{main_dir}", &main_dir.display().to_string())
        .replace("{job_flavour}", flavour.as_str())
        .replace("{home}", &home.display().to_string())
        .replace("{uid}", &uid.to_string())
}

/// Text appended to each chunk's `run_cfg.py`.
pub fn cfg_suffix(file_name: &str, events: i64) -> String {
    format!(
        "\n# createJobs.py: replacing fileNames and maxEvents\n\
         process.source.fileNames = cms.untracked.vstring('{file_name}')\n\
         process.maxEvents.input = cms.untracked.int32({events})\n\n"
    )
}
