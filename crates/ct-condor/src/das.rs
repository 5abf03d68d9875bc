//! File listing through `dasgoclient`.

use ct_core::CommandRunner;

use crate::error::{JobError, Result};

/// Shell command listing the files of a dataset.
pub fn query_script(das_path: &str) -> String {
    format!("dasgoclient -query \"file dataset={das_path}\"")
}

/// List the logical file names of a dataset, in DAS order.
pub fn list_files(runner: &dyn CommandRunner, das_path: &str) -> Result<Vec<String>> {
    let result = runner.check_output(&query_script(das_path));
    // dasgoclient reports its errors on stdout.
    if let Err(ct_core::Error::CommandFailed { stdout, .. }) = &result {
        tracing::error!("{}", stdout.trim_end());
    }
    let files: Vec<String> =
        result?.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
    if files.is_empty() {
        return Err(JobError::NoFiles(das_path.to_string()));
    }
    tracing::debug!(dataset = das_path, n_files = files.len(), "listed dataset files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::{CommandOutput, RecordingRunner};

    #[test]
    fn lines_are_trimmed_and_blanks_dropped() {
        let r = RecordingRunner::new();
        r.push_reply(CommandOutput::with_stdout("/store/a.root\n\n  /store/b.root \n"));
        let files = list_files(&r, "/A/B/RECO").unwrap();
        assert_eq!(files, vec!["/store/a.root", "/store/b.root"]);
        assert_eq!(r.scripts(), vec!["dasgoclient -query \"file dataset=/A/B/RECO\"".to_string()]);
    }

    #[test]
    fn empty_listing_is_an_error() {
        let r = RecordingRunner::new();
        r.push_reply(CommandOutput::with_stdout("\n"));
        assert!(matches!(list_files(&r, "/A/B/RECO"), Err(JobError::NoFiles(_))));
    }

    #[test]
    fn failure_is_command_failed() {
        let r = RecordingRunner::new();
        r.push_reply(CommandOutput::failed(1, "Error: no valid proxy\n"));
        let err = list_files(&r, "/A/B/RECO").unwrap_err();
        assert!(matches!(err, JobError::Core(ct_core::Error::CommandFailed { .. })));
    }
}
