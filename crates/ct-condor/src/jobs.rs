//! Job-directory creation.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ct_core::CommandRunner;

use crate::catalog::{DEFAULT_DATASET, DatasetCatalog};
use crate::das;
use crate::error::{JobError, Result};
use crate::flavour::JobFlavour;
use crate::templates;

/// What to create.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Short dataset name (catalog key); also the job folder name.
    pub dataset: String,
    /// HTCondor job flavour.
    pub flavour: JobFlavour,
    /// Clear an existing job folder instead of failing.
    pub force: bool,
    /// Use only the first `max_files` files; 0 means all.
    pub max_files: usize,
    /// Base directory for job folders.
    pub output_dir: PathBuf,
    /// `maxEvents` per file; -1 means all.
    pub events: i64,
    /// cmsRun configuration copied into each chunk.
    pub cfg: PathBuf,
    /// Home directory holding the grid proxy.
    pub home: PathBuf,
    /// Numeric user id (proxy file name).
    pub uid: u32,
}

impl JobRequest {
    /// Request with the default options for the current user.
    ///
    /// The home directory is `$HOME`, or the user's `/etc/passwd` entry when
    /// `$HOME` is unset.
    pub fn for_current_user() -> Result<Self> {
        let uid = real_uid();
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(|| uid.and_then(home_from_passwd))
            .ok_or(JobError::NoHome)?;
        let uid = match uid {
            Some(u) => u,
            None => home_owner(&home)?,
        };
        Ok(Self {
            dataset: DEFAULT_DATASET.to_string(),
            flavour: JobFlavour::default(),
            force: false,
            max_files: 0,
            output_dir: PathBuf::from("production"),
            events: -1,
            cfg: PathBuf::from("seedRebuild_cfg.py"),
            home,
            uid,
        })
    }
}

/// What was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    /// Number of chunks (one per input file).
    pub jobs: usize,
    /// Files the dataset has in total.
    pub files_total: usize,
    /// Absolute job directory.
    pub job_dir: PathBuf,
    /// Absolute `Chunk_<i>` directories, in file order.
    pub chunks: Vec<PathBuf>,
}

/// Create `<output_dir>/<dataset>` with `condor.sub` and one chunk per file.
pub fn create_jobs(
    req: &JobRequest,
    catalog: &DatasetCatalog,
    runner: &dyn CommandRunner,
) -> Result<JobSummary> {
    let das_path = catalog.get(&req.dataset)?;
    if !req.cfg.is_file() {
        return Err(JobError::MissingCfg(req.cfg.clone()));
    }

    let mut files = das::list_files(runner, das_path)?;
    let files_total = files.len();
    if req.max_files > 0 {
        files.truncate(req.max_files);
    }
    tracing::info!("using {} files (out of {files_total})", files.len());

    fs::create_dir_all(&req.output_dir)?;
    let job_dir = req.output_dir.join(&req.dataset);
    match fs::create_dir(&job_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if !req.force {
                return Err(JobError::JobDirExists(job_dir));
            }
            tracing::info!("removing existing jobs in {}", job_dir.display());
            clear_dir(&job_dir)?;
        }
        Err(e) => return Err(e.into()),
    }

    let job_dir = fs::canonicalize(&job_dir)?;
    fs::write(
        job_dir.join("condor.sub"),
        templates::condor_sub(&job_dir, req.flavour, &req.home, req.uid),
    )?;

    let mut chunks = Vec::with_capacity(files.len());
    for (i, file) in files.iter().enumerate() {
        let chunk = job_dir.join(format!("Chunk_{i}"));
        fs::create_dir(&chunk)?;

        let script = chunk.join("batchScript.sh");
        fs::write(&script, templates::BATCH_SCRIPT)?;
        make_executable(&script)?;

        let cfg = chunk.join("run_cfg.py");
        fs::copy(&req.cfg, &cfg)?;
        OpenOptions::new().append(true).open(&cfg)?.write_all(templates::cfg_suffix(file, req.events).as_bytes())?;

        fs::create_dir_all(chunk.join("log"))?;
        tracing::debug!(chunk = %chunk.display(), file, "created chunk");
        chunks.push(chunk);
    }

    Ok(JobSummary { jobs: chunks.len(), files_total, job_dir, chunks })
}

/// Remove everything inside `dir`, keeping `dir` itself.
fn clear_dir(dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o100);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Real user id of this process, from `/proc/self/status`.
fn real_uid() -> Option<u32> {
    parse_real_uid(&fs::read_to_string("/proc/self/status").ok()?)
}

/// First field of the `Uid:` line (real, effective, saved, filesystem).
fn parse_real_uid(status: &str) -> Option<u32> {
    let line = status.lines().find_map(|l| l.strip_prefix("Uid:"))?;
    line.split_whitespace().next()?.parse().ok()
}

fn home_from_passwd(uid: u32) -> Option<PathBuf> {
    fs::read_to_string("/etc/passwd").ok()?.lines().find_map(|l| passwd_home(l, uid))
}

/// Home directory of `uid` in one `/etc/passwd` line.
fn passwd_home(line: &str, uid: u32) -> Option<PathBuf> {
    let fields: Vec<&str> = line.split(':').collect();
    match fields.as_slice() {
        [_, _, id, _, _, dir, ..] if id.parse::<u32>().ok() == Some(uid) && !dir.is_empty() => {
            Some(PathBuf::from(dir))
        }
        _ => None,
    }
}

/// Where `/proc` is not mounted, the uid is taken from the home directory.
#[cfg(unix)]
fn home_owner(home: &Path) -> Result<u32> {
    use std::os::unix::fs::MetadataExt;

    Ok(fs::metadata(home)?.uid())
}

#[cfg(not(unix))]
fn home_owner(_home: &Path) -> Result<u32> {
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_uid_is_the_first_uid_field() {
        let status = "Name:\tsh\nUmask:\t0022\nUid:\t1000\t0\t0\t0\nGid:\t100\t100\t100\t100\n";
        assert_eq!(parse_real_uid(status), Some(1000));
        assert_eq!(parse_real_uid("Name:\tsh\n"), None);
    }

    #[test]
    fn passwd_lookup_matches_uid() {
        let line = "alice:x:1000:100:Alice:/afs/cern.ch/user/a/alice:/bin/bash";
        assert_eq!(passwd_home(line, 1000), Some(PathBuf::from("/afs/cern.ch/user/a/alice")));
        assert_eq!(passwd_home(line, 1001), None);
        assert_eq!(passwd_home("broken", 1000), None);
        assert_eq!(passwd_home("nobody:x:65534:65534::", 65534), None);
    }

    #[test]
    fn clear_dir_keeps_the_directory() {
        let dir = std::env::temp_dir().join(format!("ct_condor_clear_{}", std::process::id()));
        fs::create_dir_all(dir.join("Chunk_0/log")).unwrap();
        fs::write(dir.join("condor.sub"), "x").unwrap();
        clear_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn make_executable_sets_owner_bit() {
        use std::os::unix::fs::PermissionsExt;

        let p = std::env::temp_dir().join(format!("ct_condor_exec_{}.sh", std::process::id()));
        fs::write(&p, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&p, fs::Permissions::from_mode(0o644)).unwrap();
        make_executable(&p).unwrap();
        assert_eq!(fs::metadata(&p).unwrap().permissions().mode() & 0o777, 0o744);
        fs::remove_file(&p).ok();
    }
}
