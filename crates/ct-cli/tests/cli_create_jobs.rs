#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cmstools"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("cmstools_cli_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

/// Directory with a fake `dasgoclient` that prints `body`.
fn fake_das(dir: &Path, body: &str) -> PathBuf {
    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let exe = bin.join("dasgoclient");
    std::fs::write(&exe, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
    bin
}

fn run_in(dir: &Path, das_bin: &Path, args: &[&str]) -> Output {
    let path = format!("{}:{}", das_bin.display(), std::env::var("PATH").unwrap_or_default());
    Command::new(bin_path())
        .args(args)
        .current_dir(dir)
        .env("PATH", path)
        .env("HOME", dir)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

#[test]
fn creates_jobs_from_das_listing() {
    let dir = tmp_dir("create_jobs");
    std::fs::write(dir.join("seedRebuild_cfg.py"), "process = None\n").unwrap();
    let das = fake_das(&dir, "printf '/store/a.root\\n/store/b.root\\n/store/c.root\\n'");

    let out = run_in(&dir, &das, &["create-jobs", "-d", "JPsiToMuMu", "-n", "2", "-e", "-1", "-j", "workday"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let job_dir = std::fs::canonicalize(dir.join("production/JPsiToMuMu")).unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout, format!("INFO: created 2 jobs in {}\n", job_dir.display()));

    let sub = std::fs::read_to_string(job_dir.join("condor.sub")).unwrap();
    assert!(sub.contains("+JobFlavour             = \"workday\""));
    assert!(sub.contains(&format!("x509userproxy           = {}/x509up_u", dir.display())));

    assert!(job_dir.join("Chunk_1/log").is_dir());
    assert!(!job_dir.join("Chunk_2").exists());
    let cfg = std::fs::read_to_string(job_dir.join("Chunk_0/run_cfg.py")).unwrap();
    assert!(cfg.contains("cms.untracked.vstring('/store/a.root')"));
    assert!(cfg.contains("cms.untracked.int32(-1)"));
}

#[test]
fn das_errors_are_reported() {
    let dir = tmp_dir("create_jobs_fail");
    std::fs::write(dir.join("seedRebuild_cfg.py"), "process = None\n").unwrap();
    let das = fake_das(&dir, "echo 'Error: unable to find proxy'; exit 1");

    let out = run_in(&dir, &das, &["create-jobs"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unable to find proxy"), "stderr: {stderr}");
    assert!(!dir.join("production").exists());
}

#[test]
fn existing_folder_needs_force() {
    let dir = tmp_dir("create_jobs_force");
    std::fs::write(dir.join("seedRebuild_cfg.py"), "process = None\n").unwrap();
    let das = fake_das(&dir, "echo /store/a.root");

    assert!(run_in(&dir, &das, &["create-jobs"]).status.success());
    let again = run_in(&dir, &das, &["create-jobs"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));
    assert!(run_in(&dir, &das, &["create-jobs", "--force"]).status.success());
}
