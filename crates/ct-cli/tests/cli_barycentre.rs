use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use ct_root::LeafType;
use ct_root::fixture::{FixtureCompression, FixtureDir, FixtureFile, FixtureTree};

const XYZ_F: &[(&str, LeafType)] = &[("x", LeafType::F32), ("y", LeafType::F32), ("z", LeafType::F32)];
const XYZ_D: &[(&str, LeafType)] = &[("x", LeafType::F64), ("y", LeafType::F64), ("z", LeafType::F64)];

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

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// Two runs of barycentre and beam spot data, plus a labelled beam spot tree
/// in the quality folder.
fn write_fixture(dir: &Path) -> PathBuf {
    let runs = [355100.0, 355101.0];
    let barycentre = FixtureTree::new("PixelBarycentre")
        .scalar("run", LeafType::U32, &runs)
        .branch("BPIX", XYZ_F, vec![vec![0.5, -0.25, 1.5], vec![0.75, -0.125, 2.0]])
        .branch("FPIX", XYZ_F, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    let beamspot = |name: &str| {
        FixtureTree::new(name)
            .scalar("run", LeafType::I32, &runs)
            .branch("BS", XYZ_D, vec![vec![0.01, 0.04, 0.3], vec![0.02, 0.05, -0.1]])
    };
    let path = dir.join("barycentre.root");
    FixtureFile::new()
        .compression(FixtureCompression::Zlib)
        .directory(FixtureDir::new("PixelBaryCentreAnalyzer").tree(barycentre).tree(beamspot("BeamSpot")))
        .directory(FixtureDir::new("PixelBaryCentreAnalyzerWithPixelQuality").tree(beamspot("BeamSpot_prompt")))
        .write(&path)
        .unwrap();
    path
}

#[test]
fn default_twiki_table() {
    let dir = tmp_dir("twiki");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "|  run   |  BPIX.x   |  BPIX.y   |  BPIX.z   |\n\
         | 355100 |  0.500000 | -0.250000 |  1.500000 |\n\
         | 355101 |  0.750000 | -0.125000 |  2.000000 |\n"
    );
}

#[test]
fn partition_and_csv_style() {
    let dir = tmp_dir("csv");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap(), "-p", "FPIX", "-s", "CSV"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "run, FPIX.x, FPIX.y, FPIX.z\n355100, 1.000000, 2.000000, 3.000000\n355101, 4.000000, 5.000000, 6.000000\n"
    );
}

#[test]
fn labelled_beamspot_with_quality() {
    let dir = tmp_dir("beamspot");
    let file = write_fixture(&dir);
    let out = run(&[
        "barycentre",
        file.to_str().unwrap(),
        "--type",
        "BeamSpot",
        "--label",
        "prompt",
        "--quality",
        "--style",
        "latex",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], " run   &   BS.x    &   BS.y    &   BS.z    \\\\");
    assert_eq!(lines[1], "\\hline");
    assert_eq!(lines[2], "355100 &  0.010000 &  0.040000 &  0.300000 \\\\");
    assert_eq!(lines.len(), 4);
}

#[test]
fn list_entries() {
    let dir = tmp_dir("list");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap(), "--list"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(
        stdout(&out),
        "PixelBaryCentreAnalyzer\n\
         \tTTree PixelBarycentre : 3 branches, 2 entries\n\
         \tTTree BeamSpot        : 2 branches, 2 entries\n\
         PixelBaryCentreAnalyzerWithPixelQuality\n\
         \tTTree BeamSpot_prompt : 2 branches, 2 entries\n"
    );
}

#[test]
fn list_branches() {
    let dir = tmp_dir("branches");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap(), "--list-branches"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "Branches (PixelBaryCentreAnalyzer/PixelBarycentre): ['run', 'BPIX', 'FPIX']\n");
}

#[test]
fn missing_folder_fails() {
    let dir = tmp_dir("no_folder");
    let path = dir.join("empty.root");
    FixtureFile::new().directory(FixtureDir::new("Other")).write(&path).unwrap();
    let out = run(&["barycentre", path.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Folder \"PixelBaryCentreAnalyzer\" not found"), "stderr: {}", stderr(&out));
}

#[test]
fn missing_tree_prints_listing_and_fails() {
    let dir = tmp_dir("no_tree");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap(), "--label", "nope"]);
    assert!(!out.status.success());
    assert!(stdout(&out).starts_with("PixelBaryCentreAnalyzer\n"));
    let err = stderr(&out);
    assert!(err.contains("Tree \"PixelBarycentre_nope\" not found"), "stderr: {err}");
}

#[test]
fn unknown_style_is_rejected() {
    let dir = tmp_dir("bad_style");
    let file = write_fixture(&dir);
    let out = run(&["barycentre", file.to_str().unwrap(), "-s", "markdown"]);
    assert!(!out.status.success());
    assert!(stdout(&out).is_empty());
}
