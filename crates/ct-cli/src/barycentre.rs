//! `cmstools barycentre`: tables from PixelBaryCentreAnalyzer output.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use ct_root::{Directory, RootError, RootFile};

use crate::table::{RunTable, TableStyle};

const FOLDER: &str = "PixelBaryCentreAnalyzer";
const FOLDER_WITH_QUALITY: &str = "PixelBaryCentreAnalyzerWithPixelQuality";

/// Which tree to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaryType {
    /// Tracker partition barycentre.
    #[default]
    Barycentre,
    /// Beam spot position.
    Beamspot,
}

impl FromStr for BaryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "barycentre" => Ok(BaryType::Barycentre),
            "beamspot" => Ok(BaryType::Beamspot),
            _ => Err(format!("unknown type '{s}' (choices: barycentre, beamspot)")),
        }
    }
}

/// Options of the `barycentre` subcommand.
#[derive(Debug, Clone)]
pub struct BaryArgs<'a> {
    pub file: &'a Path,
    pub partition: &'a str,
    pub list: bool,
    pub list_branches: bool,
    pub kind: BaryType,
    pub label: Option<&'a str>,
    pub quality: bool,
    pub style: TableStyle,
}

impl BaryArgs<'_> {
    fn folder(&self) -> &'static str {
        if self.quality { FOLDER_WITH_QUALITY } else { FOLDER }
    }

    fn tree_name(&self) -> String {
        let base = match self.kind {
            BaryType::Barycentre => "PixelBarycentre",
            BaryType::Beamspot => "BeamSpot",
        };
        match self.label {
            Some(label) => format!("{base}_{label}"),
            None => base.to_string(),
        }
    }

    fn columns(&self) -> Vec<String> {
        let prefix = match self.kind {
            BaryType::Barycentre => self.partition,
            BaryType::Beamspot => "BS",
        };
        ["x", "y", "z"].iter().map(|c| format!("{prefix}.{c}")).collect()
    }
}

pub fn cmd_barycentre(args: &BaryArgs) -> Result<()> {
    tracing::debug!(?args, "barycentre");
    let file = RootFile::open(args.file).with_context(|| format!("failed to open {}", args.file.display()))?;

    if args.list {
        print!("{}", list_entries(&file)?);
        return Ok(());
    }

    let folder = args.folder();
    let dir = open_folder(&file, folder)?;
    tracing::debug!("Opened folder \"{folder}\"");

    let tree_name = args.tree_name();
    let tree = match file.tree_in(&dir, &tree_name) {
        Ok(tree) => tree,
        Err(RootError::TreeNotFound(what)) => {
            tracing::error!("Tree \"{tree_name}\" not found; content of file \"{}\":", args.file.display());
            print!("{}", list_entries(&file)?);
            bail!("tree not found: {what}");
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read tree {folder}/{tree_name}")),
    };

    if args.list_branches {
        println!("Branches ({folder}/{tree_name}): {}", python_list(&tree.branch_names()));
        return Ok(());
    }

    tracing::info!("Reading \"{tree_name}\"");
    let runs = file.read_column_i64(&tree, "run").context("failed to read run numbers")?;
    let columns = args.columns();
    let mut values = Vec::with_capacity(columns.len());
    for c in &columns {
        let v = file.read_column_f64(&tree, c).with_context(|| format!("failed to read column {c}"))?;
        if v.len() != runs.len() {
            bail!("column {c} has {} entries, run has {}", v.len(), runs.len());
        }
        values.push(v);
    }

    print!("{}", RunTable { columns, runs, values }.render(args.style));
    Ok(())
}

fn open_folder(file: &RootFile, folder: &str) -> Result<Directory> {
    let top = file.top_directory()?;
    match top.find_key(folder) {
        Some(key) if key.is_directory() => Ok(file.subdirectory(key)?),
        _ => bail!("Folder \"{folder}\" not found in \"{}\"", file.path().display()),
    }
}

/// One line per top-level folder, then one per object inside it:
/// `\t<Class> <name>: <n> branches, <m> entries` (counts only for trees).
fn list_entries(file: &RootFile) -> Result<String> {
    let mut out = String::new();
    for key in file.top_directory()?.keys() {
        out.push_str(&key.name);
        out.push('\n');
        if !key.is_directory() {
            tracing::debug!(name = %key.name, class_name = %key.class_name, "not a folder");
            continue;
        }
        for inner in file.subdirectory(key)?.keys() {
            let line = if inner.class_name == "TTree" {
                let tree = file.read_tree(inner)?;
                format!(
                    "\t{} {:<16}: {} branches, {} entries",
                    inner.class_name,
                    inner.name,
                    tree.branches.len(),
                    tree.entries
                )
            } else {
                format!("\t{} {}", inner.class_name, inner.name)
            };
            out.push_str(&line);
            out.push('\n');
        }
    }
    Ok(out)
}

/// `['a', 'b']`
fn python_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("'{s}'")).collect();
    format!("[{}]", quoted.join(", "))
}
