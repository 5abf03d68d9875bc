//! Short dataset names and their DAS paths.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{JobError, Result};

/// Dataset used when none is requested.
pub const DEFAULT_DATASET: &str = "ZToMuMu_M-50To120";

const BUILTIN: &[(&str, &str)] = &[
    (
        "ZToMuMu_M-50To120",
        "/ZToMuMu_M-50To120_TuneCP5_14TeV-powheg-pythia8/Run3Summer21DRPremix-120X_mcRun3_2021_realistic_v6-v2/GEN-SIM-RECO",
    ),
    (
        "JPsiToMuMu",
        "/JPsiToMuMu_Pt-0To100-pythia8-gun/Run3Summer21DRPremix-120X_mcRun3_2021_realistic_v6-v2/GEN-SIM-RECO",
    ),
];

/// Mapping from short names to DAS dataset paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetCatalog {
    entries: BTreeMap<String, String>,
}

impl Default for DatasetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DatasetCatalog {
    /// The built-in Run 3 muon samples.
    pub fn builtin() -> Self {
        let entries = BUILTIN.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { entries }
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, name: impl Into<String>, das_path: impl Into<String>) {
        self.entries.insert(name.into(), das_path.into());
    }

    /// Merge a YAML/JSON `name: /DAS/path` mapping; returns the number of entries read.
    pub fn merge_file(&mut self, path: &Path) -> Result<usize> {
        let extra: BTreeMap<String, String> = ct_core::config::read_yaml(path)?;
        if let Some((name, bad)) = extra.iter().find(|(_, p)| !p.starts_with('/')) {
            return Err(ct_core::Error::Config(format!(
                "{}: dataset '{name}' has path '{bad}', expected /primary/processed/tier",
                path.display()
            ))
            .into());
        }
        let n = extra.len();
        self.entries.extend(extra);
        tracing::debug!(path = %path.display(), added = n, total = self.entries.len(), "merged dataset catalog");
        Ok(n)
    }

    /// DAS path of a dataset.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.entries.get(name).map(String::as_str).ok_or_else(|| JobError::UnknownDataset {
            name: name.to_string(),
            known: self.names().map(str::to_string).collect(),
        })
    }

    /// Known short names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
