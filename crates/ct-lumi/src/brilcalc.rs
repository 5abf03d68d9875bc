//! Per-year `brilcalc lumi` runs.
//!
//! brilcalc needs its environment script sourced in the same shell, so each
//! run is a two-line shell script: the `. env` line and the command words.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

use ct_core::CommandRunner;
use serde::Deserialize;

use crate::LumiType;
use crate::error::Result;

/// Environment script of the brilws docker installation on CVMFS.
pub const BRILWS_ENV: &str = "/cvmfs/cms-bril.cern.ch/cms-lumi-pog/brilws-docker/brilws-env";
/// Default normtag for delivered luminosity.
pub const NORMTAG_BRIL: &str = "/cvmfs/cms-bril.cern.ch/cms-lumi-pog/Normtags/normtag_BRIL.json";
/// Default normtag for recorded luminosity.
pub const NORMTAG_PHYSICS: &str = "/cvmfs/cms-bril.cern.ch/cms-lumi-pog/Normtags/normtag_PHYSICS.json";
/// Years processed when none are given.
pub const DEFAULT_YEARS: [u32; 3] = [2022, 2023, 2024];

/// Normtags for one luminosity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormtagSet {
    /// Normtag used for years without an override.
    #[serde(default)]
    pub default: Option<String>,
    /// Per-year overrides.
    #[serde(default)]
    pub years: BTreeMap<u32, String>,
}

/// Normtag selection for both luminosity types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NormtagTable {
    /// Delivered luminosity normtags.
    pub delivered: NormtagSet,
    /// Recorded luminosity normtags.
    pub recorded: NormtagSet,
}

impl NormtagTable {
    /// Normtag for `year`: the per-year override, else the configured
    /// default, else the built-in one for `lumi_type`.
    pub fn select(&self, lumi_type: LumiType, year: u32) -> &str {
        let (set, builtin) = match lumi_type {
            LumiType::Delivered => (&self.delivered, NORMTAG_BRIL),
            LumiType::Recorded => (&self.recorded, NORMTAG_PHYSICS),
        };
        set.years.get(&year).or(set.default.as_ref()).map_or(builtin, String::as_str)
    }
}

/// `lumi-info` configuration (YAML or JSON).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BrilcalcConfig {
    /// Script sourced before running brilcalc.
    pub env_script: String,
    /// brilcalc executable.
    pub brilcalc: String,
    /// Normtag table.
    pub normtags: NormtagTable,
}

impl Default for BrilcalcConfig {
    fn default() -> Self {
        Self {
            env_script: BRILWS_ENV.to_string(),
            brilcalc: "brilcalc".to_string(),
            normtags: NormtagTable::default(),
        }
    }
}

impl BrilcalcConfig {
    /// Load a config file; missing fields keep their built-in values.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ct_core::config::read_yaml(path)?)
    }
}

/// Output CSV for a year: `lumiperrun<YY>.csv`.
pub fn csv_name(year: u32) -> String {
    format!("lumiperrun{:02}.csv", year % 100)
}

/// Wrap a word in double quotes if it has a space and no quotes of its own.
pub fn quote_word(word: &str) -> Cow<'_, str> {
    if word.contains(' ') && !word.contains(['"', '\'']) {
        Cow::Owned(format!("\"{word}\""))
    } else {
        Cow::Borrowed(word)
    }
}

/// A configured brilcalc invocation, run once per year.
#[derive(Debug, Clone)]
pub struct Brilcalc<'a> {
    config: &'a BrilcalcConfig,
    lumi_type: LumiType,
    extra_args: Vec<String>,
}

impl<'a> Brilcalc<'a> {
    /// New invocation; `extra_args` are appended verbatim to every command.
    pub fn new(config: &'a BrilcalcConfig, lumi_type: LumiType, extra_args: Vec<String>) -> Self {
        Self { config, lumi_type, extra_args }
    }

    /// Command words for `year`, writing to `out_csv`.
    pub fn words(&self, year: u32, out_csv: &str) -> Vec<String> {
        let yy = year % 100;
        let normtag = self.config.normtags.select(self.lumi_type, year);
        let mut words: Vec<String> = [
            self.config.brilcalc.as_str(),
            "lumi",
            "-u",
            "/pb",
            "-b",
            "STABLE BEAMS",
            "-o",
            out_csv,
            "--amodetag",
            "PROTPHYS",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        words.push("--begin".into());
        words.push(format!("01/01/{yy:02} 00:00:00"));
        words.push("--end".into());
        words.push(format!("12/31/{yy:02} 23:59:59"));
        words.push("--normtag".into());
        words.push(normtag.to_string());
        words.extend(self.extra_args.iter().cloned());
        words
    }

    /// Full shell script for `year`: env line, newline, then each word
    /// followed by one space.
    pub fn script(&self, year: u32, out_csv: &str) -> String {
        let mut script = format!(". {}\n", self.config.env_script);
        for word in self.words(year, out_csv) {
            script.push_str(&quote_word(&word));
            script.push(' ');
        }
        script
    }

    /// Run brilcalc for one year; returns the CSV it wrote.
    pub fn run_year(&self, runner: &dyn CommandRunner, year: u32) -> Result<String> {
        let out_csv = csv_name(year);
        let script = self.script(year, &out_csv);
        tracing::debug!(year, %script, "brilcalc command");
        runner.check_run(&script)?;
        if runner.is_dry_run() {
            tracing::info!("dry run, {out_csv} not written");
        } else {
            tracing::info!("wrote {out_csv}");
        }
        Ok(out_csv)
    }

    /// Run every year in order, stopping at the first failure.
    pub fn run_years(&self, runner: &dyn CommandRunner, years: &[u32]) -> Result<Vec<String>> {
        years.iter().map(|&y| self.run_year(runner, y)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::{CommandOutput, RecordingRunner};

    #[test]
    fn csv_names_use_two_digit_years() {
        assert_eq!(csv_name(2022), "lumiperrun22.csv");
        assert_eq!(csv_name(2005), "lumiperrun05.csv");
    }

    #[test]
    fn quoting_rule() {
        assert_eq!(quote_word("STABLE BEAMS"), "\"STABLE BEAMS\"");
        assert_eq!(quote_word("'already quoted'"), "'already quoted'");
        assert_eq!(quote_word("a \"b\""), "a \"b\"");
        assert_eq!(quote_word("/pb"), "/pb");
    }

    #[test]
    fn dry_run_returns_csv_names() {
        let cfg = BrilcalcConfig::default();
        let b = Brilcalc::new(&cfg, LumiType::Recorded, Vec::new());
        assert_eq!(b.run_year(&ct_core::DryRunRunner, 2024).unwrap(), "lumiperrun24.csv");
    }

    #[test]
    fn script_layout() {
        let cfg = BrilcalcConfig::default();
        let b = Brilcalc::new(&cfg, LumiType::Delivered, vec!["-c".into(), "web".into()]);
        let expected = format!(
            ". {BRILWS_ENV}\nbrilcalc lumi -u /pb -b \"STABLE BEAMS\" -o lumiperrun23.csv \
             --amodetag PROTPHYS --begin \"01/01/23 00:00:00\" --end \"12/31/23 23:59:59\" \
             --normtag {NORMTAG_BRIL} -c web "
        );
        assert_eq!(b.script(2023, "lumiperrun23.csv"), expected);
    }

    #[test]
    fn normtag_follows_lumi_type_and_overrides() {
        let mut table = NormtagTable::default();
        assert_eq!(table.select(LumiType::Recorded, 2022), NORMTAG_PHYSICS);
        table.delivered.default = Some("/d.json".into());
        table.delivered.years.insert(2023, "/d23.json".into());
        assert_eq!(table.select(LumiType::Delivered, 2022), "/d.json");
        assert_eq!(table.select(LumiType::Delivered, 2023), "/d23.json");
        assert_eq!(table.select(LumiType::Recorded, 2023), NORMTAG_PHYSICS);
    }

    #[test]
    fn partial_config_keeps_builtins() {
        let cfg: BrilcalcConfig =
            serde_yaml_ng::from_str("normtags:\n  recorded:\n    years:\n      2024: /r24.json\n").unwrap();
        assert_eq!(cfg.env_script, BRILWS_ENV);
        assert_eq!(cfg.brilcalc, "brilcalc");
        assert_eq!(cfg.normtags.select(LumiType::Recorded, 2024), "/r24.json");
        assert_eq!(cfg.normtags.select(LumiType::Recorded, 2022), NORMTAG_PHYSICS);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let r: std::result::Result<BrilcalcConfig, _> = serde_yaml_ng::from_str("normtag: x\n");
        assert!(r.is_err());
    }

    #[test]
    fn runs_each_year_through_the_runner() {
        let cfg = BrilcalcConfig::default();
        let b = Brilcalc::new(&cfg, LumiType::Recorded, vec![]);
        let runner = RecordingRunner::new();
        let written = b.run_years(&runner, &DEFAULT_YEARS).unwrap();
        assert_eq!(written, vec!["lumiperrun22.csv", "lumiperrun23.csv", "lumiperrun24.csv"]);
        let scripts = runner.scripts();
        assert_eq!(scripts.len(), 3);
        assert!(scripts[2].contains("--normtag /cvmfs/cms-bril.cern.ch/cms-lumi-pog/Normtags/normtag_PHYSICS.json"));
    }

    #[test]
    fn failure_stops_the_loop() {
        let cfg = BrilcalcConfig::default();
        let b = Brilcalc::new(&cfg, LumiType::Delivered, vec![]);
        let runner = RecordingRunner::new();
        runner.push_reply(CommandOutput::ok());
        runner.push_reply(CommandOutput::failed(1, ""));
        let err = b.run_years(&runner, &[2022, 2023, 2024]).unwrap_err();
        assert!(matches!(err, crate::LumiError::Core(ct_core::Error::CommandFailed { .. })));
        assert_eq!(runner.scripts().len(), 2);
    }
}
