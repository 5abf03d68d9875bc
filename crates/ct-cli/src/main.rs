//! cmstools CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use ct_condor::{DEFAULT_DATASET, DatasetCatalog, JobFlavour, JobRequest};
use ct_core::{CommandRunner, DryRunRunner, ShellRunner};
use ct_lumi::brilcalc::DEFAULT_YEARS;
use ct_lumi::{Brilcalc, BrilcalcConfig, LumiType};

mod barycentre;
mod passthrough;
mod table;

use barycentre::{BaryArgs, BaryType};
use table::TableStyle;

#[derive(Parser)]
#[command(name = "cmstools")]
#[command(about = "cmstools - tracker alignment and muon reconstruction helpers")]
#[command(version)]
struct Cli {
    /// Log level: TRACE, DEBUG, INFO, WARNING, ERROR, or a Python logging number (lower is more verbose)
    #[arg(long, global = true, default_value = "WARNING", value_parser = ct_core::parse_log_level)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pixel barycentre or beam spot positions per run
    Barycentre {
        /// Output of PixelBaryCentreAnalyzer
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Tracker partition (e.g. BPIX, FPIX, BPIXLYR1)
        #[arg(short, long, default_value = "BPIX")]
        partition: String,

        /// List the contents of the file and exit
        #[arg(short = 'l', long = "list")]
        list: bool,

        /// List the branches of the tree and exit
        #[arg(long)]
        list_branches: bool,

        /// barycentre or beamspot
        #[arg(short = 't', long = "type", default_value = "barycentre")]
        kind: BaryType,

        /// Label appended to the tree name
        #[arg(long)]
        label: Option<String>,

        /// Read results with the WithPixelQuality flag
        #[arg(long)]
        quality: bool,

        /// Table style: twiki, latex or csv
        #[arg(short, long, default_value = "twiki")]
        style: TableStyle,
    },

    /// Convert brilcalc CSV tables to the `run luminosity` text format
    LumiCsv2txt {
        /// brilcalc CSV files; each FILE.csv becomes FILE.txt
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Overwrite existing output files
        #[arg(short, long)]
        force: bool,

        /// delivered or recorded
        #[arg(short, long = "lumi", default_value = "delivered")]
        lumi: LumiType,
    },

    /// Run brilcalc for each year and write lumiperrun<YY>.csv
    ///
    /// Arguments that are not lumi-info options, and everything after `--`,
    /// are passed verbatim to brilcalc.
    LumiInfo {
        /// Years to process
        #[arg(short, long = "years", num_args = 1.., default_values_t = DEFAULT_YEARS)]
        years: Vec<u32>,

        /// delivered or recorded
        #[arg(long, default_value = "delivered")]
        lumi_type: LumiType,

        /// Print the brilcalc scripts instead of running them
        #[arg(long)]
        dry_run: bool,

        /// YAML/JSON file overriding the env script, brilcalc executable and normtags
        #[arg(long)]
        config: Option<PathBuf>,

        /// Extra brilcalc arguments
        #[arg(last = true, value_name = "BRILCALC_ARGS")]
        extra: Vec<String>,
    },

    /// Create HTCondor job folders running a cmsRun config over a DAS dataset
    CreateJobs {
        /// Dataset short name
        #[arg(short, long, default_value = DEFAULT_DATASET)]
        dataset: String,

        /// Job flavour (espresso, microcentury, longlunch, workday, tomorrow, testmatch, nextweek)
        #[arg(short = 'j', long, default_value = "longlunch")]
        flavour: JobFlavour,

        /// Delete any existing job folders
        #[arg(long)]
        force: bool,

        /// Number of files to use; 0 means all
        #[arg(short = 'n', long = "n-max", default_value = "0")]
        n_max: usize,

        /// Base directory for the jobs
        #[arg(short, long, default_value = "production")]
        output_dir: PathBuf,

        /// Maximum number of events processed per file (-1: all)
        #[arg(short, long, default_value = "-1", allow_negative_numbers = true)]
        events: i64,

        /// cmsRun configuration copied into each job
        #[arg(long, default_value = "seedRebuild_cfg.py")]
        cfg: PathBuf,

        /// YAML/JSON `name: /DAS/path` mapping added to the built-in datasets
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(passthrough::hoist(std::env::args_os()));

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Barycentre { file, partition, list, list_branches, kind, label, quality, style } => {
            barycentre::cmd_barycentre(&BaryArgs {
                file: &file,
                partition: &partition,
                list,
                list_branches,
                kind,
                label: label.as_deref(),
                quality,
                style,
            })
        }
        Commands::LumiCsv2txt { files, force, lumi } => cmd_lumi_csv2txt(&files, force, lumi),
        Commands::LumiInfo { years, lumi_type, dry_run, config, extra } => {
            cmd_lumi_info(&years, lumi_type, dry_run, config.as_deref(), extra)
        }
        Commands::CreateJobs { dataset, flavour, force, n_max, output_dir, events, cfg, catalog } => {
            let mut req = JobRequest::for_current_user()?;
            req.dataset = dataset;
            req.flavour = flavour;
            req.force = force;
            req.max_files = n_max;
            req.output_dir = output_dir;
            req.events = events;
            req.cfg = cfg;
            cmd_create_jobs(&req, catalog.as_deref())
        }
        Commands::Version => {
            println!("cmstools {}", ct_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_lumi_csv2txt(files: &[PathBuf], force: bool, lumi: LumiType) -> Result<()> {
    for input in files {
        let (output, rows) = ct_lumi::convert_file(input, force, lumi)
            .with_context(|| format!("failed to convert {}", input.display()))?;
        tracing::debug!(output = %output.display(), rows, "converted");
    }
    Ok(())
}

fn cmd_lumi_info(
    years: &[u32],
    lumi_type: LumiType,
    dry_run: bool,
    config: Option<&Path>,
    extra: Vec<String>,
) -> Result<()> {
    let cfg = match config {
        Some(p) => BrilcalcConfig::load(p).with_context(|| format!("failed to load {}", p.display()))?,
        None => BrilcalcConfig::default(),
    };
    tracing::info!(?years, %lumi_type, ?extra, "brilcalc");

    let runner: Box<dyn CommandRunner> = if dry_run { Box::new(DryRunRunner) } else { Box::new(ShellRunner) };
    Brilcalc::new(&cfg, lumi_type, extra).run_years(runner.as_ref(), years)?;
    Ok(())
}

fn cmd_create_jobs(req: &JobRequest, catalog_file: Option<&Path>) -> Result<()> {
    let mut catalog = DatasetCatalog::builtin();
    if let Some(p) = catalog_file {
        catalog.merge_file(p).with_context(|| format!("failed to load catalog {}", p.display()))?;
    }
    tracing::debug!(?req, "create-jobs");

    let summary = ct_condor::create_jobs(req, &catalog, &ShellRunner)?;
    println!("INFO: created {} jobs in {}", summary.jobs, summary.job_dir.display());
    Ok(())
}
