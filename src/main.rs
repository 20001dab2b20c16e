mod error;
mod input;
mod model;
mod overlap;
mod pipeline;
mod report;
mod stats;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{CompareError, Result};
use crate::input::KeyLayout;
use crate::model::config::{DEFAULT_NUMBER_SIGMAS, DEFAULT_QVALUE_THRESHOLD};
use crate::model::{CorrectionMethod, PlexType, SiteCompareConfig};
use crate::pipeline::{OverlapJob, SiteJob, run_overlap, run_sites};
use crate::report::text::{render_overlap_report, render_site_report};
use crate::report::{RunSummary, write_run_summary, write_text_file};

#[derive(Parser)]
#[command(name = "quantcompare")]
#[command(version)]
#[command(about = "Compare FDR-filtered quantitative proteomics datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pairwise significance analysis of quantified sites across 2-3 runs
    Sites {
        /// Parameter file of the upstream quantification run (must exist)
        #[arg(long)]
        param_file: PathBuf,

        /// File listing the datasets to compare, one per line, either
        /// `label<TAB>path` or a bare path (label = file stem)
        #[arg(long)]
        input_files: PathBuf,

        /// Isobaric labelling scheme of the inputs
        #[arg(long, default_value = "10PLEX")]
        plex: PlexType,

        /// Replace infinite ratios by +/- this value in printed tables
        #[arg(long)]
        rinf: Option<f64>,

        /// Output report path
        #[arg(long)]
        out: PathBuf,

        /// p-value correction method (BF, HOLM, BH, BY)
        #[arg(long, default_value = "BH")]
        correction: CorrectionMethod,

        /// q-value threshold for calling a pairwise comparison significant
        #[arg(long, default_value_t = DEFAULT_QVALUE_THRESHOLD)]
        qvalue_threshold: f64,

        /// Minimum significant pairwise comparisons a site needs to be
        /// reported (0 and 1 are equivalent)
        #[arg(long, default_value_t = 0)]
        min_discoveries: u32,

        /// Distance from the background mean, in sigmas, above which a
        /// finite ratio neutralizes an infinite counterpart
        #[arg(long, default_value_t = DEFAULT_NUMBER_SIGMAS)]
        sigmas: u32,

        /// Keep only entities at or below this FDR before comparing
        #[arg(long, default_value_t = 1.0)]
        fdr_threshold: f64,
    },

    /// Overlap (Venn) analysis of 2 or 3 scored datasets
    Overlap {
        /// Display name of the first dataset
        #[arg(long)]
        name1: String,

        /// Scored table of the first dataset
        #[arg(long)]
        file1: PathBuf,

        /// Display name of the second dataset
        #[arg(long)]
        name2: String,

        /// Scored table of the second dataset
        #[arg(long)]
        file2: PathBuf,

        /// Display name of the optional third dataset
        #[arg(long)]
        name3: Option<String>,

        /// Scored table of the optional third dataset
        #[arg(long)]
        file3: Option<PathBuf>,

        /// Compare peptide or protein entries
        #[arg(long, default_value = "peptide")]
        kind: KeyLayout,

        /// Keep only entities at or below this FDR
        #[arg(long, default_value_t = 0.05)]
        fdr_threshold: f64,

        /// Output report path; stdout when absent
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("{err}");
        std::process::exit(1);
    }
    println!("Program finished successfully.");
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Sites {
            param_file,
            input_files,
            plex,
            rinf,
            out,
            correction,
            qvalue_threshold,
            min_discoveries,
            sigmas,
            fdr_threshold,
        } => {
            let config = SiteCompareConfig {
                fdr_threshold,
                r_inf: rinf,
                plex,
                correction,
                qvalue_threshold,
                number_sigmas: sigmas,
                min_discoveries,
            };
            config.validate().map_err(CompareError::config)?;
            info!(
                "site comparison: plex={}, correction={}, q<={}, sigmas={}, min discoveries={}",
                config.plex,
                config.correction,
                config.qvalue_threshold,
                config.number_sigmas,
                config.min_discoveries
            );

            let datasets = input::read_dataset_list(&input_files)?;
            let job = SiteJob {
                param_file,
                datasets,
                config,
            };
            let comparison = run_sites(&job)?;

            let report = render_site_report(&comparison);
            write_text_file(&out, &report)?;
            write_run_summary(&out, &RunSummary::for_sites(&comparison))?;
            Ok(())
        }
        Commands::Overlap {
            name1,
            file1,
            name2,
            file2,
            name3,
            file3,
            kind,
            fdr_threshold,
            out,
        } => {
            let job = OverlapJob {
                name1,
                file1,
                name2,
                file2,
                name3,
                file3,
                kind,
                fdr_threshold,
            };
            let outcome = run_overlap(&job)?;

            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let report = render_overlap_report(&outcome, timestamp);
            match &out {
                Some(path) => {
                    write_text_file(path, &report)?;
                    write_run_summary(path, &RunSummary::for_overlap(&outcome, fdr_threshold))?;
                }
                None => print!("{report}"),
            }
            Ok(())
        }
    }
}
