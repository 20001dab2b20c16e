pub mod text;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{CompareError, Result};
use crate::pipeline::{OverlapOutcome, SiteComparison};

pub fn format_f64_6(v: f64) -> String {
    format!("{v:.6}")
}

pub fn write_text_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| CompareError::io(path, e))?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Machine-readable sidecar written next to the main report.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub version: String,
    pub mode: String,
    pub datasets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdr_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qvalue_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_sigmas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_discoveries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_sites_total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_sites_reported: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub union_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersection_size: Option<usize>,
}

impl RunSummary {
    fn base(mode: &str, datasets: Vec<String>) -> RunSummary {
        RunSummary {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: mode.to_string(),
            datasets,
            title: None,
            fdr_threshold: None,
            correction_method: None,
            qvalue_threshold: None,
            number_sigmas: None,
            min_discoveries: None,
            n_sites_total: None,
            n_sites_reported: None,
            union_size: None,
            intersection_size: None,
        }
    }

    pub fn for_overlap(outcome: &OverlapOutcome, fdr_threshold: f64) -> RunSummary {
        let mut summary = RunSummary::base("overlap", outcome.partition.names.clone());
        summary.title = Some(outcome.title.clone());
        summary.fdr_threshold = Some(fdr_threshold);
        summary.union_size = Some(outcome.partition.union_size());
        summary.intersection_size = Some(outcome.partition.all.len());
        summary
    }

    pub fn for_sites(comparison: &SiteComparison) -> RunSummary {
        let mut summary = RunSummary::base("sites", comparison.labels.clone());
        summary.fdr_threshold = Some(comparison.config.fdr_threshold);
        summary.correction_method = Some(comparison.config.correction.as_str().to_string());
        summary.qvalue_threshold = Some(comparison.config.qvalue_threshold);
        summary.number_sigmas = Some(comparison.config.number_sigmas);
        summary.min_discoveries = Some(comparison.config.min_discoveries);
        summary.n_sites_total = Some(comparison.n_sites_total);
        summary.n_sites_reported = Some(comparison.rows.len());
        summary
    }
}

/// Write `run_summary.json` into the report's directory.
pub fn write_run_summary(report_path: &Path, summary: &RunSummary) -> Result<()> {
    let dir = report_path.parent().unwrap_or_else(|| Path::new("."));
    let path: PathBuf = dir.join("run_summary.json");
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| CompareError::config(format!("cannot serialize run summary: {e}")))?;
    write_text_file(&path, &json)
}
