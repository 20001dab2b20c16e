use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::info;

use crate::error::{CompareError, Result};
use crate::input::{self, DatasetRef, KeyLayout};
use crate::model::{EntityKey, NamedEntitySet, Ratio, SiteCompareConfig};
use crate::overlap::{self, OverlapPartition};
use crate::stats::correction::{self, is_discovery};
use crate::stats::significance::{Observation, PairDecision, compare_pair};
use crate::stats::RatioBackground;

/// Inputs of one overlap comparison run. The third dataset is optional and
/// selects the 3-way path when present.
#[derive(Debug, Clone)]
pub struct OverlapJob {
    pub name1: String,
    pub file1: PathBuf,
    pub name2: String,
    pub file2: PathBuf,
    pub name3: Option<String>,
    pub file3: Option<PathBuf>,
    pub kind: KeyLayout,
    pub fdr_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct OverlapOutcome {
    pub title: String,
    pub kind: KeyLayout,
    /// Label and source file of each compared dataset, report-header order.
    pub dataset_files: Vec<(String, PathBuf)>,
    pub partition: OverlapPartition,
}

pub fn run_overlap(job: &OverlapJob) -> Result<OverlapOutcome> {
    validate_overlap_names(job)?;

    let set1 = input::load_scored_entities(&job.file1, job.kind, job.fdr_threshold)?;
    let set2 = input::load_scored_entities(&job.file2, job.kind, job.fdr_threshold)?;
    let set3 = input::load_optional(job.file3.as_deref(), job.kind, job.fdr_threshold)?;

    let a = NamedEntitySet::new(job.name1.clone(), set1);
    let b = NamedEntitySet::new(job.name2.clone(), set2);
    let c = match (&job.name3, set3) {
        (Some(name), Some(entities)) => Some(NamedEntitySet::new(name.clone(), entities)),
        _ => None,
    };

    let title = overlap::build_title(&[
        Some(job.name1.as_str()),
        Some(job.name2.as_str()),
        c.as_ref().map(|s| s.name.as_str()),
    ]);
    let partition = overlap::compute_overlap(&a, &b, c.as_ref());

    let mut dataset_files = vec![
        (job.name1.clone(), job.file1.clone()),
        (job.name2.clone(), job.file2.clone()),
    ];
    if let (Some(name), Some(file)) = (&job.name3, &job.file3) {
        dataset_files.push((name.clone(), file.clone()));
    }

    Ok(OverlapOutcome {
        title,
        kind: job.kind,
        dataset_files,
        partition,
    })
}

fn validate_overlap_names(job: &OverlapJob) -> Result<()> {
    if job.name1.is_empty() || job.name2.is_empty() {
        return Err(CompareError::config("dataset names must be non-empty"));
    }
    let mut names = vec![job.name1.as_str(), job.name2.as_str()];
    if let Some(n3) = &job.name3 {
        if n3.is_empty() {
            return Err(CompareError::config("dataset names must be non-empty"));
        }
        names.push(n3.as_str());
    }
    names.sort_unstable();
    names.dedup();
    let expected = 2 + job.name3.iter().len();
    if names.len() != expected {
        return Err(CompareError::config("dataset names must be unique"));
    }
    if job.name3.is_some() != job.file3.is_some() {
        return Err(CompareError::config(
            "a third dataset requires both a name and a file",
        ));
    }
    Ok(())
}

/// Inputs of one quant-site comparison run. `datasets` is the explicit
/// label-to-file mapping; nothing about the association is global.
#[derive(Debug, Clone)]
pub struct SiteJob {
    pub param_file: PathBuf,
    pub datasets: Vec<DatasetRef>,
    pub config: SiteCompareConfig,
}

/// One pairwise comparison cell of a site row, after correction.
#[derive(Debug, Clone, Copy)]
pub struct PairCell {
    pub decision: PairDecision,
    pub qvalue: f64,
}

/// One retained quantification site across all compared datasets.
#[derive(Debug, Clone)]
pub struct SiteRow {
    pub key: EntityKey,
    /// Ratio per dataset, `None` where the site was not quantified.
    pub ratios: Vec<Option<Ratio>>,
    /// One cell per dataset pair, `None` where either side is missing.
    pub cells: Vec<Option<PairCell>>,
    pub discoveries: u32,
}

#[derive(Debug, Clone)]
pub struct SiteComparison {
    pub labels: Vec<String>,
    /// Index pairs into `labels`, row-cell order.
    pub pairs: Vec<(usize, usize)>,
    pub background: RatioBackground,
    pub n_sites_total: usize,
    /// Retained rows, sorted by site key.
    pub rows: Vec<SiteRow>,
    pub config: SiteCompareConfig,
}

pub fn run_sites(job: &SiteJob) -> Result<SiteComparison> {
    if !job.param_file.exists() {
        return Err(CompareError::MissingInput {
            reason: format!("parameter file {} does not exist", job.param_file.display()),
        });
    }
    if !(2..=3).contains(&job.datasets.len()) {
        return Err(CompareError::config(format!(
            "expected 2 or 3 datasets to compare, got {}",
            job.datasets.len()
        )));
    }
    let mut labels: Vec<&str> = job.datasets.iter().map(|d| d.label.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();
    if labels.len() != job.datasets.len() {
        return Err(CompareError::config(
            "dataset labels must be unique; relabel the input list entries",
        ));
    }

    let mut sets = Vec::with_capacity(job.datasets.len());
    for dataset in &job.datasets {
        let path = input::resolve_site_file(dataset)?;
        let entities =
            input::load_scored_entities(&path, KeyLayout::Peptide, job.config.fdr_threshold)?;
        sets.push(NamedEntitySet::new(dataset.label.clone(), entities));
    }

    let background =
        RatioBackground::from_ratios(sets.iter().flat_map(|s| s.entities.iter()).map(|e| &e.ratio));
    info!(
        "ratio background: mean={:.4}, sigma={:.4} over {} finite ratios",
        background.mean, background.sigma, background.n_finite
    );

    // Deterministic site universe: union of keys, ordered.
    let site_keys: BTreeSet<EntityKey> = sets
        .iter()
        .flat_map(|s| s.entities.iter().map(|e| e.key.clone()))
        .collect();
    let n_sites_total = site_keys.len();

    let pairs = index_pairs(sets.len());

    // First pass: decisions and the flat p-value vector for correction.
    let mut decisions: Vec<Vec<Option<PairDecision>>> = Vec::with_capacity(n_sites_total);
    let mut pvector: Vec<f64> = Vec::new();
    for key in &site_keys {
        let mut row = Vec::with_capacity(pairs.len());
        for &(i, j) in &pairs {
            let cell = match (sets[i].get(key), sets[j].get(key)) {
                (Some(x), Some(y)) => {
                    let decision = compare_pair(
                        Observation {
                            ratio: x.ratio,
                            variance: x.variance,
                        },
                        Observation {
                            ratio: y.ratio,
                            variance: y.variance,
                        },
                        &background,
                        job.config.number_sigmas,
                    );
                    pvector.push(decision.input_pvalue());
                    Some(decision)
                }
                _ => None,
            };
            row.push(cell);
        }
        decisions.push(row);
    }

    // Correction runs across every compared pair of every site at once.
    let qvector = correction::adjust(&pvector, job.config.correction);

    // Second pass: reattach q-values and count discoveries.
    let min_required = job.config.min_discoveries.max(1);
    let mut rows = Vec::new();
    let mut cursor = 0usize;
    for (key, decision_row) in site_keys.iter().zip(decisions) {
        let mut cells = Vec::with_capacity(pairs.len());
        let mut discoveries = 0u32;
        for decision in decision_row {
            let cell = decision.map(|decision| {
                let qvalue = qvector[cursor];
                cursor += 1;
                if is_discovery(qvalue, job.config.qvalue_threshold) {
                    discoveries += 1;
                }
                PairCell { decision, qvalue }
            });
            cells.push(cell);
        }
        if discoveries < min_required {
            continue;
        }
        let ratios = sets.iter().map(|s| s.get(key).map(|e| e.ratio)).collect();
        rows.push(SiteRow {
            key: key.clone(),
            ratios,
            cells,
            discoveries,
        });
    }

    info!(
        "{} of {} sites retained (q <= {}, discoveries >= {})",
        rows.len(),
        n_sites_total,
        job.config.qvalue_threshold,
        min_required
    );

    Ok(SiteComparison {
        labels: sets.into_iter().map(|s| s.name).collect(),
        pairs,
        background,
        n_sites_total,
        rows,
        config: job.config.clone(),
    })
}

fn index_pairs(n: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{DEFAULT_NUMBER_SIGMAS, DEFAULT_QVALUE_THRESHOLD};
    use crate::model::{CorrectionMethod, PlexType};
    use std::io::Write;
    use std::path::Path;

    const HEADER: &str =
        "key\tc1\tacc\tc3\tc4\tc5\tpsms\tc7\tc8\tratio\tc10\tc11\tfdr\tc13\tvariance\n";

    fn row(key: &str, ratio: &str, variance: &str) -> String {
        format!("{key}\tx\tACC\tx\tx\tx\t3\tx\tx\t{ratio}\tx\tx\t0.01\tx\t{variance}\n")
    }

    fn write_sites(dir: &Path, name: &str, rows: &[String]) -> DatasetRef {
        let path = dir.join(format!("{name}_sites.tsv"));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        for r in rows {
            file.write_all(r.as_bytes()).unwrap();
        }
        DatasetRef {
            label: name.to_string(),
            path,
        }
    }

    fn config() -> SiteCompareConfig {
        SiteCompareConfig {
            fdr_threshold: 1.0,
            r_inf: None,
            plex: PlexType::TenPlex,
            correction: CorrectionMethod::BenjaminiHochberg,
            qvalue_threshold: DEFAULT_QVALUE_THRESHOLD,
            number_sigmas: DEFAULT_NUMBER_SIGMAS,
            min_discoveries: 0,
        }
    }

    fn job(dir: &Path, datasets: Vec<DatasetRef>) -> SiteJob {
        let param_file = dir.join("params.txt");
        std::fs::write(&param_file, "opaque\n").unwrap();
        SiteJob {
            param_file,
            datasets,
            config: config(),
        }
    }

    // Many identical finite ratios keep the background tight so infinity
    // decisions in these fixtures are driven by the rule under test.
    fn background_rows() -> Vec<String> {
        (0..20).map(|i| row(&format!("BG{i}"), "1.0", "0.001")).collect()
    }

    #[test]
    fn test_two_dataset_run_flags_separated_ratios() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows_a = background_rows();
        rows_a.push(row("SITE_DIFF", "5.0", "0.01"));
        rows_a.push(row("SITE_SAME", "1.0", "0.01"));
        let mut rows_b = background_rows();
        rows_b.push(row("SITE_DIFF", "1.0", "0.01"));
        rows_b.push(row("SITE_SAME", "1.0", "0.01"));
        let a = write_sites(dir.path(), "exp_a", &rows_a);
        let b = write_sites(dir.path(), "exp_b", &rows_b);

        let result = run_sites(&job(dir.path(), vec![a, b])).unwrap();
        assert_eq!(result.labels, vec!["exp_a", "exp_b"]);
        assert_eq!(result.pairs, vec![(0, 1)]);

        let keys: Vec<&str> = result.rows.iter().map(|r| r.key.joined()).collect();
        assert!(keys.contains(&"SITE_DIFF"));
        assert!(!keys.contains(&"SITE_SAME"), "identical ratios are not a discovery");
    }

    #[test]
    fn test_site_in_single_dataset_never_appears() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows_a = background_rows();
        rows_a.push(row("LONELY", "9.0", "0.01"));
        let a = write_sites(dir.path(), "exp_a", &rows_a);
        let b = write_sites(dir.path(), "exp_b", &background_rows());

        let result = run_sites(&job(dir.path(), vec![a, b])).unwrap();
        assert!(result.rows.iter().all(|r| r.key.joined() != "LONELY"));
    }

    #[test]
    fn test_min_discoveries_suppresses_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows_a = background_rows();
        rows_a.push(row("SITE_DIFF", "5.0", "0.01"));
        let mut rows_b = background_rows();
        rows_b.push(row("SITE_DIFF", "1.0", "0.01"));
        let a = write_sites(dir.path(), "exp_a", &rows_a);
        let b = write_sites(dir.path(), "exp_b", &rows_b);

        let mut site_job = job(dir.path(), vec![a, b]);
        site_job.config.min_discoveries = 2; // only one pair exists
        let result = run_sites(&site_job).unwrap();
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_three_dataset_run_counts_discoveries_across_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows_a = background_rows();
        rows_a.push(row("SITE", "Infinity", "0.0"));
        let mut rows_b = background_rows();
        rows_b.push(row("SITE", "-Infinity", "0.0"));
        let mut rows_c = background_rows();
        rows_c.push(row("SITE", "Infinity", "0.0"));
        let a = write_sites(dir.path(), "exp_a", &rows_a);
        let b = write_sites(dir.path(), "exp_b", &rows_b);
        let c = write_sites(dir.path(), "exp_c", &rows_c);

        let result = run_sites(&job(dir.path(), vec![a, b, c])).unwrap();
        assert_eq!(result.pairs.len(), 3);
        let site = result
            .rows
            .iter()
            .find(|r| r.key.joined() == "SITE")
            .expect("opposite-sign infinities must be reported");
        // a/b and b/c differ in sign; a/c share a sign
        assert_eq!(site.discoveries, 2);
    }

    #[test]
    fn test_missing_param_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_sites(dir.path(), "exp_a", &background_rows());
        let b = write_sites(dir.path(), "exp_b", &background_rows());
        let mut site_job = job(dir.path(), vec![a, b]);
        site_job.param_file = dir.path().join("no_such_params.txt");
        assert!(matches!(
            run_sites(&site_job).unwrap_err(),
            CompareError::MissingInput { .. }
        ));
    }

    #[test]
    fn test_duplicate_site_labels_are_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_sites(dir.path(), "exp_a", &background_rows());
        let mut b = write_sites(dir.path(), "exp_b", &background_rows());
        b.label = "exp_a".to_string();
        assert!(matches!(
            run_sites(&job(dir.path(), vec![a, b])).unwrap_err(),
            CompareError::Config { .. }
        ));
    }

    #[test]
    fn test_wrong_dataset_count_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_sites(dir.path(), "exp_a", &background_rows());
        assert!(matches!(
            run_sites(&job(dir.path(), vec![a])).unwrap_err(),
            CompareError::Config { .. }
        ));
    }

    #[test]
    fn test_overlap_job_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let file1 = dir.path().join("one.tsv");
        let file2 = dir.path().join("two.tsv");
        let mk = |keys: &[&str]| {
            let mut s = HEADER.to_string();
            for k in keys {
                s.push_str(&row(k, "1.0", "0.1"));
            }
            s
        };
        std::fs::write(&file1, mk(&["PEP1", "PEP2", "PEP3"])).unwrap();
        std::fs::write(&file2, mk(&["PEP2", "PEP3", "PEP4"])).unwrap();

        let outcome = run_overlap(&OverlapJob {
            name1: "one".to_string(),
            file1,
            name2: "two".to_string(),
            file2,
            name3: None,
            file3: None,
            kind: KeyLayout::Peptide,
            fdr_threshold: 0.05,
        })
        .unwrap();

        assert_eq!(outcome.title, "one vs two");
        let keys: Vec<&str> = outcome.partition.all.iter().map(|e| e.key.joined()).collect();
        assert_eq!(keys, ["PEP2", "PEP3"]);
    }

    #[test]
    fn test_overlap_rejects_duplicate_names() {
        let job = OverlapJob {
            name1: "same".to_string(),
            file1: PathBuf::from("a"),
            name2: "same".to_string(),
            file2: PathBuf::from("b"),
            name3: None,
            file3: None,
            kind: KeyLayout::Peptide,
            fdr_threshold: 0.05,
        };
        assert!(matches!(
            run_overlap(&job).unwrap_err(),
            CompareError::Config { .. }
        ));
    }
}
