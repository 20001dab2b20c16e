use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::{debug, info};

use crate::error::{CompareError, Result};
use crate::model::{EntityKey, Ratio, ScoredEntity};

/// Suffix that identifies a per-site quantification table inside an
/// upstream output folder.
pub const SITE_FILE_SUFFIX: &str = "_sites.tsv";

// Fixed column positions of the upstream tab-delimited tables.
const COL_PEPTIDE_KEY: usize = 0;
const COL_PROTEIN_KEY: usize = 2;
const COL_EVIDENCE: usize = 6;
const COL_RATIO: usize = 9;
const COL_FDR: usize = 12;
const COL_VARIANCE: usize = 14;

/// Where the entity key lives in a row and how its components are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyLayout {
    /// Single peptide sequence key at column 0, components joined by `_`.
    Peptide,
    /// Composite accession+cluster key at column 2, joined by `,`.
    Protein,
}

impl std::str::FromStr for KeyLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "peptide" => Ok(KeyLayout::Peptide),
            "protein" => Ok(KeyLayout::Protein),
            other => Err(format!(
                "invalid comparison kind '{other}'. Valid values are peptide or protein"
            )),
        }
    }
}

impl KeyLayout {
    pub fn column(self) -> usize {
        match self {
            KeyLayout::Peptide => COL_PEPTIDE_KEY,
            KeyLayout::Protein => COL_PROTEIN_KEY,
        }
    }

    pub fn separator(self) -> &'static str {
        match self {
            KeyLayout::Peptide => "_",
            KeyLayout::Protein => ",",
        }
    }
}

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| CompareError::io(path, e))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Load one dataset file into a key-deduplicated entity set.
///
/// The header line is skipped. Rows with an empty key field or an empty
/// FDR field are skipped; any unparsable numeric field aborts the whole
/// load, since it signals an upstream format mismatch rather than one bad
/// row. FDR values outside [0, 1] and negative variances are rejected the
/// same way. Entities are retained iff `fdr <= fdr_threshold`. When two
/// rows share a key the first occurrence wins.
pub fn load_scored_entities(
    path: &Path,
    layout: KeyLayout,
    fdr_threshold: f64,
) -> Result<HashSet<ScoredEntity>> {
    let reader = open_maybe_gz(path)?;
    let mut set: HashSet<ScoredEntity> = HashSet::new();
    let mut skipped = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CompareError::io(path, e))?;
        let line_no = idx + 1;
        if idx == 0 {
            continue; // header
        }
        // The line itself is not trimmed: a leading tab is an empty first
        // field, and stripping it would shift every column left by one.
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(|f| f.trim()).collect();

        let key_field = column(path, line_no, &fields, layout.column())?;
        let key = EntityKey::parse(key_field, layout.separator());
        if key.is_empty() {
            skipped += 1;
            continue;
        }
        let fdr_field = column(path, line_no, &fields, COL_FDR)?;
        if fdr_field.is_empty() {
            skipped += 1;
            continue;
        }

        let fdr = parse_f64(path, line_no, "FDR", fdr_field)?;
        if !(0.0..=1.0).contains(&fdr) {
            return Err(CompareError::format(
                path,
                line_no,
                format!("FDR value {fdr} outside [0, 1]"),
            ));
        }
        let ratio_value = parse_f64(
            path,
            line_no,
            "ratio",
            column(path, line_no, &fields, COL_RATIO)?,
        )?;
        let ratio = Ratio::from_f64(ratio_value)
            .ok_or_else(|| CompareError::format(path, line_no, "ratio column holds NaN"))?;
        let variance = parse_f64(
            path,
            line_no,
            "variance",
            column(path, line_no, &fields, COL_VARIANCE)?,
        )?;
        if variance.is_nan() || variance < 0.0 {
            return Err(CompareError::format(
                path,
                line_no,
                format!("variance value {variance} is not a non-negative number"),
            ));
        }
        let evidence_count = parse_u32(
            path,
            line_no,
            "evidence count",
            column(path, line_no, &fields, COL_EVIDENCE)?,
        )?;

        if fdr > fdr_threshold {
            continue;
        }
        let entity = ScoredEntity {
            key,
            fdr,
            ratio,
            variance,
            evidence_count,
        };
        if !set.insert(entity) {
            debug!(
                "duplicate key in {} (line {}); keeping first",
                path.display(),
                line_no
            );
        }
    }

    info!(
        "loaded {} entities from {} (FDR <= {}, {} rows skipped for empty key/FDR)",
        set.len(),
        path.display(),
        fdr_threshold,
        skipped
    );
    Ok(set)
}

/// Absent optional file means "dataset not provided", selecting the 2-way
/// comparison path, never an error.
pub fn load_optional(
    path: Option<&Path>,
    layout: KeyLayout,
    fdr_threshold: f64,
) -> Result<Option<HashSet<ScoredEntity>>> {
    match path {
        Some(p) => Ok(Some(load_scored_entities(p, layout, fdr_threshold)?)),
        None => Ok(None),
    }
}

fn column<'a>(path: &Path, line_no: usize, fields: &[&'a str], idx: usize) -> Result<&'a str> {
    fields.get(idx).copied().ok_or_else(|| {
        CompareError::format(
            path,
            line_no,
            format!(
                "expected at least {} tab-delimited columns, found {}",
                idx + 1,
                fields.len()
            ),
        )
    })
}

fn parse_f64(path: &Path, line_no: usize, what: &str, field: &str) -> Result<f64> {
    field
        .parse::<f64>()
        .map_err(|_| CompareError::format(path, line_no, format!("unparsable {what} value '{field}'")))
}

fn parse_u32(path: &Path, line_no: usize, what: &str, field: &str) -> Result<u32> {
    field
        .parse::<u32>()
        .map_err(|_| CompareError::format(path, line_no, format!("unparsable {what} value '{field}'")))
}

/// One dataset reference from the input list file: a display label and the
/// file (or folder) holding its per-site table. The label-to-file
/// association is carried explicitly through the pipeline; there is no
/// global registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub label: String,
    pub path: PathBuf,
}

/// Read a file-of-paths. Each non-empty line is either `label<TAB>path` or
/// a bare path whose file stem becomes the label.
pub fn read_dataset_list(list_path: &Path) -> Result<Vec<DatasetRef>> {
    let reader = open_maybe_gz(list_path)?;
    let mut refs = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CompareError::io(list_path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let dataset = match line.split_once('\t') {
            Some((label, path)) => DatasetRef {
                label: label.trim().to_string(),
                path: PathBuf::from(path.trim()),
            },
            None => {
                let path = PathBuf::from(line);
                let label = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        CompareError::format(
                            list_path,
                            idx + 1,
                            format!("cannot derive a dataset label from path '{line}'"),
                        )
                    })?;
                DatasetRef { label, path }
            }
        };
        if dataset.label.is_empty() {
            return Err(CompareError::format(list_path, idx + 1, "empty dataset label"));
        }
        refs.push(dataset);
    }
    if refs.is_empty() {
        return Err(CompareError::MissingInput {
            reason: format!("input list {} names no dataset files", list_path.display()),
        });
    }
    Ok(refs)
}

/// Resolve a listed dataset entry to its per-site table. A plain file is
/// used as-is; a folder must contain exactly one `*_sites.tsv` (or `.gz`)
/// file, anything else is a structural mismatch naming the folder and
/// dataset.
pub fn resolve_site_file(dataset: &DatasetRef) -> Result<PathBuf> {
    if !dataset.path.is_dir() {
        return Ok(dataset.path.clone());
    }
    let mut matches = Vec::new();
    let entries =
        std::fs::read_dir(&dataset.path).map_err(|e| CompareError::io(&dataset.path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CompareError::io(&dataset.path, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(SITE_FILE_SUFFIX) || name.ends_with(&format!("{SITE_FILE_SUFFIX}.gz")) {
            matches.push(entry.path());
        }
    }
    if matches.len() != 1 {
        return Err(CompareError::StructuralMismatch {
            folder: dataset.path.clone(),
            label: dataset.label.clone(),
            found: matches.len(),
        });
    }
    Ok(matches.remove(0))
}
