use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const DEFAULT_QVALUE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_NUMBER_SIGMAS: u32 = 2;

/// Isobaric labelling scheme of the upstream quantification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlexType {
    TenPlex,
    SixPlex,
}

impl PlexType {
    pub fn as_str(self) -> &'static str {
        match self {
            PlexType::TenPlex => "10PLEX",
            PlexType::SixPlex => "6PLEX",
        }
    }
}

impl FromStr for PlexType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10PLEX" => Ok(PlexType::TenPlex),
            "6PLEX" => Ok(PlexType::SixPlex),
            other => Err(format!(
                "invalid plex type '{other}'. Valid values are 10PLEX or 6PLEX"
            )),
        }
    }
}

impl fmt::Display for PlexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported p-value correction procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrectionMethod {
    Bonferroni,
    Holm,
    BenjaminiHochberg,
    BenjaminiYekutieli,
}

impl CorrectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "BF",
            CorrectionMethod::Holm => "HOLM",
            CorrectionMethod::BenjaminiHochberg => "BH",
            CorrectionMethod::BenjaminiYekutieli => "BY",
        }
    }

    /// Literature reference shown when the method is logged.
    pub fn reference(self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "Bonferroni single-step FWER control",
            CorrectionMethod::Holm => "Holm (1979) step-down FWER control",
            CorrectionMethod::BenjaminiHochberg => {
                "Benjamini & Hochberg (1995) step-up FDR control"
            }
            CorrectionMethod::BenjaminiYekutieli => {
                "Benjamini & Yekutieli (2001) FDR control under dependency"
            }
        }
    }

    pub fn valid_values() -> &'static str {
        "BF, HOLM, BH, BY"
    }
}

impl FromStr for CorrectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BF" => Ok(CorrectionMethod::Bonferroni),
            "HOLM" => Ok(CorrectionMethod::Holm),
            "BH" => Ok(CorrectionMethod::BenjaminiHochberg),
            "BY" => Ok(CorrectionMethod::BenjaminiYekutieli),
            other => Err(format!(
                "invalid p-value correction method '{other}'. Valid values are {}",
                CorrectionMethod::valid_values()
            )),
        }
    }
}

impl Default for CorrectionMethod {
    fn default() -> Self {
        CorrectionMethod::BenjaminiHochberg
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated numeric/enumerated parameters of a quant-site run. Built once
/// from the CLI before any file is read.
#[derive(Debug, Clone, Serialize)]
pub struct SiteCompareConfig {
    pub fdr_threshold: f64,
    pub r_inf: Option<f64>,
    pub plex: PlexType,
    pub correction: CorrectionMethod,
    pub qvalue_threshold: f64,
    pub number_sigmas: u32,
    pub min_discoveries: u32,
}

impl SiteCompareConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(r) = self.r_inf {
            if r < 0.0 || r.is_nan() {
                return Err(format!(
                    "RInf must be a non-negative number, got {r} (negative infinities are replaced by -RInf)"
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.qvalue_threshold) {
            return Err(format!(
                "q-value threshold must be between 0 and 1, got {}",
                self.qvalue_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.fdr_threshold) {
            return Err(format!(
                "FDR threshold must be between 0 and 1, got {}",
                self.fdr_threshold
            ));
        }
        Ok(())
    }
}
