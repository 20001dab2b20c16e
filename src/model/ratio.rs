use std::fmt;

/// Abundance ratio with explicit infinity tagging.
///
/// Infinite ratios are first-class values here, not IEEE sentinels flowing
/// through arithmetic: every consumer branches exhaustively on the three
/// variants. NaN is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Finite(f64),
    PositiveInfinite,
    NegativeInfinite,
}

impl Ratio {
    /// Classify a parsed float. Returns `None` for NaN.
    pub fn from_f64(value: f64) -> Option<Ratio> {
        if value.is_nan() {
            None
        } else if value == f64::INFINITY {
            Some(Ratio::PositiveInfinite)
        } else if value == f64::NEG_INFINITY {
            Some(Ratio::NegativeInfinite)
        } else {
            Some(Ratio::Finite(value))
        }
    }

    pub fn finite(self) -> Option<f64> {
        match self {
            Ratio::Finite(v) => Some(v),
            _ => None,
        }
    }

    /// Value used in printed tables. An `r_inf` substitution replaces
    /// +Infinity with `r_inf` and -Infinity with `-r_inf`; it never feeds
    /// back into any significance decision.
    pub fn display_value(self, r_inf: Option<f64>) -> String {
        match (self, r_inf) {
            (Ratio::Finite(v), _) => format!("{v}"),
            (Ratio::PositiveInfinite, Some(r)) => format!("{r}"),
            (Ratio::NegativeInfinite, Some(r)) => format!("{}", -r),
            (Ratio::PositiveInfinite, None) => "Infinity".to_string(),
            (Ratio::NegativeInfinite, None) => "-Infinity".to_string(),
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value(None))
    }
}
