pub mod correction;
pub mod significance;

use crate::model::Ratio;

/// Mean and standard deviation of the finite ratios observed across the
/// whole corpus. Computed once per run; the infinity decision rule reads
/// it as its reference distribution.
#[derive(Debug, Clone, Copy)]
pub struct RatioBackground {
    pub mean: f64,
    pub sigma: f64,
    pub n_finite: usize,
}

impl RatioBackground {
    pub fn from_ratios<'a, I>(ratios: I) -> RatioBackground
    where
        I: IntoIterator<Item = &'a Ratio>,
    {
        let finite: Vec<f64> = ratios.into_iter().filter_map(|r| r.finite()).collect();
        if finite.is_empty() {
            return RatioBackground {
                mean: 0.0,
                sigma: 0.0,
                n_finite: 0,
            };
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let sigma =
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        RatioBackground {
            mean,
            sigma,
            n_finite: finite.len(),
        }
    }

    /// Cutoff a finite ratio is compared against when the other side of a
    /// pair is infinite.
    pub fn upper_cutoff(&self, number_sigmas: u32) -> f64 {
        self.mean + number_sigmas as f64 * self.sigma
    }
}
