//! Multiple-testing correction over the per-site p-value vector.
//!
//! All four procedures return one adjusted value (q-value) per input
//! p-value, in the input order, clamped to [0, 1]. NaN inputs stay NaN
//! and do not count toward the number of tests.

use crate::model::CorrectionMethod;

pub fn adjust(pvalues: &[f64], method: CorrectionMethod) -> Vec<f64> {
    match method {
        CorrectionMethod::Bonferroni => bonferroni(pvalues),
        CorrectionMethod::Holm => holm(pvalues),
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(pvalues, 1.0),
        CorrectionMethod::BenjaminiYekutieli => {
            let m = count_tests(pvalues);
            let c_m: f64 = (1..=m.max(1)).map(|i| 1.0 / i as f64).sum();
            benjamini_hochberg(pvalues, c_m)
        }
    }
}

pub fn is_discovery(qvalue: f64, threshold: f64) -> bool {
    qvalue.is_finite() && qvalue <= threshold
}

fn count_tests(pvalues: &[f64]) -> usize {
    pvalues.iter().filter(|p| !p.is_nan()).count()
}

/// Indices of `pvalues` sorted ascending, NaN last.
fn order(pvalues: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..pvalues.len()).collect();
    indices.sort_by(|&a, &b| {
        let pa = pvalues[a];
        let pb = pvalues[b];
        if pa.is_nan() && pb.is_nan() {
            std::cmp::Ordering::Equal
        } else if pa.is_nan() {
            std::cmp::Ordering::Greater
        } else if pb.is_nan() {
            std::cmp::Ordering::Less
        } else {
            pa.partial_cmp(&pb).unwrap()
        }
    });
    indices
}

fn bonferroni(pvalues: &[f64]) -> Vec<f64> {
    let m = count_tests(pvalues);
    pvalues
        .iter()
        .map(|&p| if p.is_nan() { f64::NAN } else { (p * m as f64).min(1.0) })
        .collect()
}

/// Step-down: ranked ascending, each value scaled by the tests remaining
/// at its rank, with a running maximum to keep the output monotone.
fn holm(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let m = count_tests(pvalues);
    let mut adjusted = vec![f64::NAN; n];
    let mut running_max = 0.0f64;
    for (rank, &i) in order(pvalues).iter().enumerate() {
        let p = pvalues[i];
        if p.is_nan() {
            continue;
        }
        let scaled = ((m - rank) as f64 * p).min(1.0);
        running_max = running_max.max(scaled);
        adjusted[i] = running_max;
    }
    adjusted
}

/// Step-up with an optional dependency factor: `factor` is 1 for plain
/// Benjamini-Hochberg and `sum(1/i)` for Benjamini-Yekutieli.
fn benjamini_hochberg(pvalues: &[f64], factor: f64) -> Vec<f64> {
    let n = pvalues.len();
    let m = count_tests(pvalues);
    if m == 0 {
        return vec![f64::NAN; n];
    }
    let indices = order(pvalues);
    let mut adjusted = vec![f64::NAN; n];
    let mut running_min = f64::INFINITY;
    let mut rank = m;
    for &i in indices.iter().rev() {
        let p = pvalues[i];
        if p.is_nan() {
            continue;
        }
        let scaled = (p * factor * m as f64 / rank as f64).min(1.0);
        running_min = running_min.min(scaled);
        adjusted[i] = running_min;
        rank -= 1;
    }
    adjusted
}
