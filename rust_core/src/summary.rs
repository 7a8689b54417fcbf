//! Descriptive statistics of sampled arrays.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Summary of one sampled column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample variance (divides by `count - 1`).
    pub variance: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q05: f64,
    pub median: f64,
    pub q95: f64,
}

impl Summary {
    /// Summarizes `values`; an empty input gives NaN statistics.
    pub fn from_values(values: ArrayView1<'_, f64>) -> Self {
        // Welford's online update
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for &x in values.iter() {
            count += 1;
            let delta = x - mean;
            mean += delta / count as f64;
            m2 += delta * (x - mean);
        }
        let variance = if count > 1 {
            m2 / (count - 1) as f64
        } else {
            f64::NAN
        };

        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        Self {
            count,
            mean: if count > 0 { mean } else { f64::NAN },
            variance,
            std: variance.sqrt(),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            max: sorted.last().copied().unwrap_or(f64::NAN),
            q05: quantile_sorted(&sorted, 0.05),
            median: quantile_sorted(&sorted, 0.5),
            q95: quantile_sorted(&sorted, 0.95),
        }
    }

    /// Render as a one-row table.
    pub fn to_table(&self, name: &str) -> String {
        render_table(&[(name, self)])
    }
}

/// Linear interpolation between the closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = q * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    let frac = idx - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi.min(sorted.len() - 1)] * frac
}

pub(crate) fn render_table(rows: &[(&str, &Summary)]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(format!(
        "{:<12} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Variable", "draws", "mean", "std", "q5%", "median", "q95%"
    ));
    lines.push("─".repeat(76));
    for (name, s) in rows {
        lines.push(format!(
            "{:<12} {:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            name, s.count, s.mean, s.std, s.q05, s.median, s.q95
        ));
    }
    lines.push("─".repeat(76));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn test_summary_of_known_values() {
        let xs = array![4.0, 1.0, 3.0, 2.0, 5.0];
        let s = Summary::from_values(xs.view());
        assert_eq!(s.count, 5);
        assert_abs_diff_eq!(s.mean, 3.0);
        assert_abs_diff_eq!(s.variance, 2.5, epsilon = 1e-12);
        assert_eq!((s.min, s.max), (1.0, 5.0));
        assert_abs_diff_eq!(s.median, 3.0);
        assert_abs_diff_eq!(s.q05, 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(s.q95, 4.8, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_summary_is_nan() {
        let xs: Array1<f64> = Array1::zeros(0);
        let s = Summary::from_values(xs.view());
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan() && s.median.is_nan() && s.min.is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [0.0, 10.0];
        assert_abs_diff_eq!(quantile_sorted(&sorted, 0.25), 2.5);
        assert_eq!(quantile_sorted(&sorted, 1.0), 10.0);
        assert_eq!(quantile_sorted(&[7.0], 0.3), 7.0);
    }

    #[test]
    fn test_table_has_one_row_per_variable() {
        let s = Summary::from_values(array![1.0, 2.0].view());
        let table = s.to_table("x");
        assert_eq!(table.lines().count(), 4);
        assert!(table.lines().nth(2).unwrap().starts_with("x "));
    }
}
