//! Descriptive statistics over price arrays.

use serde::{Deserialize, Serialize};

use crate::align::AlignedSeriesPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub mean: f64,
    pub std_dev: f64,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean and **population** standard deviation (divides by n, not n - 1).
pub fn standard_deviation(values: &[f64]) -> Option<Dispersion> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(Dispersion {
        mean,
        std_dev: variance.sqrt(),
    })
}

/// Pearson correlation coefficient.
///
/// Returns 0 when it is undefined: fewer than two samples, or zero variance in
/// either input. Inputs of unequal length are truncated to the shorter one.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() {
        tracing::warn!(x = x.len(), y = y.len(), "pearson inputs differ in length, truncating");
    }
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);

    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        sx += a;
        sy += b;
        sxy += a * b;
        sx2 += a * a;
        sy2 += b * b;
    }

    let nf = n as f64;
    let numerator = nf * sxy - sx * sy;
    let denominator = ((nf * sx2 - sx * sx) * (nf * sy2 - sy * sy)).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}

/// Correlation of the two aligned price legs; `None` below two points.
pub fn correlation(points: &[AlignedSeriesPoint]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let (a, b): (Vec<f64>, Vec<f64>) = points.iter().map(|p| (p.price_a, p.price_b)).unzip();
    Some(pearson(&a, &b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn perfect_positive_and_negative_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((pearson(&x, &[2.0, 4.0, 6.0, 8.0, 10.0]) - 1.0).abs() < 1e-9);
        assert!((pearson(&x, &[10.0, 8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_inputs_give_zero() {
        assert_eq!(pearson(&[], &[]), 0.0);
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(pearson(&[7.0, 7.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn uncorrelated_is_near_zero() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, -1.0, -1.0, 1.0];
        assert!(pearson(&x, &y).abs() < 1e-12);
    }

    #[test]
    fn unequal_lengths_use_common_prefix() {
        let r = pearson(&[1.0, 2.0, 3.0, 99.0], &[3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-9);
    }

    #[test]
    fn population_standard_deviation() {
        let d = standard_deviation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((d.mean - 5.0).abs() < 1e-12);
        assert!((d.std_dev - 2.0).abs() < 1e-12);

        assert_eq!(standard_deviation(&[]), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(standard_deviation(&[3.0]).unwrap().std_dev, 0.0);
    }

    #[test]
    fn correlation_of_aligned_points() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let point = |a: f64, b: f64| AlignedSeriesPoint {
            date,
            price_a: a,
            price_b: b,
            ratio: a / b,
            norm_a: 100.0,
            norm_b: 100.0,
        };

        assert_eq!(correlation(&[]), None);
        assert_eq!(correlation(&[point(1.0, 1.0)]), None);

        let r = correlation(&[point(1.0, 3.0), point(2.0, 5.0), point(3.0, 7.0)]).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }
}
