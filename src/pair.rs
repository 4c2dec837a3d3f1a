//! Correlation and liquidity ranges for one asset pair over a lookback window.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::align::{AlignedSeriesPoint, SeriesAligner};
use crate::candle::PricePoint;
use crate::liquidity::LiquidityRangeMetrics;
use crate::stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamedRange {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "ALL")]
    All,
}

/// How much aligned history a pair report covers, counted back from the
/// latest aligned date. Written as `{"days": 45}` or `"3M"` in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lookback {
    Days { days: u32 },
    Named(NamedRange),
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Named(NamedRange::ThreeMonths)
    }
}

impl Lookback {
    /// Calendar days covered, `None` for the whole history.
    pub fn days(&self) -> Option<u32> {
        match self {
            Lookback::Days { days } => Some((*days).max(1)),
            Lookback::Named(NamedRange::OneMonth) => Some(30),
            Lookback::Named(NamedRange::ThreeMonths) => Some(90),
            Lookback::Named(NamedRange::SixMonths) => Some(180),
            Lookback::Named(NamedRange::OneYear) => Some(365),
            Lookback::Named(NamedRange::All) => None,
        }
    }

    pub fn label(&self) -> String {
        match self.days() {
            Some(days) => format!("{days}d"),
            None => "all".to_string(),
        }
    }

    /// Keeps the trailing points inside the window. Input must be chronological.
    pub fn window<'a>(&self, points: &'a [AlignedSeriesPoint]) -> &'a [AlignedSeriesPoint] {
        let (Some(days), Some(last)) = (self.days(), points.last()) else {
            return points;
        };
        let cutoff = last.date - Duration::days(i64::from(days));
        let start = points.partition_point(|p| p.date <= cutoff);
        &points[start..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub base: String,
    pub quote: String,
    pub lookback: Lookback,
    pub points: Vec<AlignedSeriesPoint>,
    /// `None` when fewer than two dates overlap.
    pub correlation: Option<f64>,
    /// `None` when no dates overlap.
    pub ranges: Option<LiquidityRangeMetrics>,
}

impl PairReport {
    pub fn has_data(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Aligns `base` against `quote`, trims to the lookback window and derives the
/// correlation and range metrics. `inverted` quotes the ranges as quote/base.
pub fn analyze_pair(
    aligner: &SeriesAligner,
    base: (&str, &[PricePoint]),
    quote: (&str, &[PricePoint]),
    lookback: Lookback,
    inverted: bool,
) -> PairReport {
    let aligned = aligner.align(base.1, quote.1);
    let points = lookback.window(&aligned).to_vec();
    let ratios: Vec<f64> = points.iter().map(|p| p.ratio).collect();

    if points.is_empty() {
        tracing::info!(base = base.0, quote = quote.0, "no overlapping dates for pair");
    }

    PairReport {
        base: base.0.to_string(),
        quote: quote.0.to_string(),
        lookback,
        correlation: stats::correlation(&points),
        ranges: LiquidityRangeMetrics::from_ratios(&ratios).map(|m| m.oriented(inverted)),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    fn series(len: usize, f: impl Fn(usize) -> f64) -> Vec<PricePoint> {
        (0..len)
            .map(|i| PricePoint {
                time: i as i64 * DAY_MS,
                close: f(i),
            })
            .collect()
    }

    #[test]
    fn lookback_parses_both_forms() {
        let days: Lookback = serde_json::from_str(r#"{"days": 45}"#).unwrap();
        assert_eq!(days, Lookback::Days { days: 45 });
        let named: Lookback = serde_json::from_str(r#""6M""#).unwrap();
        assert_eq!(named, Lookback::Named(NamedRange::SixMonths));
        assert_eq!(named.days(), Some(180));
        assert_eq!(Lookback::Named(NamedRange::All).days(), None);
    }

    #[test]
    fn window_keeps_trailing_days() {
        let a = series(100, |i| 100.0 + i as f64);
        let b = series(100, |_| 10.0);
        let aligned = SeriesAligner::default().align(&a, &b);

        let window = Lookback::Days { days: 30 }.window(&aligned);
        assert_eq!(window.len(), 30);
        assert_eq!(window.last(), aligned.last());

        assert_eq!(Lookback::Named(NamedRange::All).window(&aligned).len(), 100);
        assert_eq!(Lookback::Named(NamedRange::OneYear).window(&aligned).len(), 100);
        assert!(Lookback::default().window(&[]).is_empty());
    }

    #[test]
    fn correlated_pair_report() {
        let a = series(60, |i| 100.0 + i as f64 * 2.0);
        let b = series(60, |i| 50.0 + i as f64);
        let report = analyze_pair(
            &SeriesAligner::default(),
            ("ETHUSDT", &a),
            ("BTCUSDT", &b),
            Lookback::Days { days: 30 },
            false,
        );

        assert!(report.has_data());
        assert_eq!(report.points.len(), 30);
        assert!((report.correlation.unwrap() - 1.0).abs() < 1e-9);
        let ranges = report.ranges.unwrap();
        assert!((ranges.current - 2.0).abs() < 1e-12);
        assert!(!ranges.inverted);
    }

    #[test]
    fn inverted_report_quotes_reciprocal() {
        let a = series(40, |i| 100.0 + i as f64);
        let b = series(40, |i| 10.0 + (i % 3) as f64);
        let aligner = SeriesAligner::default();
        let lookback = Lookback::Named(NamedRange::All);

        let normal = analyze_pair(&aligner, ("A", &a), ("B", &b), lookback, false);
        let inverted = analyze_pair(&aligner, ("A", &a), ("B", &b), lookback, true);

        let (n, i) = (normal.ranges.unwrap(), inverted.ranges.unwrap());
        assert!(i.inverted);
        assert!((i.current - 1.0 / n.current).abs() < 1e-12);
        assert_eq!(normal.correlation, inverted.correlation);
    }

    #[test]
    fn disjoint_pair_has_no_result() {
        let a = series(10, |_| 1.0);
        let b: Vec<PricePoint> = series(10, |_| 1.0)
            .into_iter()
            .map(|p| PricePoint { time: p.time + 100 * DAY_MS, ..p })
            .collect();
        let report = analyze_pair(
            &SeriesAligner::default(),
            ("A", &a),
            ("B", &b),
            Lookback::default(),
            false,
        );
        assert!(!report.has_data());
        assert_eq!(report.correlation, None);
        assert_eq!(report.ranges, None);
    }
}
