//! Date-keyed inner join of two price series.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::candle::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeriesPoint {
    pub date: NaiveDate,
    pub price_a: f64,
    pub price_b: f64,
    /// `price_a / price_b`
    pub ratio: f64,
    /// `price_a` as a percentage of the first aligned `price_a`.
    pub norm_a: f64,
    /// `price_b` as a percentage of the first aligned `price_b`.
    pub norm_b: f64,
}

/// Matches two series on calendar day, with the day boundary taken in a fixed
/// reference offset (UTC by default).
#[derive(Debug, Clone, Copy)]
pub struct SeriesAligner {
    offset: FixedOffset,
}

impl Default for SeriesAligner {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl SeriesAligner {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds an aligner from an offset in minutes east of UTC; out-of-range
    /// offsets fall back to UTC.
    pub fn from_offset_minutes(minutes: i32) -> Self {
        FixedOffset::east_opt(minutes.saturating_mul(60))
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn date_key(&self, time_ms: i64) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(time_ms).map(|dt| dt.with_timezone(&self.offset).date_naive())
    }

    /// Emits one point per date present in both series, in `a`'s order.
    ///
    /// When a series has several samples on the same day, `b` keeps its last
    /// one and `a` its first, so the output is never longer than either input.
    /// Samples with a non-positive or non-finite close are ignored.
    pub fn align(&self, a: &[PricePoint], b: &[PricePoint]) -> Vec<AlignedSeriesPoint> {
        let lookup: HashMap<NaiveDate, f64> = b
            .iter()
            .filter(|p| usable(p.close))
            .filter_map(|p| Some((self.date_key(p.time)?, p.close)))
            .collect();

        let mut seen = HashSet::new();
        let mut aligned = Vec::with_capacity(a.len().min(lookup.len()));
        let mut base: Option<(f64, f64)> = None;

        for point in a.iter().filter(|p| usable(p.close)) {
            let Some(date) = self.date_key(point.time) else {
                continue;
            };
            let Some(&close_b) = lookup.get(&date) else {
                continue;
            };
            if !seen.insert(date) {
                continue;
            }

            let (base_a, base_b) = *base.get_or_insert((point.close, close_b));
            aligned.push(AlignedSeriesPoint {
                date,
                price_a: point.close,
                price_b: close_b,
                ratio: point.close / close_b,
                norm_a: point.close / base_a * 100.0,
                norm_b: close_b / base_b * 100.0,
            });
        }

        aligned
    }
}

fn usable(close: f64) -> bool {
    close.is_finite() && close > 0.0
}
