//! Concentrated-liquidity price ranges derived from a pair's ratio history.

use serde::{Deserialize, Serialize};

use crate::stats;

/// Buffer around the historical span for the conservative range.
const CONSERVATIVE_BUFFER: f64 = 0.05;
/// Acquisition range starts this far above the live ratio (25 bps).
const ACQUISITION_ENTRY_OFFSET: f64 = 0.0025;
/// An acquisition range narrower than this is widened.
const ACQUISITION_MIN_WIDTH: f64 = 0.005;
/// Width the acquisition range is widened to.
const ACQUISITION_FALLBACK_WIDTH: f64 = 0.05;
/// Lowest aggressive bound as a fraction of the live ratio; keeps the band
/// strictly positive so its reciprocal is still ordered.
const AGGRESSIVE_FLOOR: f64 = f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn width_pct(&self) -> f64 {
        (self.max / self.min - 1.0) * 100.0
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }

    /// The same band quoted in the reciprocal price.
    pub fn invert(&self) -> Self {
        Self {
            min: 1.0 / self.max,
            max: 1.0 / self.min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityRangeMetrics {
    /// Latest ratio.
    pub current: f64,
    /// Historical minimum ratio.
    pub min: f64,
    /// Historical maximum ratio.
    pub max: f64,
    /// Coefficient of variation in percent.
    pub volatility: f64,
    /// Historical span with a 5% buffer on each side.
    pub conservative: PriceRange,
    /// One standard deviation around the live ratio, floored above zero.
    pub aggressive: PriceRange,
    /// One-way conversion band from just above the live ratio.
    pub acquisition: PriceRange,
    /// Whether the ratios are quoted as B/A instead of A/B.
    #[serde(default)]
    pub inverted: bool,
}

impl LiquidityRangeMetrics {
    /// Derives the metrics from chronological A/B ratios. `None` for an empty
    /// history or one whose mean is not a positive number.
    pub fn from_ratios(ratios: &[f64]) -> Option<Self> {
        let current = *ratios.last()?;
        let stats::Dispersion { mean, std_dev } = stats::standard_deviation(ratios)?;
        if !(mean.is_finite() && mean > 0.0) {
            return None;
        }

        let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let acquisition_min = current * (1.0 + ACQUISITION_ENTRY_OFFSET);
        let mut acquisition_max = current + 2.0 * std_dev;
        if acquisition_max <= acquisition_min * (1.0 + ACQUISITION_MIN_WIDTH) {
            acquisition_max = acquisition_min * (1.0 + ACQUISITION_FALLBACK_WIDTH);
        }

        Some(Self {
            current,
            min,
            max,
            volatility: std_dev / mean * 100.0,
            conservative: PriceRange {
                min: min * (1.0 - CONSERVATIVE_BUFFER),
                max: max * (1.0 + CONSERVATIVE_BUFFER),
            },
            aggressive: PriceRange {
                min: (current - std_dev).max(current * AGGRESSIVE_FLOOR),
                max: current + std_dev,
            },
            acquisition: PriceRange {
                min: acquisition_min,
                max: acquisition_max,
            },
            inverted: false,
        })
    }

    /// Reciprocal view of the same metrics: every level becomes `1/x` and each
    /// range swaps its ends. Volatility is a ratio of the original history and
    /// is carried over unchanged, so inverting twice gives back the original.
    pub fn invert(&self) -> Self {
        Self {
            current: 1.0 / self.current,
            min: 1.0 / self.max,
            max: 1.0 / self.min,
            volatility: self.volatility,
            conservative: self.conservative.invert(),
            aggressive: self.aggressive.invert(),
            acquisition: self.acquisition.invert(),
            inverted: !self.inverted,
        }
    }

    /// Returns the view quoted in the requested direction.
    pub fn oriented(&self, inverted: bool) -> Self {
        if self.inverted == inverted { *self } else { self.invert() }
    }
}
