//! Floor-trader support and resistance levels.

use serde::{Deserialize, Serialize};

/// Classic floor-trader levels from a completed period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pivots {
    pub pp: f64,
    pub s1: f64,
    pub r1: f64,
}

impl Pivots {
    pub fn classic(high: f64, low: f64, close: f64) -> Self {
        let pp = (high + low + close) / 3.0;
        Self {
            pp,
            s1: 2.0 * pp - high,
            r1: 2.0 * pp - low,
        }
    }
}
