//! Four-state trend classification from price position and MA20 slope.

use serde::{Deserialize, Serialize};

/// Slope dead-band as a fraction of the MA20 level (5 basis points).
pub const SLOPE_THRESHOLD_RATIO: f64 = 0.0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "StageRecord", try_from = "StageRecord")]
pub enum Stage {
    Accumulation,
    Bullish,
    Distribution,
    Bearish,
}

impl Stage {
    pub fn id(&self) -> u8 {
        match self {
            Stage::Accumulation => 1,
            Stage::Bullish => 2,
            Stage::Distribution => 3,
            Stage::Bearish => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Stage::Accumulation),
            2 => Some(Stage::Bullish),
            3 => Some(Stage::Distribution),
            4 => Some(Stage::Bearish),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Accumulation => "Accumulation",
            Stage::Bullish => "Bullish",
            Stage::Distribution => "Distribution",
            Stage::Bearish => "Bearish",
        }
    }

    /// What a holder is expected to do in this stage.
    pub fn action(&self) -> &'static str {
        match self {
            Stage::Accumulation => "Build position",
            Stage::Bullish => "Hold / add on dips",
            Stage::Distribution => "Take profit",
            Stage::Bearish => "Stay out",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[
            Stage::Accumulation,
            Stage::Bullish,
            Stage::Distribution,
            Stage::Bearish,
        ]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

/// Classifies the trend stage. The checks form a decision list and are
/// evaluated in this order:
///
/// 1. slope above the dead-band and price above MA20: [`Stage::Bullish`]
/// 2. slope below the negative dead-band and price below MA20: [`Stage::Bearish`]
/// 3. slope strictly inside the dead-band: [`Stage::Accumulation`]
/// 4. anything else: [`Stage::Distribution`]
pub fn classify(price: f64, ma20: f64, prev_ma20: f64) -> Stage {
    let slope = ma20 - prev_ma20;
    let threshold = ma20 * SLOPE_THRESHOLD_RATIO;

    if slope > threshold && price > ma20 {
        Stage::Bullish
    } else if slope < -threshold && price < ma20 {
        Stage::Bearish
    } else if slope.abs() < threshold {
        Stage::Accumulation
    } else {
        Stage::Distribution
    }
}

// --- Wire form: {id, name, action} ---

#[derive(Serialize, Deserialize)]
struct StageRecord {
    id: u8,
    name: String,
    action: String,
}

impl From<Stage> for StageRecord {
    fn from(stage: Stage) -> Self {
        Self {
            id: stage.id(),
            name: stage.name().to_string(),
            action: stage.action().to_string(),
        }
    }
}

impl TryFrom<StageRecord> for Stage {
    type Error = String;

    fn try_from(record: StageRecord) -> Result<Self, Self::Error> {
        Stage::from_id(record.id).ok_or_else(|| format!("unknown stage id {}", record.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_ma_with_price_above_is_bullish() {
        assert_eq!(classify(105.0, 100.0, 99.0), Stage::Bullish);
    }

    #[test]
    fn falling_ma_with_price_below_is_bearish() {
        assert_eq!(classify(95.0, 100.0, 101.0), Stage::Bearish);
    }

    #[test]
    fn flat_ma_is_accumulation_regardless_of_price() {
        // threshold = 0.05, slope = 0.01
        assert_eq!(classify(120.0, 100.0, 99.99), Stage::Accumulation);
        assert_eq!(classify(80.0, 100.0, 100.01), Stage::Accumulation);
    }

    #[test]
    fn falling_ma_with_price_above_is_distribution() {
        // slope = -0.1, beyond the 0.05 dead-band, but price sits above MA20
        assert_eq!(classify(101.0, 100.0, 100.1), Stage::Distribution);
    }

    #[test]
    fn rising_ma_with_price_below_is_distribution() {
        assert_eq!(classify(99.0, 100.0, 99.0), Stage::Distribution);
    }

    #[test]
    fn slope_exactly_on_threshold_is_distribution() {
        // |slope| == threshold is neither strictly inside nor strictly outside
        assert_eq!(classify(100.0, 1000.0, 999.5), Stage::Distribution);
    }

    #[test]
    fn threshold_scales_with_price_level() {
        // the same absolute slope is flat for a large MA and steep for a small one
        assert_eq!(classify(60_000.0, 50_000.0, 49_999.0), Stage::Accumulation);
        assert_eq!(classify(0.6, 0.5, 0.499), Stage::Bullish);
    }

    #[test]
    fn ids_round_trip_and_serialize_as_record() {
        for stage in Stage::all() {
            assert_eq!(Stage::from_id(stage.id()), Some(*stage));
        }
        assert_eq!(Stage::from_id(0), None);

        let json = serde_json::to_value(Stage::Bullish).unwrap();
        assert_eq!(json["id"], 2);
        assert_eq!(json["name"], "Bullish");
        let back: Stage = serde_json::from_value(json).unwrap();
        assert_eq!(back, Stage::Bullish);
    }
}
