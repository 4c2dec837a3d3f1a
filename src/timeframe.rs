//! Per-timeframe technical summary: MA20, RSI-14, stage and pivots.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candle::Candle;
use crate::indicators::{self, MA_PERIOD, RSI_PERIOD};
use crate::pivots::Pivots;
use crate::stage::{self, Stage};

/// Minimum candles before a timeframe is analyzed. MA20 plus the previous MA20
/// need 21, RSI-14 needs 15; the rest is margin.
pub const MIN_CANDLES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Kline interval code understood by the exchange endpoint.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Daily => "D",
            Timeframe::Weekly => "W",
            Timeframe::Monthly => "M",
        }
    }

    pub fn all() -> &'static [Timeframe] {
        &[Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeAnalysis {
    /// Latest close.
    pub price: f64,
    pub ma20: f64,
    pub prev_ma20: f64,
    pub rsi: f64,
    pub stage: Stage,
    /// Levels from the previous completed candle.
    pub pivots: Pivots,
}

/// Analyses for one asset. Weekly and monthly are optional because upstream
/// history for them is often too thin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub daily: TimeframeAnalysis,
    pub weekly: Option<TimeframeAnalysis>,
    pub monthly: Option<TimeframeAnalysis>,
}

impl MarketData {
    /// Builds the aggregate; `None` when the daily series cannot be analyzed.
    pub fn from_series(daily: &[Candle], weekly: &[Candle], monthly: &[Candle]) -> Option<Self> {
        Some(Self {
            daily: analyze(daily)?,
            weekly: analyze(weekly),
            monthly: analyze(monthly),
        })
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeframeAnalysis> {
        match timeframe {
            Timeframe::Daily => Some(&self.daily),
            Timeframe::Weekly => self.weekly.as_ref(),
            Timeframe::Monthly => self.monthly.as_ref(),
        }
    }
}

/// Why a timeframe could not be analyzed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("insufficient data: need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Timestamps must be strictly increasing; pivots and slope are meaningless otherwise.
    #[error("candle {index} is not after its predecessor")]
    Unordered { index: usize },

    #[error("candle {index} has a non-finite price")]
    InvalidPrice { index: usize },
}

/// Analyzes one candle series, oldest first. `None` means the timeframe is
/// unavailable, which is a normal outcome for thin weekly/monthly history.
pub fn analyze(candles: &[Candle]) -> Option<TimeframeAnalysis> {
    match try_analyze(candles) {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::debug!(error = %e, "timeframe unavailable");
            None
        }
    }
}

pub fn try_analyze(candles: &[Candle]) -> Result<TimeframeAnalysis, AnalysisError> {
    if candles.len() < MIN_CANDLES {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_CANDLES,
            got: candles.len(),
        });
    }

    for (i, pair) in candles.windows(2).enumerate() {
        if pair[1].time <= pair[0].time {
            return Err(AnalysisError::Unordered { index: i + 1 });
        }
    }

    if let Some(index) = candles
        .iter()
        .position(|c| ![c.open, c.high, c.low, c.close].iter().all(|v| v.is_finite()))
    {
        return Err(AnalysisError::InvalidPrice { index });
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let insufficient = || AnalysisError::InsufficientData {
        needed: MA_PERIOD + 1,
        got: closes.len(),
    };

    let ma20 = indicators::sma(&closes, MA_PERIOD).ok_or_else(insufficient)?;
    let prev_ma20 =
        indicators::sma(&closes[..closes.len() - 1], MA_PERIOD).ok_or_else(insufficient)?;

    let price = closes[closes.len() - 1];
    let previous = &candles[candles.len() - 2];

    Ok(TimeframeAnalysis {
        price,
        ma20,
        prev_ma20,
        rsi: indicators::rsi(&closes, RSI_PERIOD),
        stage: stage::classify(price, ma20, prev_ma20),
        pivots: Pivots::classic(previous.high, previous.low, previous.close),
    })
}
