//! Multi-timeframe trend stages and pair liquidity ranges for a market screener.
//!
//! The analytics modules (`indicators`, `stage`, `pivots`, `timeframe`,
//! `align`, `stats`, `liquidity`, `pair`) are pure functions over in-memory
//! series. The remaining modules fetch klines, persist results and render them.

pub mod align;
pub mod analysis;
pub mod candle;
pub mod comfy_table;
pub mod indicators;
pub mod klines;
pub mod liquidity;
pub mod pair;
pub mod pivots;
pub mod screener;
pub mod stage;
pub mod stats;
pub mod storage_utils;
pub mod timeframe;
pub mod tui;

pub use candle::{Candle, PricePoint};
pub use liquidity::LiquidityRangeMetrics;
pub use stage::Stage;
pub use timeframe::{MarketData, TimeframeAnalysis, analyze};
