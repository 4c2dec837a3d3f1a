use crate::align::SeriesAligner;
use crate::candle::{Candle, PricePoint};
use crate::klines::SymbolKlines;
use crate::pair::{self, PairReport};
use crate::storage_utils::{AppConfig, AssetClass, AsyncStorageManager};
use crate::timeframe::{MarketData, Timeframe};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// --- Data Structures ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetReport {
    pub symbol: String,
    pub class: AssetClass,
    /// `None` when the daily history is too short to analyze.
    pub market: Option<MarketData>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct OutputData {
    pub last_updated_timestamp: i64,
    pub assets: Vec<AssetReport>,
    pub pairs: Vec<PairReport>,
}

// --- Domain Logic ---

fn converted(candles: &[Candle], rate: Option<f64>) -> Vec<Candle> {
    match rate {
        Some(rate) if rate.is_finite() && rate > 0.0 => candles.iter().map(|c| c.convert(rate)).collect(),
        _ => candles.to_vec(),
    }
}

/// Runs the analytics over downloaded klines. Assets missing from `klines`
/// are reported with no market data; pairs referencing them have no points.
pub fn build_report(config: &AppConfig, klines: &[SymbolKlines]) -> OutputData {
    let prepared: Vec<SymbolKlines> = klines
        .iter()
        .map(|k| {
            let rate = config.asset(&k.symbol).and_then(|a| a.conversion_rate);
            SymbolKlines {
                symbol: k.symbol.clone(),
                class: k.class,
                daily: converted(&k.daily, rate),
                weekly: converted(&k.weekly, rate),
                monthly: converted(&k.monthly, rate),
            }
        })
        .collect();
    let find = |symbol: &str| prepared.iter().find(|k| k.symbol == symbol);

    let assets: Vec<AssetReport> = config
        .assets
        .iter()
        .map(|asset| {
            let market = find(&asset.symbol).and_then(|k| {
                MarketData::from_series(
                    k.series(Timeframe::Daily),
                    k.series(Timeframe::Weekly),
                    k.series(Timeframe::Monthly),
                )
            });
            if market.is_none() {
                tracing::info!(symbol = %asset.symbol, "insufficient data");
            }
            AssetReport {
                symbol: asset.symbol.clone(),
                class: asset.class,
                market,
            }
        })
        .collect();

    let aligner = SeriesAligner::from_offset_minutes(config.day_offset_minutes);
    let points = |symbol: &str| -> Vec<PricePoint> {
        find(symbol)
            .map(|k| k.daily.iter().map(PricePoint::from).collect())
            .unwrap_or_default()
    };

    let pairs = config
        .pairs
        .iter()
        .map(|p| {
            let (base, quote) = (points(&p.base), points(&p.quote));
            pair::analyze_pair(
                &aligner,
                (&p.base, &base),
                (&p.quote, &quote),
                p.lookback,
                p.inverted,
            )
        })
        .collect();

    let last_updated_timestamp = prepared
        .iter()
        .filter_map(|k| k.daily.last().map(|c| c.time))
        .max()
        .unwrap_or_default();

    OutputData {
        last_updated_timestamp,
        assets,
        pairs,
    }
}

// --- Main Execution ---

pub async fn run(config: &AppConfig) -> Result<()> {
    let storage = AsyncStorageManager::new_relative("storage").await?;

    let klines: Vec<SymbolKlines> = match storage.load("klines").await {
        Ok(data) => data,
        Err(e) => {
            // nothing downloaded yet; the renderers show an empty state
            tracing::warn!(error = %e, "no stored klines");
            return Ok(());
        }
    };

    let output_data = build_report(config, &klines);
    tracing::info!(
        assets = output_data.assets.len(),
        pairs = output_data.pairs.len(),
        "analysis complete"
    );

    storage
        .save("results", &output_data)
        .await
        .context("Failed to save results")?;

    Ok(())
}
