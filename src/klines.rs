use crate::candle::Candle;
use crate::storage_utils::{AppConfig, AssetClass, AssetConfig, AsyncStorageManager};
use crate::timeframe::Timeframe;
use anyhow::{Context, Result, bail};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Request weight allowed per minute before batches are spaced out.
const WEIGHT_BUDGET_PER_MINUTE: u32 = 2400;

static BAN_UNTIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"until\s+(\d+)").expect("static regex"));

/// Raw candles for one asset, oldest first, as stored in `klines.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SymbolKlines {
    pub symbol: String,
    #[serde(default)]
    pub class: AssetClass,
    #[serde(default)]
    pub daily: Vec<Candle>,
    #[serde(default)]
    pub weekly: Vec<Candle>,
    #[serde(default)]
    pub monthly: Vec<Candle>,
}

impl SymbolKlines {
    pub fn series(&self, timeframe: Timeframe) -> &[Candle] {
        match timeframe {
            Timeframe::Daily => &self.daily,
            Timeframe::Weekly => &self.weekly,
            Timeframe::Monthly => &self.monthly,
        }
    }

    fn series_mut(&mut self, timeframe: Timeframe) -> &mut Vec<Candle> {
        match timeframe {
            Timeframe::Daily => &mut self.daily,
            Timeframe::Weekly => &mut self.weekly,
            Timeframe::Monthly => &mut self.monthly,
        }
    }
}

fn calculate_request_weight(limit: u32) -> u32 {
    match limit {
        0..=99 => 1,
        100..=499 => 2,
        500..=1000 => 5,
        _ => 10,
    }
}

/// Milliseconds left on an IP ban announced in a 418/429 body, if any.
fn ban_wait_ms(body: &str, now_ms: u64) -> Option<u64> {
    if !body.contains("-1003") {
        return None;
    }
    let ban_until: u64 = BAN_UNTIL.captures(body)?.get(1)?.as_str().parse().ok()?;
    ban_until.checked_sub(now_ms).filter(|&wait| wait > 0)
}

async fn fetch_series(
    client: &Client,
    base_url: &str,
    symbol: &str,
    timeframe: Timeframe,
    limit: u32,
) -> Result<Vec<Candle>> {
    let limit = limit.to_string();
    let query = [
        ("symbol", symbol),
        ("interval", timeframe.interval()),
        ("limit", limit.as_str()),
    ];

    let response = client
        .get(base_url)
        .query(&query)
        .send()
        .await
        .with_context(|| format!("kline request for {symbol} {} failed", timeframe.interval()))?;

    let status = response.status();
    if status == StatusCode::IM_A_TEAPOT || status == StatusCode::TOO_MANY_REQUESTS {
        let body = response.text().await.unwrap_or_default();
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        if let Some(wait_ms) = ban_wait_ms(&body, now_ms) {
            tracing::warn!(symbol, wait_ms, "rate limited, waiting out the ban");
            tokio::time::sleep(Duration::from_millis(wait_ms) + Duration::from_secs(5)).await;
        }
        bail!("rate limited on {symbol} ({status})");
    }

    if !status.is_success() {
        bail!("kline request for {symbol} returned {status}");
    }

    response
        .json::<Vec<Candle>>()
        .await
        .with_context(|| format!("malformed klines for {symbol}"))
}

/// Downloads daily, weekly and monthly candles for every configured asset.
/// Failed requests are logged and leave that series empty.
pub async fn fetch_all(config: &AppConfig) -> Result<Vec<SymbolKlines>> {
    let client = Client::builder().pool_max_idle_per_host(50).build()?;

    let requests: Vec<(&AssetConfig, Timeframe)> = config
        .assets
        .iter()
        .flat_map(|asset| Timeframe::all().iter().map(move |&tf| (asset, tf)))
        .collect();

    let weight_per_req = calculate_request_weight(config.klines.limit);
    let safe_capacity = (WEIGHT_BUDGET_PER_MINUTE as f64 * 0.90) as u32;
    let batch_size = std::cmp::max(1, safe_capacity / weight_per_req) as usize;

    let mut all_results: Vec<SymbolKlines> = config
        .assets
        .iter()
        .map(|asset| SymbolKlines {
            symbol: asset.symbol.clone(),
            class: asset.class,
            ..Default::default()
        })
        .collect();

    for (i, batch) in requests.chunks(batch_size).enumerate() {
        let start_time = Instant::now();

        let tasks: Vec<_> = batch
            .iter()
            .map(|(asset, tf)| {
                fetch_series(&client, &config.klines.base_url, &asset.symbol, *tf, config.klines.limit)
            })
            .collect();
        let results = futures::future::join_all(tasks).await;

        for ((asset, tf), result) in batch.iter().zip(results) {
            match result {
                Ok(candles) => {
                    tracing::debug!(symbol = %asset.symbol, interval = tf.interval(), count = candles.len(), "klines fetched");
                    if let Some(entry) = all_results.iter_mut().find(|e| e.symbol == asset.symbol) {
                        *entry.series_mut(*tf) = candles;
                    }
                }
                Err(e) => {
                    tracing::warn!(symbol = %asset.symbol, interval = tf.interval(), error = %e, "skipping series");
                }
            }
        }

        if i * batch_size + batch.len() < requests.len() {
            let elapsed = start_time.elapsed();
            if elapsed.as_secs() < 60 {
                tokio::time::sleep(Duration::from_secs(62) - elapsed).await;
            }
        }
    }

    Ok(all_results)
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let storage = AsyncStorageManager::new_relative("storage").await?;
    let all_results = fetch_all(config).await?;
    tracing::info!(assets = all_results.len(), "saving klines");
    storage.save("klines", &all_results).await?;
    Ok(())
}
