//! The fetch-then-analyze pipeline shared by the CLI and the TUI refresh.

use crate::{klines, screener, storage_utils::AsyncStorageManager};
use anyhow::{Context, Result};

/// Runs the full analysis pipeline:
/// 1. Loads (or initializes) the app config.
/// 2. Fetches daily/weekly/monthly klines for each configured asset.
/// 3. Computes stages, RSI, pivots and pair metrics into `results.json`.
pub async fn run_analysis_pipeline() -> Result<()> {
    let storage = AsyncStorageManager::new_relative("storage").await?;
    let app_config = storage.load_config().await.context("Failed to load config")?;

    klines::run(&app_config).await.context("Failed to fetch klines")?;

    screener::run(&app_config).await?;

    Ok(())
}
