use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::pair::Lookback;

// CONFIGURATION STRUCTS
// storage/config.json deserializes straight into these types.

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KlineConfig {
    pub limit: u32,       // candles per timeframe, e.g. 200
    pub base_url: String, // Binance-compatible klines endpoint
}

impl Default for KlineConfig {
    fn default() -> Self {
        Self {
            limit: 200,
            base_url: "https://api.binance.com/api/v3/klines".to_string(),
        }
    }
}

/// Only used to label assets in the output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    #[default]
    Crypto,
    Stock,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Crypto => write!(f, "crypto"),
            AssetClass::Stock => write!(f, "stock"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub symbol: String,
    #[serde(default)]
    pub class: AssetClass,
    /// Display-currency units per quote unit; prices are multiplied by it.
    #[serde(default)]
    pub conversion_rate: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PairConfig {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub lookback: Lookback,
    #[serde(default)]
    pub inverted: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub klines: KlineConfig,
    pub assets: Vec<AssetConfig>,
    #[serde(default)]
    pub pairs: Vec<PairConfig>,
    /// Minutes east of UTC where a calendar day starts for pair alignment.
    #[serde(default)]
    pub day_offset_minutes: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let asset = |symbol: &str| AssetConfig {
            symbol: symbol.to_string(),
            class: AssetClass::Crypto,
            conversion_rate: None,
        };
        Self {
            klines: KlineConfig::default(),
            assets: vec![asset("BTCUSDT"), asset("ETHUSDT"), asset("SOLUSDT")],
            pairs: vec![
                PairConfig {
                    base: "ETHUSDT".to_string(),
                    quote: "BTCUSDT".to_string(),
                    lookback: Lookback::default(),
                    inverted: false,
                },
                PairConfig {
                    base: "SOLUSDT".to_string(),
                    quote: "ETHUSDT".to_string(),
                    lookback: Lookback::default(),
                    inverted: false,
                },
            ],
            day_offset_minutes: 0,
        }
    }
}

impl AppConfig {
    pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
        self.assets.iter().find(|a| a.symbol == symbol)
    }
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path to the storage directory (e.g. ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Creates a manager rooted next to the running executable.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        Self::new(base_dir).await
    }

    /// Creates a manager rooted at `base_dir`, creating the directory up front
    /// so later saves never have to check for it.
    pub async fn new<P: Into<PathBuf>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }
        Ok(Self { base_dir })
    }

    /// Serializes `data` to `<filename>.json` through a temp file and a rename,
    /// so a crash mid-write leaves the previous file intact.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let file_name = format!("{}.json", filename);
        let final_path = self.base_dir.join(&file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        fs::write(&tmp_path, json_bytes).await?;
        fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));

        // serde_json validates UTF-8 itself, so read raw bytes.
        let content = fs::read(path).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.base_dir.join(format!("{}.json", filename)).exists()
    }

    /// Loads the app config, writing the default one on first run.
    pub async fn load_config(&self) -> anyhow::Result<AppConfig> {
        if !self.exists("config") {
            let config = AppConfig::default();
            self.save("config", &config).await?;
            tracing::info!(path = ?self.base_dir.join("config.json"), "wrote default config");
            return Ok(config);
        }
        self.load("config").await
    }
}
