use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub monitor: MonitorConfig,
    pub strategy: StrategyConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,
    pub tickers: Vec<String>,
    /// Lower bound of the per-round delay, milliseconds.
    pub min_round_delay_ms: u64,
    /// Upper bound of the per-round delay, milliseconds.
    pub max_round_delay_ms: u64,
    pub initial_price_min: f64,
    pub initial_price_max: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            tickers: default_tickers(),
            min_round_delay_ms: 1_000,
            max_round_delay_ms: 3_000,
            initial_price_min: 100.0,
            initial_price_max: 500.0,
        }
    }
}

fn default_tickers() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "TSLA", "AMZN", "META", "NVDA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub server_url: String,
    /// Alert when the 1-minute endpoint-to-endpoint change reaches this many
    /// percent.
    pub change_threshold_pct: f64,
    pub max_connect_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8001/ws".to_string(),
            change_threshold_pct: 2.0,
            max_connect_attempts: 5,
            retry_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            short_period: 50,
            long_period: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// How often the rolling-average task runs, seconds.
    pub average_interval_secs: u64,
    /// Trailing window each rolling average covers, seconds.
    pub average_window_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "data/market_pulse.sqlite".to_string(),
            average_interval_secs: 300,
            average_window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults; a present but invalid file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&config_str)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.feed.tickers.is_empty() {
            bail!("feed.tickers must not be empty");
        }
        if self.feed.min_round_delay_ms > self.feed.max_round_delay_ms {
            bail!("feed.min_round_delay_ms must be <= feed.max_round_delay_ms");
        }
        if self.feed.initial_price_min <= 0.0
            || self.feed.initial_price_min > self.feed.initial_price_max
        {
            bail!("feed initial price range must be positive and ordered");
        }
        if self.monitor.change_threshold_pct <= 0.0 {
            bail!("monitor.change_threshold_pct must be > 0");
        }
        Ok(())
    }
}
