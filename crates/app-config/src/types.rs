// In crates/app-config/src/types.rs

use std::time::Duration;

use serde::Deserialize;

use core_types::{ScanRequest, Timeframe};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Market data API access.
    #[serde(default)]
    pub alpaca: AlpacaSettings,
    /// Timeouts, retries and the fetch pool.
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    /// Refresh cadence and the default scan.
    #[serde(default)]
    pub scanner: ScannerSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AlpacaSettings {
    /// Base URL of the market data API.
    #[serde(default = "default_data_url")]
    pub data_url: String,
    /// Data feed to request bars from ("iex" or "sip").
    #[serde(default = "default_feed")]
    pub feed: String,
    #[serde(default)]
    pub api_key_id: Option<String>,
    #[serde(default)]
    pub api_secret_key: Option<String>,
    /// Symbol fetched by the connectivity check.
    #[serde(default = "default_probe_symbol")]
    pub probe_symbol: String,
}

impl AlpacaSettings {
    /// The key pair from settings, falling back to the `APCA_API_KEY_ID` and
    /// `APCA_API_SECRET_KEY` environment variables. `None` unless both are
    /// present and non-empty.
    pub fn credentials(&self) -> Option<(String, String)> {
        let key = non_empty(self.api_key_id.clone()).or_else(|| env_var("APCA_API_KEY_ID"))?;
        let secret =
            non_empty(self.api_secret_key.clone()).or_else(|| env_var("APCA_API_SECRET_KEY"))?;
        Some((key, secret))
    }
}

impl Default for AlpacaSettings {
    fn default() -> Self {
        Self {
            data_url: default_data_url(),
            feed: default_feed(),
            api_key_id: None,
            api_secret_key: None,
            probe_symbol: default_probe_symbol(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AcquisitionSettings {
    /// Upper bound on concurrent provider calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-call timeout; each retry gets a fresh one.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Attempts per symbol, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff delays never exceed `base_delay_ms` times this.
    #[serde(default = "default_max_delay_multiplier")]
    pub max_delay_multiplier: u32,
}

impl AcquisitionSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_timeout_ms: default_request_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_multiplier: default_max_delay_multiplier(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScannerSettings {
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_timeframe")]
    pub timeframe: Timeframe,
    /// Falls back to the timeframe's default limit.
    #[serde(default)]
    pub bar_limit: Option<usize>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub strategies: Vec<String>,
}

impl ScannerSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// The scan described by this section, before validation.
    pub fn default_request(&self) -> ScanRequest {
        ScanRequest::new(
            self.symbols.iter().cloned(),
            self.strategies.iter().cloned(),
            self.timeframe,
            self.bar_limit
                .unwrap_or_else(|| self.timeframe.default_bar_limit()),
        )
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            timeframe: default_timeframe(),
            bar_limit: None,
            symbols: Vec::new(),
            strategies: Vec::new(),
        }
    }
}

// --- Scan request files ---

/// A scan request as written in a TOML file. Anything left out is taken
/// from the `[scanner]` settings.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScanRequestFile {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default, alias = "strategy_ids")]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
    #[serde(default)]
    pub bar_limit: Option<usize>,
}

impl ScanRequestFile {
    /// Fills gaps from `defaults` and validates the result.
    pub fn resolve(self, defaults: &ScannerSettings) -> crate::Result<ScanRequest> {
        Ok(self.into_request(defaults).validated()?)
    }

    pub fn into_request(self, defaults: &ScannerSettings) -> ScanRequest {
        let timeframe = self.timeframe.unwrap_or(defaults.timeframe);
        let bar_limit = self
            .bar_limit
            .or(defaults.bar_limit)
            .unwrap_or_else(|| timeframe.default_bar_limit());
        let symbols = if self.symbols.is_empty() {
            defaults.symbols.clone()
        } else {
            self.symbols
        };
        let strategies = if self.strategies.is_empty() {
            defaults.strategies.clone()
        } else {
            self.strategies
        };
        ScanRequest::new(symbols, strategies, timeframe, bar_limit)
    }
}

// --- Serde defaults ---

fn default_environment() -> String {
    "development".into()
}

fn default_log_level() -> String {
    "info".into()
}

fn default_data_url() -> String {
    "https://data.alpaca.markets".into()
}

fn default_feed() -> String {
    "iex".into()
}

fn default_probe_symbol() -> String {
    "SPY".into()
}

fn default_concurrency() -> usize {
    4
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_multiplier() -> u32 {
    4
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_timeframe() -> Timeframe {
    Timeframe::FiveMinutes
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_var(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}
