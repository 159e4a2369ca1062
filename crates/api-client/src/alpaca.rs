// In crates/api-client/src/alpaca.rs

use app_config::AlpacaSettings;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use core_types::{RawBar, Timeframe};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{AcquisitionError, Result};
use crate::provider::BarProvider;

/// Minutes in a regular US equity session.
const SESSION_MINUTES: i64 = 390;
/// Calendar days added to every look-back window to cover weekends and holidays.
const LOOKBACK_PADDING_DAYS: i64 = 4;

/// Stock bars from the Alpaca market data REST API.
pub struct AlpacaProvider {
    client: Client,
    data_url: String,
    feed: String,
    probe_symbol: String,
    api_key: SecretString,
    secret_key: SecretString,
}

impl AlpacaProvider {
    /// Builds a provider from settings. Keys come from the settings or the
    /// `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY` environment variables.
    pub fn new(settings: &AlpacaSettings) -> Result<Self> {
        let (key, secret) = settings.credentials().ok_or_else(|| {
            AcquisitionError::Config("Alpaca API key id and secret key are not set".into())
        })?;
        let client = Client::builder()
            .user_agent(concat!("signal-scanner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AcquisitionError::Config(e.to_string()))?;

        Ok(Self {
            client,
            data_url: settings.data_url.trim_end_matches('/').to_string(),
            feed: settings.feed.clone(),
            probe_symbol: settings.probe_symbol.clone(),
            api_key: SecretString::from(key),
            secret_key: SecretString::from(secret),
        })
    }
}

#[derive(Deserialize, Debug)]
struct AlpacaBar {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

impl From<AlpacaBar> for RawBar {
    fn from(bar: AlpacaBar) -> Self {
        RawBar {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume.round() as i64,
        }
    }
}

/// `bars` is `null` when the window holds no data.
#[derive(Deserialize, Debug)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
}

/// Calendar time that comfortably contains `limit` bars of `timeframe`.
fn lookback(timeframe: Timeframe, limit: usize) -> Duration {
    let limit = limit as i64;
    let days = if timeframe.is_intraday() {
        let bars_per_session = (SESSION_MINUTES / i64::from(timeframe.minutes())).max(1);
        // Trading days needed, stretched by 7/5 for weekends.
        (limit / bars_per_session + 1) * 7 / 5
    } else {
        limit * 7 / 5
    };
    Duration::days(days + LOOKBACK_PADDING_DAYS)
}

fn classify(status: StatusCode, symbol: &str, body: &str) -> AcquisitionError {
    match status.as_u16() {
        401 | 403 => AcquisitionError::Unauthorized,
        400 | 404 | 422 => AcquisitionError::InvalidSymbol(symbol.to_string()),
        429 => AcquisitionError::RateLimited,
        code @ 500..=599 => AcquisitionError::Server(code),
        code => AcquisitionError::Provider(format!("HTTP {code}: {}", body.trim())),
    }
}

#[async_trait]
impl BarProvider for AlpacaProvider {
    fn name(&self) -> &str {
        "alpaca"
    }

    async fn get_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<RawBar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, symbol);
        let start = (Utc::now() - lookback(timeframe, limit)).to_rfc3339_opts(SecondsFormat::Secs, true);
        let limit_param = limit.to_string();
        let query = [
            ("timeframe", timeframe.as_str()),
            ("limit", limit_param.as_str()),
            ("feed", self.feed.as_str()),
            ("sort", "desc"),
            ("start", start.as_str()),
        ];

        tracing::debug!(%symbol, %timeframe, limit, "Requesting bars");
        let response = self
            .client
            .get(&url)
            .header("APCA-API-KEY-ID", self.api_key.expose_secret())
            .header("APCA-API-SECRET-KEY", self.secret_key.expose_secret())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, symbol, &body));
        }

        let body: BarsResponse = response.json().await?;
        let bars = body.bars.unwrap_or_default();
        if bars.is_empty() {
            return Err(AcquisitionError::NoData);
        }
        Ok(bars.into_iter().map(RawBar::from).collect())
    }

    async fn probe(&self) -> Result<()> {
        self.get_bars(&self.probe_symbol, Timeframe::OneDay, 1)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_classified() {
        let classify = |code: u16| classify(StatusCode::from_u16(code).unwrap(), "ZZZZ", "");
        assert_eq!(classify(401), AcquisitionError::Unauthorized);
        assert_eq!(classify(403), AcquisitionError::Unauthorized);
        assert_eq!(classify(422), AcquisitionError::InvalidSymbol("ZZZZ".into()));
        assert!(classify(429).is_transient());
        assert!(classify(503).is_transient());
        assert!(!classify(418).is_transient());
    }

    #[test]
    fn lookback_covers_the_requested_bars() {
        // 300 five-minute bars is about four sessions.
        let window = lookback(Timeframe::FiveMinutes, 300);
        assert!(window >= Duration::days(5));
        // 200 daily bars needs at least 280 calendar days.
        assert!(lookback(Timeframe::OneDay, 200) >= Duration::days(280));
    }

    #[test]
    fn response_bars_convert() {
        let body = r#"{"bars":[{"t":"2024-01-02T14:30:00Z","o":1.0,"h":2.0,"l":0.5,"c":1.5,"v":1200,"n":10,"vw":1.2}],"symbol":"AAPL","next_page_token":null}"#;
        let parsed: BarsResponse = serde_json::from_str(body).unwrap();
        let raw: Vec<RawBar> = parsed.bars.unwrap().into_iter().map(RawBar::from).collect();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].volume, 1200);
        assert_eq!(raw[0].close, 1.5);

        let empty: BarsResponse = serde_json::from_str(r#"{"bars":null,"symbol":"AAPL"}"#).unwrap();
        assert!(empty.bars.is_none());
    }

    #[test]
    fn missing_credentials_are_a_configuration_error() {
        let settings = AlpacaSettings {
            api_key_id: Some(String::new()),
            api_secret_key: Some(String::new()),
            ..AlpacaSettings::default()
        };
        // Only meaningful when the environment does not supply keys either.
        if std::env::var("APCA_API_KEY_ID").is_err() {
            assert!(matches!(
                AlpacaProvider::new(&settings),
                Err(AcquisitionError::Config(_))
            ));
        }
    }
}
