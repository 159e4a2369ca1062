// In crates/api-client/src/fixture.rs

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use core_types::{RawBar, Timeframe};

use crate::error::{AcquisitionError, Result};
use crate::provider::BarProvider;

/// Serves bars from memory, for offline scans and tests.
///
/// The JSON form is an object keyed by symbol, each value a list of
/// `{timestamp, open, high, low, close, volume}` bars. The same bars are
/// returned whatever timeframe is asked for.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    bars: HashMap<String, Vec<RawBar>>,
    failures: HashMap<String, AcquisitionError>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<RawBar>) -> Self {
        self.bars.insert(symbol.to_ascii_uppercase(), bars);
        self
    }

    /// Makes every request for `symbol` fail with `error`.
    pub fn with_failure(mut self, symbol: &str, error: AcquisitionError) -> Self {
        self.failures.insert(symbol.to_ascii_uppercase(), error);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let bars: HashMap<String, Vec<RawBar>> =
            serde_json::from_str(json).map_err(|e| AcquisitionError::Malformed(e.to_string()))?;
        Ok(bars
            .into_iter()
            .fold(Self::new(), |provider, (symbol, bars)| provider.with_bars(&symbol, bars)))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AcquisitionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }
}

#[async_trait]
impl BarProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn get_bars(&self, symbol: &str, _timeframe: Timeframe, limit: usize) -> Result<Vec<RawBar>> {
        let key = symbol.to_ascii_uppercase();
        if let Some(err) = self.failures.get(&key) {
            return Err(err.clone());
        }
        let bars = self
            .bars
            .get(&key)
            .ok_or_else(|| AcquisitionError::InvalidSymbol(symbol.to_string()))?;
        if bars.is_empty() {
            return Err(AcquisitionError::NoData);
        }

        let mut bars = bars.clone();
        bars.sort_by_key(|b| b.timestamp);
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.split_off(skip))
    }

    async fn probe(&self) -> Result<()> {
        Ok(())
    }
}
