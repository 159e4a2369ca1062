// In crates/api-client/src/provider.rs

use async_trait::async_trait;
use core_types::{RawBar, Timeframe};

use crate::Result;

/// A source of historical bars.
///
/// Implementations return bars in whatever order the source produces; the
/// acquisition layer normalizes them.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Short name used in logs and status messages.
    fn name(&self) -> &str;

    /// Up to `limit` of the most recent bars for `symbol`.
    async fn get_bars(&self, symbol: &str, timeframe: Timeframe, limit: usize) -> Result<Vec<RawBar>>;

    /// A cheap call that succeeds only if the provider is reachable and
    /// accepts our credentials.
    async fn probe(&self) -> Result<()>;
}
