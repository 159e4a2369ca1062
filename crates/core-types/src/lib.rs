// In crates/core-types/src/lib.rs

pub mod bar;
pub mod cancel;
pub mod error;
pub mod scan;
pub mod signal;
pub mod timeframe;

// Re-export the most important types for easy access from other crates.
pub use bar::{normalize, Bar, BarSeries, RawBar};
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use scan::{
    ConnectionStatus, ScanReport, ScanRequest, ScanStatus, ScanSummary, SymbolSnapshot,
    WireReport, entry_signal_name, MAX_BAR_LIMIT,
};
pub use signal::{Signal, SignalResult};
pub use timeframe::Timeframe;
