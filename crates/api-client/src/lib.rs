// In crates/api-client/src/lib.rs

//! Bar acquisition: the provider seam, the Alpaca REST provider, an
//! offline fixture provider and the retrying, pooled fetch layer on top.

pub mod acquisition;
pub mod alpaca;
pub mod error;
pub mod fixture;
pub mod provider;

// Re-export public types
pub use acquisition::{DataAcquisition, FetchOutcome, RetryPolicy};
pub use alpaca::AlpacaProvider;
pub use error::{AcquisitionError, Result};
pub use fixture::FixtureProvider;
pub use provider::BarProvider;
