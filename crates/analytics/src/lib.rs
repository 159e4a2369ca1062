// In crates/analytics/src/lib.rs

pub mod engine;

pub use engine::{snapshot, summarize};
