// In crates/app-config/src/lib.rs

use std::path::Path;

use config::{Config, Environment, File};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{
    AcquisitionSettings, AlpacaSettings, AppSettings, ScanRequestFile, ScannerSettings, Settings,
};

/// Loads the application settings from the `config/` directory.
///
/// See [`load_settings_from`] for the layering.
pub fn load_settings() -> Result<Settings> {
    load_settings_from("config")
}

/// Loads settings from `dir` in layers, later ones winning:
/// 1. `base.toml`.
/// 2. The environment-specific file named by `APP_ENVIRONMENT` (default
///    `development.toml`).
/// 3. Environment variables such as `APP_SCANNER__REFRESH_INTERVAL_SECS`.
///
/// Every file is optional and every field has a default.
pub fn load_settings_from(dir: impl AsRef<Path>) -> Result<Settings> {
    let dir = dir.as_ref();
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::from(dir.join("base.toml")).required(false))
        .add_source(File::from(dir.join(format!("{environment}.toml"))).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    Ok(settings)
}

/// Reads a scan request file as written. Gaps are filled later by
/// [`ScanRequestFile::resolve`], after any command-line overrides.
pub fn load_scan_request(path: impl AsRef<Path>) -> Result<ScanRequestFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
