//! Core module containing fundamental types, configuration, settings and error handling.

pub mod config;
pub mod error;
pub mod settings;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use settings::{ScanSettings, SettingsProvider, SettingsStore};
