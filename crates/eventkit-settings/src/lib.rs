//! EventKit Settings Crate
//!
//! Loads, validates and saves the event loop and logging settings.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{LogFormat, LoggingSettings, Settings};
pub use error::{ConfigError, SettingsError, SettingsResult};
pub use persistence::SettingsStore;
