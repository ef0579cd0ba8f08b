//! Configuration management for the subtitle engine.
//!
//! This module provides:
//! - TOML-based configuration with one section per codec plus logging
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use subkit_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/subkit.toml");
//! config.load_or_create().unwrap();
//!
//! config.settings_mut().webvtt.write_source_index = true;
//! config.update_section(ConfigSection::Webvtt).unwrap();
//!
//! let write_options = config.settings().write_options();
//! assert!(write_options.webvtt_write_source_index);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, Settings, SrtSettings, SsaSettings, StlSettings, TtmlSettings, WebVttSettings,
};
