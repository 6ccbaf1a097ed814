//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It provides the default query options, the NOAA endpoint and display settings.
//! The station itself is fixed and not part of the configuration.

use crate::tide_data::DEFAULT_BASE_URL;
use crate::QueryOptions;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Datum and units used when none are given on the command line
    pub query: QueryOptions,
    /// NOAA API settings
    pub api: ApiConfig,
    /// Terminal output settings
    pub display: DisplayConfig,
}

/// NOAA CO-OPS API configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Data getter endpoint
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Display and visualization configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Height of the terminal chart in lines
    pub chart_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig { chart_rows: 20 }
    }
}

impl Config {
    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format in {}: {}", path.display(), e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file at {}, using default configuration", path.display());
                Self::default()
            }
        }
    }

    /// Query options for the next fetch: command-line choices win over the file.
    pub fn query_options(&self, datum: Option<String>, units: Option<String>) -> QueryOptions {
        QueryOptions {
            datum: datum.unwrap_or_else(|| self.query.datum.clone()),
            units: units.unwrap_or_else(|| self.query.units.clone()),
        }
    }
}
