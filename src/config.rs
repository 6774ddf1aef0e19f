use crate::filter::TimeRange;
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:3002";

/// Dashboard settings, read from a dotenv file and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the backend serving `/api/logs` and `/api/getInfo`.
    pub api_url: String,
    /// Window applied when the dashboard opens.
    pub time_range: TimeRange,
    /// Where log output goes. The terminal is taken by the UI, so without
    /// a file logging stays off.
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            time_range: TimeRange::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Loads the dotenv file at `config_path` (or `.env` when it does not
    /// exist), then reads the environment.
    ///
    /// # Environment Variables
    /// * `LOG_API_URL` - backend base URL (default: "http://localhost:3002")
    /// * `TIME_RANGE` - one of 1h, 6h, 24h, 7d, all (default: "24h")
    /// * `LOG_FILE` - file to write logs to (default: none)
    pub fn load(config_path: &str) -> Result<Self> {
        if Path::new(config_path).exists() {
            dotenvy::from_filename(config_path)
                .with_context(|| format!("Failed to read config file {}", config_path))?;
        } else {
            dotenv().ok();
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let time_range = match lookup("TIME_RANGE") {
            Some(raw) => raw.parse::<TimeRange>().context("TIME_RANGE is invalid")?,
            None => defaults.time_range,
        };

        Ok(Self {
            api_url: lookup("LOG_API_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.api_url),
            time_range,
            log_file: lookup("LOG_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}
