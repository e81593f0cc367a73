//! Application Configuration Module
//!
//! Loads the desk's settings from environment variables (and a `.env` file
//! when present) into one struct that `main` hands to the controllers.

use std::env;
use std::time::Duration;
use studydesk_core::SettlePolicy;
use tracing::Level;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_AUDIO_PLAYER: &str = "ffplay -nodisp -autoexit -loglevel quiet";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub log_level: Level,
    pub settle_attempts: u32,
    pub settle_interval: Duration,
    /// Program and leading arguments; the clip URL is appended.
    pub audio_player: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid number for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("STUDYDESK_AUDIO_PLAYER must name a program")]
    EmptyPlayer,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `STUDYDESK_API_URL`: (Optional) Backend base URL. Defaults to "http://localhost:5000/api".
    // *   `STUDYDESK_SETTLE_ATTEMPTS`: (Optional) Re-lists after a submission when waiting. Defaults to 5.
    // *   `STUDYDESK_SETTLE_INTERVAL_MS`: (Optional) Delay between those re-lists. Defaults to 2000.
    // *   `STUDYDESK_AUDIO_PLAYER`: (Optional) Command used to play dialogue audio.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("STUDYDESK_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let settle_attempts = parse_number(&lookup, "STUDYDESK_SETTLE_ATTEMPTS", 5)?;
        let interval_ms = parse_number(&lookup, "STUDYDESK_SETTLE_INTERVAL_MS", 2000)?;

        let audio_player: Vec<String> = lookup("STUDYDESK_AUDIO_PLAYER")
            .unwrap_or_else(|| DEFAULT_AUDIO_PLAYER.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if audio_player.is_empty() {
            return Err(ConfigError::EmptyPlayer);
        }

        Ok(Self {
            api_url,
            log_level,
            settle_attempts: settle_attempts as u32,
            settle_interval: Duration::from_millis(interval_ms),
            audio_player,
        })
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            max_attempts: self.settle_attempts,
            interval: self.settle_interval,
        }
    }

    pub fn gateway_config(&self) -> studydesk_gateway::Config {
        studydesk_gateway::Config::builder()
            .with_base_url(&self.api_url)
            .build()
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u32>()
            .map(u64::from)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
