// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate (spec
//! §6 "Environment variables"). `.env` is loaded once via `dotenvy`
//! before any of these are read; required keys missing or malformed
//! are reported together rather than one `log.Fatalf` at a time, the
//! way the original's `loadEnv` bailed on the first `godotenv` error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("environment variable {key} has an invalid value {value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: &'static str },
    #[error("could not determine the current working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
}

/// Whydah-style application credential, only needed when the Slack
/// notifier or the remote control poller is configured.
#[derive(Debug, Clone)]
pub struct WhydahConfig {
    pub whydah_uri: String,
    pub application_id: String,
    pub application_name: String,
    pub application_secret: String,
}

/// Optional Slack notification configuration (spec §6 `slack_channel`,
/// `app_icon`, `env_icon`, `env`; requires `entraos_api_uri` and the
/// whydah credential to actually send anything).
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub entraos_api_uri: String,
    pub slack_channel: String,
    pub app_icon: String,
    pub env_icon: String,
    pub env: String,
}

/// Fully validated daemon configuration. Everything the core needs to
/// start is a required field; everything an optional collaborator
/// (notifier, remote control) needs is `Option`.
#[derive(Debug, Clone)]
pub struct Config {
    pub working_dir: PathBuf,
    pub identifier: String,
    pub scheme: String,
    pub endpoint: String,
    pub listen_port: u16,
    pub port_range_low: u16,
    pub port_range_high: u16,
    pub port_identifier: Option<String>,
    pub properties_file_name: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub slack: Option<SlackConfig>,
    pub whydah: Option<WhydahConfig>,
    pub manual_control: bool,
}

impl Config {
    /// Load and validate every key spec §6 recognises. `.env` (if
    /// present) must already be loaded into the process environment by
    /// the caller (see `main::load_dotenv`) — this function only reads
    /// `std::env`, so it is trivially testable with `Config::from_vars`.
    pub fn load() -> Result<Self, ConfigError> {
        let working_dir = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::from_vars(working_dir, |key| std::env::var(key).ok())
    }

    /// Build a [`Config`] from an arbitrary variable lookup function,
    /// so tests can exercise validation without touching the real
    /// process environment.
    pub fn from_vars(working_dir: PathBuf, get: impl Fn(&'static str) -> Option<String>) -> Result<Self, ConfigError> {
        let identifier = required(&get, "identifier")?;
        let scheme = required(&get, "scheme")?;
        let endpoint = required(&get, "endpoint")?;
        let listen_port = parse_required(&get, "port")?;
        let (port_range_low, port_range_high) = parse_port_range(&get)?;

        let port_identifier = get("port_identifier");
        let properties_file_name = get("properties_file_name");
        let log_dir = get("log_dir").map(PathBuf::from);
        let manual_control = get("manualcontrol").as_deref() == Some("true");

        let whydah = optional_whydah(&get);
        let slack = optional_slack(&get);

        Ok(Self {
            working_dir,
            identifier,
            scheme,
            endpoint,
            listen_port,
            port_range_low,
            port_range_high,
            port_identifier,
            properties_file_name,
            log_dir,
            slack,
            whydah,
            manual_control,
        })
    }

    pub fn port_range_str(&self) -> String {
        format!("{}-{}", self.port_range_low, self.port_range_high)
    }
}

fn required(get: &impl Fn(&'static str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    get(key).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(key))
}

fn parse_required<T: std::str::FromStr>(get: &impl Fn(&'static str) -> Option<String>, key: &'static str) -> Result<T, ConfigError> {
    let raw = required(get, key)?;
    raw.parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw, reason: "not a valid number" })
}

fn parse_port_range(get: &impl Fn(&'static str) -> Option<String>) -> Result<(u16, u16), ConfigError> {
    let raw = required(get, "port_range")?;
    let (low, high) = raw
        .split_once('-')
        .ok_or(ConfigError::Invalid { key: "port_range", value: raw.clone(), reason: "expected format N-M" })?;
    let low: u16 = low.parse().map_err(|_| ConfigError::Invalid { key: "port_range", value: raw.clone(), reason: "low bound is not a valid port" })?;
    let high: u16 = high.parse().map_err(|_| ConfigError::Invalid { key: "port_range", value: raw.clone(), reason: "high bound is not a valid port" })?;
    if low > high {
        return Err(ConfigError::Invalid { key: "port_range", value: raw, reason: "low bound is greater than high bound" });
    }
    Ok((low, high))
}

fn optional_whydah(get: &impl Fn(&'static str) -> Option<String>) -> Option<WhydahConfig> {
    Some(WhydahConfig {
        whydah_uri: get("whydah_uri")?,
        application_id: get("whydah_application_id")?,
        application_name: get("whydah_application_name")?,
        application_secret: get("whydah_application_secret")?,
    })
}

fn optional_slack(get: &impl Fn(&'static str) -> Option<String>) -> Option<SlackConfig> {
    Some(SlackConfig {
        entraos_api_uri: get("entraos_api_uri")?,
        slack_channel: get("slack_channel")?,
        app_icon: get("app_icon").unwrap_or_default(),
        env_icon: get("env_icon").unwrap_or_default(),
        env: get("env").unwrap_or_default(),
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
