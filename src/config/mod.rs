//! Configuration
//!
//! Loaded from a JSON5 file, then overridden from the environment. A missing
//! file is not an error: every section has defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channels::SlackConfig;
use crate::logging::{LogFormat, LoggingConfig};
use crate::server::ServerConfig;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "POLLGATE_CONFIG_PATH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// Slack delivery and callbacks
    pub slack: SlackConfig,
    /// Logging
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.maxBodyBytes must be greater than zero".to_string(),
            ));
        }
        self.slack.validate().map_err(ConfigError::Invalid)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("POLLGATE_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("POLLGATE_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "POLLGATE_PORT".to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(level) = lookup("POLLGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("POLLGATE_LOG_FORMAT") {
            self.logging.format =
                format
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::InvalidEnv {
                        key: "POLLGATE_LOG_FORMAT".to_string(),
                        value: format.clone(),
                    })?;
        }

        // `token` is the historical variable name for the bot token
        if let Some(token) = lookup("SLACK_BOT_TOKEN").or_else(|| lookup("token")) {
            if !token.is_empty() {
                self.slack.bot_token = token;
                self.slack.enabled = true;
            }
        }
        if let Some(secret) = lookup("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = secret;
        }
        if let Some(channel) = lookup("SLACK_CHANNEL") {
            self.slack.default_channel = channel;
        }
        Ok(())
    }
}

/// Resolve the configuration file path.
///
/// `POLLGATE_CONFIG_PATH` when set, otherwise `<config dir>/pollgate/config.json5`.
/// `./pollgate.json5` is used only when the platform has no config dir.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("pollgate").join("config.json5"))
        .unwrap_or_else(|| PathBuf::from("pollgate.json5"))
}

/// Read a config file; a missing file yields defaults
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if raw.trim().is_empty() {
        return Ok(Config::default());
    }

    json5::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load, apply environment overrides and validate
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    let mut config = load_config_file(&path)?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
