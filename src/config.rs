//! Configuration management for the bridge.
//!
//! Configuration can be set via environment variables (a `.env` file is
//! loaded first when present):
//! - `HOST` - Optional. Server host. Defaults to `0.0.0.0`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `NODE_ENV` - Optional. `production` turns on Copilot request verification.
//! - `BACKEND_URL` - Optional. Workflow backend for the Codex agent. Defaults to `http://localhost:8000`.
//! - `DEVIN_API_URL` - Optional. Devin API base. Defaults to `https://api.devin.ai/v1`.
//! - `COPILOT_API_URL` - Optional. Chat completion base. Defaults to `https://api.githubcopilot.com`.
//! - `GITHUB_API_URL` - Optional. GitHub API base used for public keys. Defaults to `https://api.github.com`.
//! - `COPILOT_MODEL` - Optional. Completion model. Defaults to `gpt-4o`.
//! - `STATUS_REFRESH_DELAY_MS` - Optional. Delay before the follow-up status card. Defaults to `1000`.
//! - `USER_CONFIG_PATH` - Optional. Persist per-user configuration to this JSON file.
//! - `MICROSOFT_APP_ID` / `MICROSOFT_APP_PASSWORD` - Optional. Bot Framework credentials; also turn on
//!   inbound activity authentication.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Upstream endpoints the vendor adapters talk to.
#[derive(Debug, Clone)]
pub struct VendorEndpoints {
    /// Devin REST API base
    pub devin_api_url: String,

    /// Workflow backend used by the Codex agent
    pub backend_url: String,

    /// GitHub Copilot chat completion base
    pub copilot_api_url: String,

    /// GitHub REST API base
    pub github_api_url: String,

    /// Model requested for chat completions
    pub copilot_model: String,
}

impl Default for VendorEndpoints {
    fn default() -> Self {
        Self {
            devin_api_url: "https://api.devin.ai/v1".to_string(),
            backend_url: "http://localhost:8000".to_string(),
            copilot_api_url: "https://api.githubcopilot.com".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            copilot_model: "gpt-4o".to_string(),
        }
    }
}

/// Bot Framework application credentials for proactive replies.
#[derive(Debug, Clone)]
pub struct BotCredentials {
    pub app_id: String,
    pub app_password: String,
}

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Development mode skips Copilot request verification
    pub dev_mode: bool,

    /// Vendor endpoints
    pub endpoints: VendorEndpoints,

    /// Delay before the follow-up status card after a message is sent
    pub status_refresh_delay: Duration,

    /// When set, per-user configuration is persisted to this file
    pub user_config_path: Option<PathBuf>,

    /// Bot Framework credentials (activity authentication and connector tokens
    /// are off when absent)
    pub bot: Option<BotCredentials>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `PORT` or `STATUS_REFRESH_DELAY_MS`
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        report_env_file(dotenvy::dotenv());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let dev_mode = std::env::var("NODE_ENV")
            .map(|v| v.trim() != "production")
            .unwrap_or(true);

        let defaults = VendorEndpoints::default();
        let endpoints = VendorEndpoints {
            devin_api_url: env_or("DEVIN_API_URL", defaults.devin_api_url),
            backend_url: env_or("BACKEND_URL", defaults.backend_url),
            copilot_api_url: env_or("COPILOT_API_URL", defaults.copilot_api_url),
            github_api_url: env_or("GITHUB_API_URL", defaults.github_api_url),
            copilot_model: env_or("COPILOT_MODEL", defaults.copilot_model),
        };

        let refresh_ms: u64 = std::env::var("STATUS_REFRESH_DELAY_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("STATUS_REFRESH_DELAY_MS".to_string(), format!("{}", e))
            })?;

        let user_config_path = std::env::var("USER_CONFIG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let bot = match (
            std::env::var("MICROSOFT_APP_ID").ok(),
            std::env::var("MICROSOFT_APP_PASSWORD").ok(),
        ) {
            (Some(app_id), Some(app_password)) if !app_id.is_empty() && !app_password.is_empty() => {
                Some(BotCredentials {
                    app_id,
                    app_password,
                })
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar(
                    "MICROSOFT_APP_PASSWORD".to_string(),
                ))
            }
            _ => None,
        };

        Ok(Self {
            host,
            port,
            dev_mode,
            endpoints,
            status_refresh_delay: Duration::from_millis(refresh_ms),
            user_config_path,
            bot,
        })
    }

    /// Create a config with default values (useful for testing).
    pub fn new(dev_mode: bool, endpoints: VendorEndpoints) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            dev_mode,
            endpoints,
            status_refresh_delay: Duration::from_millis(1000),
            user_config_path: None,
            bot: None,
        }
    }
}

/// Log the outcome of loading a `.env` file. Returns whether one was loaded.
fn report_env_file<T>(result: Result<T, dotenvy::Error>) -> bool {
    match result {
        Ok(_) => {
            tracing::debug!("Loaded environment from .env");
            true
        }
        Err(e) if e.not_found() => {
            tracing::debug!("No .env file found, using process environment");
            false
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable .env file: {}", e);
            false
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value.trim().trim_end_matches('/').to_string(),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn env_file_outcomes() {
        let dir = tempfile::tempdir().unwrap();

        assert!(!report_env_file(dotenvy::from_path(dir.path().join("missing.env"))));

        let malformed = dir.path().join("malformed.env");
        let mut file = std::fs::File::create(&malformed).unwrap();
        writeln!(file, "AGU_BRIDGE_UNTERMINATED=\"no closing quote").unwrap();
        assert!(!report_env_file(dotenvy::from_path(&malformed)));

        let valid = dir.path().join("valid.env");
        std::fs::write(&valid, "AGU_BRIDGE_ENV_FILE_TEST=loaded\n").unwrap();
        assert!(report_env_file(dotenvy::from_path(&valid)));
        assert_eq!(std::env::var("AGU_BRIDGE_ENV_FILE_TEST").unwrap(), "loaded");
    }

    #[test]
    fn test_config_has_no_bot_credentials() {
        let config = Config::new(true, VendorEndpoints::default());
        assert!(config.dev_mode);
        assert!(config.bot.is_none());
        assert_eq!(config.status_refresh_delay, Duration::from_millis(1000));
    }
}
