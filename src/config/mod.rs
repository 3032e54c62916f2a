//! Configuration management.
//!
//! Configuration lives in TOML at `~/.orion/config.toml` and is created
//! with defaults on first run. Secrets are deliberately not part of the
//! file: the Telegram token and the Gemini API key are read from the
//! environment (`TELEGRAM_TOKEN`, `GEMINI_API_KEY`), which a local `.env`
//! file may populate.
//!
//! All reminder timestamps are interpreted in the single configured time
//! zone; the zone string is validated at load time so a typo fails fast
//! instead of at the first reminder.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Failed to write config file: {0}")]
    Write(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings: data directory, logging, time zone
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Telegram transport configuration
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA time zone all reminder timestamps are interpreted in
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Upper bound on a single LLM round-trip, in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for the Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    // Note: API key comes from the environment, not from this file
}

/// Telegram transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram user ids allowed to talk to the bot; empty admits everyone
    #[serde(default)]
    pub allowed_users: Vec<i64>,

    /// Long-poll timeout passed to getUpdates, in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.orion")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            timezone: default_timezone(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            allowed_users: Vec::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LlmConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.orion/config.toml`, creating it with
    /// defaults if it doesn't exist yet.
    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file and return it
    fn create_default(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::default();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }

        let contents =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(path, contents).map_err(|e| ConfigError::Write(e.to_string()))?;

        Ok(config)
    }

    fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ConfigError::Invalid("Cannot determine home directory".to_string()))?;
        Ok(home.join(".orion").join("config.toml"))
    }

    /// Validate loaded values; called on every load path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured time zone, parsed.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.core
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| {
                ConfigError::Invalid(format!("Unknown time zone: {}", self.core.timezone))
            })
    }

    /// Data directory with `~` expanded.
    pub fn data_dir(&self) -> PathBuf {
        let dir = &self.core.data_dir;
        let dir_str = dir.to_str().unwrap_or("");
        if let Some(rest) = dir_str.strip_prefix("~/") {
            dirs::home_dir()
                .map(|h| h.join(rest))
                .unwrap_or_else(|| dir.clone())
        } else {
            dir.clone()
        }
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("notes.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.core.timezone, "America/Sao_Paulo");
        assert_eq!(config.llm.gemini.model, "gemini-2.5-pro");
        assert!(config.telegram.allowed_users.is_empty());
    }

    #[test]
    fn test_round_trip_through_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config::default();
        let contents = toml::to_string_pretty(&config).unwrap();
        fs::write(&path, contents).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.core.timezone, config.core.timezone);
        assert_eq!(loaded.llm.timeout_secs, config.llm.timeout_secs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        fs::write(&path, "[telegram]\nallowed_users = [111, 222]\n").unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.telegram.allowed_users, vec![111, 222]);
        assert_eq!(loaded.core.log_level, "info");
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        fs::write(&path, "[core]\ntimezone = \"Mars/Olympus_Mons\"\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        fs::write(&path, "[llm]\ntimeout_secs = 0\n").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_tilde_expansion() {
        let config = Config::default();
        let data_dir = config.data_dir();
        assert!(!data_dir.to_str().unwrap_or("").starts_with('~'));
        assert!(data_dir.ends_with(".orion"));
    }
}
