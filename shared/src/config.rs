use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid TASK_STORE '{0}': expected 'dynamodb' or 'memory'")]
    InvalidStore(String),

    #[error("Invalid LOG_FORMAT '{0}': expected 'text' or 'json'")]
    InvalidLogFormat(String),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Backing store for task records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    #[default]
    DynamoDb,
    /// Process-local and lost on cold start. Tests and local runs only.
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(Self::DynamoDb),
            "memory" | "in_memory" | "in-memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidStore(s.to_string())),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamoDb => f.write_str("dynamodb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(s.to_string())),
        }
    }
}

/// Process configuration, read once at cold start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub table_name: String,
    pub store: StoreKind,
    pub cache_enabled: bool,
    pub cors_allow_origin: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: "tasks".to_string(),
            store: StoreKind::default(),
            cache_enabled: true,
            cors_allow_origin: "*".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset or blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let store = read("TASK_STORE")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(defaults.store);

        let log_format = read("LOG_FORMAT")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(defaults.log_format);

        let cache_enabled = read("CACHE_ENABLED")
            .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
            .unwrap_or(defaults.cache_enabled);

        let config = Self {
            table_name: read("TABLE_NAME").unwrap_or(defaults.table_name),
            store,
            cache_enabled,
            cors_allow_origin: read("CORS_ALLOW_ORIGIN").unwrap_or(defaults.cors_allow_origin),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store == StoreKind::DynamoDb && self.table_name.is_empty() {
            return Err(ConfigError::Empty("TABLE_NAME"));
        }
        Ok(())
    }
}
