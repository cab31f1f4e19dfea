use std::{collections::BTreeMap, fmt, net::SocketAddr};

use super::{env_value, server_bind_address};

/// Environment variable holding `key=value` pairs applied to metrics alerts.
pub const LABEL_FILTERS_VAR: &str = "SIGNALS_PROMETHEUS_LABEL_FILTERS";

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// Only alerts carrying every one of these labels become signals.
    pub prometheus_label_filters: BTreeMap<String, String>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env_value("APP_ENV") {
            Some(value) => Environment::from_str(&value)?,
            None => Environment::Development,
        };
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;
        let prometheus_label_filters = match env_value(LABEL_FILTERS_VAR) {
            Some(raw) => parse_label_filters(&raw)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            bind_addr,
            environment,
            prometheus_label_filters,
        })
    }
}

/// Parses `severity=critical, team=infra` into a filter map.
///
/// Blank entries are ignored. Later duplicates replace earlier ones.
pub fn parse_label_filters(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut filters = BTreeMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, value)) = entry.split_once('=') else {
            return Err(ConfigError::InvalidLabelFilter(entry.to_string()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidLabelFilter(entry.to_string()));
        }
        filters.insert(key.to_string(), value.trim().to_string());
    }
    Ok(filters)
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    InvalidLabelFilter(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidLabelFilter(entry) => write!(
                f,
                "{LABEL_FILTERS_VAR} entries must look like key=value (got '{entry}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
