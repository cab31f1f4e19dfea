//! Process configuration for the intake host: `.env` loading and typed
//! settings resolved from environment variables.

pub mod config;

use std::{env, net::SocketAddr, path::PathBuf};

pub use config::{parse_label_filters, AppConfig, ConfigError, Environment, LABEL_FILTERS_VAR};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const BIND_ADDR_VAR: &str = "APP_BIND_ADDR";

/// Loads `.env` when present and returns the path that was read.
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Resolves the listen address from `APP_BIND_ADDR`, defaulting to
/// [`DEFAULT_BIND_ADDR`].
pub fn server_bind_address() -> Result<SocketAddr, std::net::AddrParseError> {
    env_value(BIND_ADDR_VAR)
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDR)
        .parse()
}

/// Reads a variable, treating unset, non-unicode and blank values as absent.
pub(crate) fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) static ENV_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());
