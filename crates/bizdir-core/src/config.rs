use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing is decoupled from the process environment so it can be tested with
/// a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("BIZDIR_ENV", "development"))?;

    let bind_addr = parse_addr("BIZDIR_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("BIZDIR_LOG_LEVEL", "info");
    let directory_path = PathBuf::from(or_default(
        "BIZDIR_DIRECTORY_PATH",
        "./config/directory.yaml",
    ));

    let db_max_connections = parse_u32("BIZDIR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BIZDIR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BIZDIR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let store_timeout_ms = parse_u64("BIZDIR_STORE_TIMEOUT_MS", "5000")?;
    if store_timeout_ms == 0 {
        return Err(invalid(
            "BIZDIR_STORE_TIMEOUT_MS",
            "must be greater than zero".to_string(),
        ));
    }

    let max_page_size = parse_u32("BIZDIR_MAX_PAGE_SIZE", "100")?;
    if max_page_size == 0 {
        return Err(invalid(
            "BIZDIR_MAX_PAGE_SIZE",
            "must be greater than zero".to_string(),
        ));
    }

    let ratings_approved_only = parse_bool("BIZDIR_RATINGS_APPROVED_ONLY", "true")?;
    let directory_cache_ttl_secs = parse_u64("BIZDIR_DIRECTORY_CACHE_TTL_SECS", "300")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        directory_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        store_timeout_ms,
        max_page_size,
        ratings_approved_only,
        directory_cache_ttl_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BIZDIR_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
