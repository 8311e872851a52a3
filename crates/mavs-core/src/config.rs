use crate::app_config::{AppConfig, Environment, TranslationSettings};
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
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("MAVS_ENV", "development"))?;
    let bind_addr = parse_addr("MAVS_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("MAVS_LOG_LEVEL", "info");
    let sources_path = PathBuf::from(or_default("MAVS_SOURCES_PATH", "./config/sources.yaml"));

    let db_max_connections = parse_u32("MAVS_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("MAVS_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "MAVS_DB_MIN_CONNECTIONS",
            format!("must not exceed MAVS_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("MAVS_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("MAVS_HTTP_TIMEOUT_SECS", "20")?;
    let http_user_agent = or_default("MAVS_HTTP_USER_AGENT", "mavs-wire/0.1 (news-aggregator)");

    let max_attempts = parse_u32("TRANSLATION_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(invalid(
            "TRANSLATION_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }

    let translation = TranslationSettings {
        api_key: lookup("TRANSLATION_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty()),
        base_url: or_default(
            "TRANSLATION_BASE_URL",
            "https://generativelanguage.googleapis.com",
        ),
        model: or_default("TRANSLATION_MODEL", "gemini-1.5-flash"),
        target_language: or_default("TRANSLATION_TARGET_LANGUAGE", "Korean"),
        max_attempts,
        backoff_base_ms: parse_u64("TRANSLATION_BACKOFF_BASE_MS", "2000")?,
        cache_path: PathBuf::from(or_default(
            "TRANSLATION_CACHE_PATH",
            "./data/translation-cache.json",
        )),
        request_timeout_secs: parse_u64("TRANSLATION_TIMEOUT_SECS", "60")?,
    };

    let pipeline_cron = or_default("PIPELINE_CRON", "0 0 */2 * * *");
    let pipeline_per_source_limit = parse_usize("PIPELINE_PER_SOURCE_LIMIT", "10")?;
    let pipeline_translate_limit = parse_usize("PIPELINE_TRANSLATE_LIMIT", "5")?;
    let pipeline_delay_ms = parse_u64("PIPELINE_DELAY_MS", "4000")?;
    let pipeline_budget_secs = parse_u64("PIPELINE_BUDGET_SECS", "240")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        sources_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        http_user_agent,
        translation,
        pipeline_cron,
        pipeline_per_source_limit,
        pipeline_translate_limit,
        pipeline_delay_ms,
        pipeline_budget_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MAVS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
