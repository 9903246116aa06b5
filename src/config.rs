//! Environment configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_PROVIDER_URL: &str = "http://localhost:8082";
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONVERSATION_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_MAX_CONCURRENT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub provider_url: String,
    pub provider_timeout: Duration,
    pub conversation_ttl: Duration,
    pub max_concurrent: usize,
    /// Human-readable log lines instead of JSON
    pub log_text: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("TUNNEL_KEYS_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".tunnel-keys/tunnel-keys.db")
            },
            PathBuf::from,
        );

        Self {
            db_path,
            port: parsed(&lookup, "TUNNEL_KEYS_PORT", DEFAULT_PORT),
            provider_url: lookup("TUNNEL_KEYS_PROVIDER_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string()),
            provider_timeout: Duration::from_secs(parsed(
                &lookup,
                "TUNNEL_KEYS_PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )),
            conversation_ttl: Duration::from_secs(parsed(
                &lookup,
                "TUNNEL_KEYS_CONVERSATION_TTL_SECS",
                DEFAULT_CONVERSATION_TTL_SECS,
            )),
            // A zero limit would never admit a request
            max_concurrent: parsed_where(
                &lookup,
                "TUNNEL_KEYS_MAX_CONCURRENT",
                DEFAULT_MAX_CONCURRENT,
                |n| *n > 0,
            ),
            log_text: lookup("TUNNEL_KEYS_LOG_TEXT").is_some_and(|v| v == "1" || v == "true"),
        }
    }
}

/// Parse a variable, falling back to `default` when unset or malformed
fn parsed<T>(lookup: impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    parsed_where(lookup, name, default, |_| true)
}

/// Like `parsed`, but values rejected by `valid` also count as malformed
fn parsed_where<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(var = name, value = %raw, %default, "Invalid value, using default");
            default
        }
    }
}
