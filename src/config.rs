use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub store_timeout: Duration,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact/json"
                )));
            }
        };

        let store_timeout_ms: u64 = parse_or_default("STORE_TIMEOUT_MS", 5_000)?;
        if store_timeout_ms == 0 {
            return Err(AppError::Internal("STORE_TIMEOUT_MS must be > 0".to_string()));
        }

        let event_buffer_size: usize = parse_or_default("EVENT_BUFFER_SIZE", 1024)?;
        if event_buffer_size == 0 {
            return Err(AppError::Internal("EVENT_BUFFER_SIZE must be > 0".to_string()));
        }

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 8080)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            store_timeout: Duration::from_millis(store_timeout_ms),
            event_buffer_size,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
