use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// `PORT` is honoured when `HTTP_PORT` is unset.
const PORT_KEYS: &[&str] = &["HTTP_PORT", "PORT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other}, expected compact/json")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub command_queue_size: usize,
    pub outbox_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_first_or_default(PORT_KEYS, 5000, env_lookup)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: parse_or_default("LOG_FORMAT", LogFormat::Compact)?,
            command_queue_size: parse_or_default("COMMAND_QUEUE_SIZE", 1024)?,
            outbox_buffer_size: parse_or_default("OUTBOX_BUFFER_SIZE", 256)?,
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_first_or_default(&[key], default, env_lookup)
}

/// Parses the first of `keys` that is set; later keys are fallbacks.
fn parse_first_or_default<T, F>(keys: &[&str], default: T, lookup: F) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(raw) = lookup(key) {
            return raw
                .parse::<T>()
                .map_err(|err| AppError::Internal(format!("invalid {key}: {err}")));
        }
    }

    Ok(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{parse_first_or_default, LogFormat, PORT_KEYS};

    fn lookup_in<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| vars.get(key).map(|value| value.to_string())
    }

    #[test]
    fn http_port_wins_over_port() {
        let vars = HashMap::from([("HTTP_PORT", "8080"), ("PORT", "9000")]);
        let port: u16 = parse_first_or_default(PORT_KEYS, 5000, lookup_in(&vars)).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn port_is_used_when_http_port_is_unset() {
        let vars = HashMap::from([("PORT", "9000")]);
        let port: u16 = parse_first_or_default(PORT_KEYS, 5000, lookup_in(&vars)).unwrap();
        assert_eq!(port, 9000);

        let empty = HashMap::new();
        let port: u16 = parse_first_or_default(PORT_KEYS, 5000, lookup_in(&empty)).unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let vars = HashMap::from([("PORT", "not-a-port")]);
        let err =
            parse_first_or_default::<u16, _>(PORT_KEYS, 5000, lookup_in(&vars)).unwrap_err();
        assert!(err.to_string().contains("invalid PORT"));
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("pretty".parse::<LogFormat>().is_err());
    }
}
