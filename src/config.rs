//! Process configuration from environment variables (and `.env`, loaded by the binary).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "postgres://tokenizerDB@localhost/tokenizer";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind: SocketAddr,
    pub max_connections: u32,
    pub request_timeout: Duration,
    /// Create the database named in `database_url` when it does not exist.
    pub create_database: bool,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let timeout_secs: u64 = parse_or(&get, "TOKENIZER_REQUEST_TIMEOUT_SECS", 30)?;
        Ok(Config {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            bind: parse_or(&get, "TOKENIZER_BIND", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            max_connections: parse_or(&get, "TOKENIZER_MAX_CONNECTIONS", 5)?,
            request_timeout: Duration::from_secs(timeout_secs),
            create_database: parse_or(&get, "TOKENIZER_CREATE_DATABASE", false)?,
        })
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind.to_string(), DEFAULT_BIND);
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert!(!cfg.create_database);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://u@db/t"),
            ("TOKENIZER_BIND", "127.0.0.1:9000"),
            ("TOKENIZER_MAX_CONNECTIONS", " 12 "),
            ("TOKENIZER_CREATE_DATABASE", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.database_url, "postgres://u@db/t");
        assert_eq!(cfg.bind.port(), 9000);
        assert_eq!(cfg.max_connections, 12);
        assert!(cfg.create_database);
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = Config::from_lookup(lookup(&[("TOKENIZER_MAX_CONNECTIONS", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid TOKENIZER_MAX_CONNECTIONS: 'lots'");
    }
}
