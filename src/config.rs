//! Ledger configuration.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Upper bound accepted for `max_page_size`.
pub const PAGE_SIZE_CEILING: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },

    #[error("{var} has an unparseable value: {value:?}")]
    Unparseable { var: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime settings for the store and the engine.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Pool size.
    pub max_connections: u32,
    /// How long to wait for a pooled connection.
    pub acquire_timeout: Duration,
    /// Upper bound on a single row-lock wait.
    pub lock_timeout: Duration,
    /// Upper bound on any statement inside a unit of work.
    pub statement_timeout: Duration,
    /// Ledger listing page size when the caller gives none.
    pub default_page_size: usize,
    /// Hard cap on a requested page size.
    pub max_page_size: usize,
    /// Default tracing filter for binaries.
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/ledger".to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            lock_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(15),
            default_page_size: 50,
            max_page_size: 200,
            log_level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables. `DATABASE_URL` is
    /// required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing {
            var: "DATABASE_URL",
        })?;
        let mut config = Self {
            database_url,
            ..Self::default()
        };

        if let Some(n) = parse_var(&lookup, "LEDGER_MAX_CONNECTIONS")? {
            config.max_connections = n;
        }
        if let Some(ms) = parse_var(&lookup, "LEDGER_ACQUIRE_TIMEOUT_MS")? {
            config.acquire_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "LEDGER_LOCK_TIMEOUT_MS")? {
            config.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "LEDGER_STATEMENT_TIMEOUT_MS")? {
            config.statement_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var(&lookup, "LEDGER_PAGE_SIZE")? {
            config.default_page_size = n;
        }
        if let Some(n) = parse_var(&lookup, "LEDGER_MAX_PAGE_SIZE")? {
            config.max_page_size = n;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(ConfigError::Invalid(
                "database URL cannot be empty".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max connections must be at least 1".to_string(),
            ));
        }
        if self.lock_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "lock timeout must be positive".to_string(),
            ));
        }
        if self.statement_timeout < self.lock_timeout {
            return Err(ConfigError::Invalid(
                "statement timeout cannot be shorter than lock timeout".to_string(),
            ));
        }
        if self.max_page_size > PAGE_SIZE_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max page size cannot exceed {PAGE_SIZE_CEILING}"
            )));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(
                "page size must be between 1 and the max page size".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Unparseable { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_page_size, 50);
    }

    #[test]
    fn test_env_overrides() {
        let config = LedgerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://ledger@db/ledger"),
            ("LEDGER_MAX_CONNECTIONS", "32"),
            ("LEDGER_LOCK_TIMEOUT_MS", "250"),
            ("LEDGER_PAGE_SIZE", "20"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://ledger@db/ledger");
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.default_page_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparseable_value_is_an_error() {
        let err = LedgerConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/ledger"),
            ("LEDGER_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Unparseable {
                var: "LEDGER_MAX_CONNECTIONS",
                value: "many".to_string()
            }
        );
    }

    #[test]
    fn test_missing_database_url() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("LEDGER_PAGE_SIZE", "20")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing { var: "DATABASE_URL" });

        let config =
            LedgerConfig::from_lookup(lookup_from(&[("DATABASE_URL", "")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LedgerConfig::default();
        config.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.statement_timeout = Duration::from_millis(10);
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.default_page_size = 500;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.max_page_size = PAGE_SIZE_CEILING + 1;
        assert!(config.validate().is_err());
        config.max_page_size = PAGE_SIZE_CEILING;
        assert!(config.validate().is_ok());
    }
}
