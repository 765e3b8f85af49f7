//! Application configuration

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration")]
    Load(#[from] config::ConfigError),
}

/// Process configuration
///
/// Lending thresholds are not part of this; they come from the active policy row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub port: u16,
    /// Connection pool size
    pub max_connections: u32,
    /// Fallback filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/library".to_string(),
            port: 3000,
            max_connections: 5,
            log_filter: "library_lending=debug,tower_http=debug".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from `DATABASE_URL`, `PORT`, `MAX_CONNECTIONS` and `LOG_FILTER`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config::Environment::default())
    }

    fn load(environment: config::Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = config::Config::builder()
            .set_default("database_url", defaults.database_url)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .set_default("log_filter", defaults.log_filter)?
            .add_source(environment.try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Returns the listen address
    pub fn server_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        config::Environment::default().source(Some(source))
    }

    #[test]
    fn test_defaults_apply_when_environment_is_empty() {
        let config = AppConfig::load(environment(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_environment_overrides_defaults() {
        let config = AppConfig::load(environment(&[
            ("DATABASE_URL", "postgres://db/lending"),
            ("PORT", "8081"),
            ("MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://db/lending");
        assert_eq!(config.port, 8081);
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_filter, AppConfig::default().log_filter);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::load(environment(&[("PORT", "not-a-port")]));
        assert!(result.is_err());
    }
}
