//! Configuration loader with hierarchical merging.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::str::FromStr;
use thiserror::Error;

use super::AppConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Listen address cannot be empty")]
    EmptyListenAddr,

    #[error("External address cannot be empty")]
    EmptyExternalAddr,

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("JWT secret cannot be empty")]
    EmptyJwtSecret,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid cron expression for {job}: {expression}")]
    InvalidCron { job: &'static str, expression: String },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. .datasteward/config.yaml
    /// 3. .datasteward/local.yaml (optional overrides)
    /// 4. Environment variables (DATASTEWARD_* prefix)
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(".datasteward/config.yaml"))
            .merge(Yaml::file(".datasteward/local.yaml"))
            .merge(Env::prefixed("DATASTEWARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("DATASTEWARD_").split("__"))
            .extract()
            .context(format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.server.listen_addr.is_empty() {
            return Err(ConfigError::EmptyListenAddr);
        }
        if config.server.external_addr.is_empty() {
            return Err(ConfigError::EmptyExternalAddr);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        if config.auth.jwt_secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        for (job, expression) in [
            ("reconcile_policies_cron", &config.jobs.reconcile_policies_cron),
            ("check_scheduled_cron", &config.jobs.check_scheduled_cron),
            ("clean_workflows_cron", &config.jobs.clean_workflows_cron),
        ] {
            if cron::Schedule::from_str(expression).is_err() {
                return Err(ConfigError::InvalidCron { job, expression: expression.clone() });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database.path, ".datasteward/datasteward.db");
        assert_eq!(config.workflow.driver, "mock");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
server:
  listen_addr: 0.0.0.0:9090
  external_addr: https://steward.example.com
database:
  path: /var/lib/datasteward/steward.db
workflow:
  driver: argo
  argo_url: https://argo.example.com
jobs:
  reconcile_policies_cron: "0 0 4 * * *"
logging:
  level: debug
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.server.listen_addr, "0.0.0.0:9090");
        assert_eq!(config.workflow.driver, "argo");
        assert_eq!(config.jobs.reconcile_policies_cron, "0 0 4 * * *");
        // Unspecified sections keep their defaults.
        assert_eq!(config.jobs.check_scheduled_cron, "0 0 * * * *");
        assert_eq!(config.logging.format, "pretty");
        ConfigLoader::validate(&config).expect("config should be valid");
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let mut config = AppConfig::default();
        config.jobs.check_scheduled_cron = "every hour".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCron { job: "check_scheduled_cron", .. })
        ));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(_))));
    }
}
