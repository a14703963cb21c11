//! Process configuration (file + environment), distinct from the runtime
//! tunables stored in the database.

pub mod loader;

use serde::{Deserialize, Serialize};

use crate::adapters::workflow::ArgoTemplates;

pub use loader::{ConfigError, ConfigLoader};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub workflow: WorkflowConfig,
    pub jobs: JobsConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            workflow: WorkflowConfig::default(),
            jobs: JobsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP server.
    pub listen_addr: String,
    /// Externally reachable base URL; used in callback URLs and links.
    pub external_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            external_addr: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".datasteward/datasteward.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Signing secret for JWTs; also the sealing key source for stored
    /// cluster credentials.
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: "datasteward-dev-secret".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Driver tag: "argo", "mock"; anything else resolves to the
    /// unsupported sentinel.
    pub driver: String,
    pub argo_url: String,
    pub argo_token: String,
    pub argo_templates: ArgoTemplates,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            driver: "mock".to_string(),
            argo_url: String::new(),
            argo_token: String::new(),
            argo_templates: ArgoTemplates::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// 6-field cron (with seconds) for the daily reconciliation sweep.
    pub reconcile_policies_cron: String,
    /// Cron for the pre-exec scan of scheduled tasks.
    pub check_scheduled_cron: String,
    /// Cron for workflow artifact cleanup.
    pub clean_workflows_cron: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            reconcile_policies_cron: "0 0 2 * * *".to_string(),
            check_scheduled_cron: "0 0 * * * *".to_string(),
            clean_workflows_cron: "0 30 3 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}
