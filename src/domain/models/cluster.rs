//! Source cluster domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered source database cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: i64,
    pub name: String,
    /// Stable external identifier referenced by sources and tasks.
    pub cluster_id: String,
    /// Driver selection tag, e.g. "mysql" or "mock". Unknown tags resolve to
    /// the unsupported sentinel driver.
    pub cluster_kind: String,
    /// Where the cluster record came from ("customized" for hand-entered).
    pub import_from: String,
    pub service_addr: String,
    pub service_port: u16,
    /// Empty means fall back to the runtime-config default credentials.
    pub user: String,
    /// Sealed at rest; empty means fall back to the default credentials.
    pub passwd: String,
    pub description: String,
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A large table surfaced by a cluster scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BigTable {
    pub database: String,
    pub table: String,
    pub size_gb: f64,
}
