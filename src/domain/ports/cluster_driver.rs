//! Cluster driver port: everything the scheduler asks a source database
//! cluster, one implementation per cluster kind.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::Fault;
use crate::domain::models::BigTable;

/// Resolved connection endpoint with plaintext credentials, handed to the
/// workflow driver at dispatch.
#[derive(Debug, Clone)]
pub struct ClusterConnectInfo {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Endpoint plus unsealed credentials.
    async fn cluster_info(&self) -> Result<ClusterConnectInfo, Fault>;

    async fn test_connect(&self) -> Result<(), Fault>;

    /// Database names, exclude-list already applied.
    async fn get_databases(&self) -> Result<Vec<String>, Fault>;

    /// Table names in one database, exclude-list already applied.
    async fn get_tables(&self, database: &str) -> Result<Vec<String>, Fault>;

    /// Ok when every listed table has a primary key.
    async fn tables_have_primary_key(&self, database: &str, tables: &[String]) -> Result<(), Fault>;

    /// Validate the predicate via an index-aware explain; returns the
    /// advisory max affected rows.
    async fn sql_explain(
        &self,
        database: &str,
        table: &str,
        columns: &str,
        condition: &str,
    ) -> Result<u64, Fault>;

    /// Summed size of the given tables in MB.
    async fn get_tables_size(&self, database: &str, tables: &[String]) -> Result<i64, Fault>;

    /// Free disk in MB.
    async fn get_free_disk(&self) -> Result<i64, Fault>;

    /// Disk usage percentage.
    async fn get_disk_usage(&self) -> Result<u8, Fault>;

    /// Used disk in MB.
    async fn get_disk_used(&self) -> Result<i64, Fault>;

    /// Tables larger than the threshold, for inventory scans.
    async fn get_cluster_big_tables(&self, threshold_gb: f64) -> Result<Vec<BigTable>, Fault>;
}

/// Resolves the driver for a cluster by its external id. The production
/// implementation looks the cluster up in the store and selects by its kind
/// tag; tests substitute a fixed driver.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    async fn driver_for(&self, cluster_id: &str) -> Result<Arc<dyn ClusterDriver>, Fault>;
}
