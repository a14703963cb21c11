//! Cluster driver selection.
//!
//! Drivers are chosen by the cluster's kind tag at lookup time; unknown
//! kinds resolve to the unsupported sentinel so callers get a coded error
//! instead of a missing implementation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::{codes, Fault};
use crate::domain::ports::{
    ClusterConnectInfo, ClusterDirectory, ClusterDriver, ClusterRepository, ConfigRepository,
};
use crate::infrastructure::credentials;

use super::mock::MockClusterDriver;
use super::unsupported::UnsupportedClusterDriver;

/// Production directory: resolves cluster rows from the store, applies the
/// default-credential fallback and exclude lists from runtime config.
pub struct StoreClusterDirectory {
    clusters: Arc<dyn ClusterRepository>,
    config: Arc<dyn ConfigRepository>,
    /// Sealing key source; the same secret the JWTs are signed with.
    secret: String,
}

impl StoreClusterDirectory {
    pub fn new(clusters: Arc<dyn ClusterRepository>, config: Arc<dyn ConfigRepository>, secret: impl Into<String>) -> Self {
        Self { clusters, config, secret: secret.into() }
    }
}

#[async_trait]
impl ClusterDirectory for StoreClusterDirectory {
    async fn driver_for(&self, cluster_id: &str) -> Result<Arc<dyn ClusterDriver>, Fault> {
        let cluster = self
            .clusters
            .get_by_cluster_id(cluster_id)
            .await
            .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?
            .ok_or_else(|| Fault::new(codes::CLUSTER_NOT_EXIST, format!("cluster ({cluster_id})")))?;

        let config = self
            .config
            .load_or_seed()
            .await
            .map_err(|e| Fault::new(codes::CONFIG_ERR, e.to_string()))?;

        let (user, sealed) = if cluster.user.is_empty() {
            (config.cluster_default_user.clone(), config.cluster_default_passwd.clone())
        } else {
            (cluster.user.clone(), cluster.passwd.clone())
        };
        let password = if sealed.is_empty() {
            String::new()
        } else {
            credentials::unseal(&sealed, &self.secret)
                .map_err(|e| Fault::new(codes::DECRYPT_PASSWD_ERR, e.to_string()))?
        };

        let connect = ClusterConnectInfo {
            host: cluster.service_addr.clone(),
            port: cluster.service_port,
            user,
            password,
        };

        match cluster.cluster_kind.as_str() {
            "mock" => Ok(Arc::new(
                MockClusterDriver::new(connect)
                    .with_excludes(config.excluded_databases(), config.excluded_tables()),
            )),
            other => Ok(Arc::new(UnsupportedClusterDriver::new(other))),
        }
    }
}

/// Test directory: hands out one fixed driver for every cluster id.
pub struct StaticClusterDirectory {
    driver: Arc<dyn ClusterDriver>,
}

impl StaticClusterDirectory {
    pub fn new(driver: Arc<dyn ClusterDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl ClusterDirectory for StaticClusterDirectory {
    async fn driver_for(&self, _cluster_id: &str) -> Result<Arc<dyn ClusterDriver>, Fault> {
        Ok(self.driver.clone())
    }
}
