//! Big-table inventory refresh.
//!
//! A full scan can take minutes on a large cluster and must not run twice
//! concurrently; the try-lock makes an in-progress run observable to the
//! second caller instead of queueing it.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::BigTable;
use crate::domain::ports::{ClusterDirectory, ClusterDriver as _};

pub struct BigTableRefresher {
    clusters: Arc<dyn ClusterDirectory>,
    scan_lock: Mutex<()>,
}

impl BigTableRefresher {
    pub fn new(clusters: Arc<dyn ClusterDirectory>) -> Self {
        Self { clusters, scan_lock: Mutex::new(()) }
    }

    /// Scan one cluster for tables above the threshold. Fails fast with
    /// `CLUSTER_COLLECT_RUNNING` when a scan is already in flight.
    pub async fn refresh(&self, cluster_id: &str, threshold_gb: f64) -> Result<Vec<BigTable>, Fault> {
        let _guard = self.scan_lock.try_lock().map_err(|_| {
            Fault::new(codes::CLUSTER_COLLECT_RUNNING, "big-table scan already running")
        })?;

        let driver = self.clusters.driver_for(cluster_id).await?;
        driver.get_cluster_big_tables(threshold_gb).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cluster::{MockClusterDriver, StaticClusterDirectory};
    use crate::domain::ports::ClusterConnectInfo;

    fn refresher() -> (BigTableRefresher, Arc<MockClusterDriver>) {
        let driver = Arc::new(MockClusterDriver::new(ClusterConnectInfo {
            host: "127.0.0.1".into(),
            port: 3306,
            user: "steward".into(),
            password: String::new(),
        }));
        let directory = Arc::new(StaticClusterDirectory::new(driver.clone()));
        (BigTableRefresher::new(directory), driver)
    }

    #[tokio::test]
    async fn test_refresh_returns_big_tables() {
        let (refresher, driver) = refresher();
        driver.set_table_size("shop", "orders", 10 * 1024);
        let big = refresher.refresh("c1", 1.0).await.unwrap();
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].table, "orders");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_observable() {
        let (refresher, _) = refresher();
        let _held = refresher.scan_lock.lock().await;
        let err = refresher.refresh("c1", 1.0).await.unwrap_err();
        assert_eq!(err.code, codes::CLUSTER_COLLECT_RUNNING);
    }
}
