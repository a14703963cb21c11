//! Sentinel driver for cluster kinds without an implementation. Every call
//! fails with a specific code instead of panicking at selection time.

use async_trait::async_trait;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::BigTable;
use crate::domain::ports::{ClusterConnectInfo, ClusterDriver};

pub struct UnsupportedClusterDriver {
    kind: String,
}

impl UnsupportedClusterDriver {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    fn fault(&self) -> Fault {
        Fault::new(codes::CLUSTER_UNSUPPORTED, format!("cluster kind ({})", self.kind))
    }
}

#[async_trait]
impl ClusterDriver for UnsupportedClusterDriver {
    async fn cluster_info(&self) -> Result<ClusterConnectInfo, Fault> {
        Err(self.fault())
    }

    async fn test_connect(&self) -> Result<(), Fault> {
        Err(self.fault())
    }

    async fn get_databases(&self) -> Result<Vec<String>, Fault> {
        Err(self.fault())
    }

    async fn get_tables(&self, _database: &str) -> Result<Vec<String>, Fault> {
        Err(self.fault())
    }

    async fn tables_have_primary_key(&self, _database: &str, _tables: &[String]) -> Result<(), Fault> {
        Err(self.fault())
    }

    async fn sql_explain(
        &self,
        _database: &str,
        _table: &str,
        _columns: &str,
        _condition: &str,
    ) -> Result<u64, Fault> {
        Err(self.fault())
    }

    async fn get_tables_size(&self, _database: &str, _tables: &[String]) -> Result<i64, Fault> {
        Err(self.fault())
    }

    async fn get_free_disk(&self) -> Result<i64, Fault> {
        Err(self.fault())
    }

    async fn get_disk_usage(&self) -> Result<u8, Fault> {
        Err(self.fault())
    }

    async fn get_disk_used(&self) -> Result<i64, Fault> {
        Err(self.fault())
    }

    async fn get_cluster_big_tables(&self, _threshold_gb: f64) -> Result<Vec<BigTable>, Fault> {
        Err(self.fault())
    }
}
