//! In-memory cluster driver: the test double and the default for clusters
//! registered with the "mock" kind.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::{filter_excluded_tables, BigTable};
use crate::domain::ports::{ClusterConnectInfo, ClusterDriver};

#[derive(Debug, Default)]
struct MockState {
    /// database -> tables
    databases: HashMap<String, Vec<String>>,
    /// tables without a primary key
    missing_primary_key: HashSet<String>,
    /// database.table -> size MB
    table_sizes: HashMap<String, i64>,
    free_disk_mb: i64,
    disk_usage_pct: u8,
    disk_used_mb: i64,
    explain_rows: u64,
    /// When set, every call fails with this fault.
    unreachable: Option<Fault>,
}

/// Configurable in-memory cluster.
pub struct MockClusterDriver {
    connect: ClusterConnectInfo,
    excluded_databases: Vec<String>,
    excluded_tables: Vec<String>,
    state: Mutex<MockState>,
}

impl MockClusterDriver {
    pub fn new(connect: ClusterConnectInfo) -> Self {
        Self {
            connect,
            excluded_databases: vec![],
            excluded_tables: vec![],
            state: Mutex::new(MockState {
                free_disk_mb: 1024 * 1024,
                disk_usage_pct: 10,
                disk_used_mb: 0,
                explain_rows: 0,
                ..Default::default()
            }),
        }
    }

    pub fn with_excludes(mut self, databases: Vec<String>, tables: Vec<String>) -> Self {
        self.excluded_databases = databases;
        self.excluded_tables = tables;
        self
    }

    pub fn add_database(&self, database: &str, tables: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .databases
            .insert(database.to_string(), tables.iter().map(|t| t.to_string()).collect());
    }

    pub fn set_table_size(&self, database: &str, table: &str, size_mb: i64) {
        let mut state = self.state.lock().unwrap();
        state.table_sizes.insert(format!("{database}.{table}"), size_mb);
    }

    pub fn set_free_disk(&self, mb: i64) {
        self.state.lock().unwrap().free_disk_mb = mb;
    }

    pub fn set_disk_usage(&self, pct: u8) {
        self.state.lock().unwrap().disk_usage_pct = pct;
    }

    pub fn drop_primary_key(&self, table: &str) {
        self.state.lock().unwrap().missing_primary_key.insert(table.to_string());
    }

    pub fn restore_primary_key(&self, table: &str) {
        self.state.lock().unwrap().missing_primary_key.remove(table);
    }

    pub fn set_explain_rows(&self, rows: u64) {
        self.state.lock().unwrap().explain_rows = rows;
    }

    pub fn set_unreachable(&self, fault: Option<Fault>) {
        self.state.lock().unwrap().unreachable = fault;
    }

    fn check_reachable(&self) -> Result<(), Fault> {
        match &self.state.lock().unwrap().unreachable {
            Some(f) => Err(f.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterDriver for MockClusterDriver {
    async fn cluster_info(&self) -> Result<ClusterConnectInfo, Fault> {
        self.check_reachable()?;
        Ok(self.connect.clone())
    }

    async fn test_connect(&self) -> Result<(), Fault> {
        self.check_reachable()
    }

    async fn get_databases(&self) -> Result<Vec<String>, Fault> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        let mut names: Vec<String> = state
            .databases
            .keys()
            .filter(|db| !self.excluded_databases.contains(db))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn get_tables(&self, database: &str) -> Result<Vec<String>, Fault> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        let tables = state.databases.get(database).cloned().unwrap_or_default();
        Ok(filter_excluded_tables(database, tables, &self.excluded_tables))
    }

    async fn tables_have_primary_key(&self, _database: &str, tables: &[String]) -> Result<(), Fault> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        for table in tables {
            if state.missing_primary_key.contains(table) {
                return Err(Fault::new(
                    codes::SOURCE_TABLE_NO_PRIMARY_KEY,
                    format!("table ({table}) has no primary key"),
                ));
            }
        }
        Ok(())
    }

    async fn sql_explain(
        &self,
        _database: &str,
        _table: &str,
        _columns: &str,
        _condition: &str,
    ) -> Result<u64, Fault> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().explain_rows)
    }

    async fn get_tables_size(&self, database: &str, tables: &[String]) -> Result<i64, Fault> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(tables
            .iter()
            .map(|t| state.table_sizes.get(&format!("{database}.{t}")).copied().unwrap_or(0))
            .sum())
    }

    async fn get_free_disk(&self) -> Result<i64, Fault> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().free_disk_mb)
    }

    async fn get_disk_usage(&self) -> Result<u8, Fault> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().disk_usage_pct)
    }

    async fn get_disk_used(&self) -> Result<i64, Fault> {
        self.check_reachable()?;
        Ok(self.state.lock().unwrap().disk_used_mb)
    }

    async fn get_cluster_big_tables(&self, threshold_gb: f64) -> Result<Vec<BigTable>, Fault> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        let mut big: Vec<BigTable> = state
            .table_sizes
            .iter()
            .filter_map(|(key, size_mb)| {
                let size_gb = *size_mb as f64 / 1024.0;
                if size_gb <= threshold_gb {
                    return None;
                }
                let (database, table) = key.split_once('.')?;
                Some(BigTable {
                    database: database.to_string(),
                    table: table.to_string(),
                    size_gb,
                })
            })
            .collect();
        big.sort_by(|a, b| b.size_gb.total_cmp(&a.size_gb));
        Ok(big)
    }
}
