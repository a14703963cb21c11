//! Runtime-tunable configuration, stored as a singleton row and re-read by
//! every scheduler pass (no in-memory caching).

use serde::{Deserialize, Serialize};

/// Key by which executing tasks are grouped for the conflict cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictLevel {
    Cluster,
    Database,
    Table,
}

impl Default for ConflictLevel {
    fn default() -> Self {
        Self::Cluster
    }
}

impl ConflictLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cluster => "cluster",
            Self::Database => "database",
            Self::Table => "table",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cluster" => Some(Self::Cluster),
            "database" => Some(Self::Database),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

/// Notification transport selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Structured log lines only; the default until a transport is configured.
    Log,
    Email,
}

impl Default for NoticeKind {
    fn default() -> Self {
        Self::Log
    }
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Email => "email",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "log" => Some(Self::Log),
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// The singleton runtime configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // -- Cluster access --
    /// Fallback credentials for clusters without their own.
    pub cluster_default_user: String,
    /// Sealed at rest.
    pub cluster_default_passwd: String,
    /// Comma-separated database blacklist applied to cluster listings.
    pub cluster_exclude_database: String,
    /// Comma-separated `db.table` / `table` blacklist.
    pub cluster_exclude_tables: String,

    // -- Task execution --
    pub task_max_parallel: u32,
    /// Seconds before an executing workflow is declared timed out.
    pub task_timeout: u64,
    pub task_conflict_level: ConflictLevel,
    pub task_conflict_max: u32,
    pub workflow_retention_days: u32,

    // -- Source protection --
    pub source_status_detect: bool,
    /// Disk-usage percentage above which in-flight workflows are stopped.
    pub source_status_detect_disk_usage: u8,

    // -- Notification transport --
    pub notice: NoticeKind,
    pub email_host: String,
    pub email_port: u16,
    pub email_username: String,
    pub email_password: String,
    pub email_insecure_skip_verify: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cluster_default_user: String::new(),
            cluster_default_passwd: String::new(),
            cluster_exclude_database: String::new(),
            cluster_exclude_tables: String::new(),
            task_max_parallel: 3,
            task_timeout: 604_800,
            task_conflict_level: ConflictLevel::Cluster,
            task_conflict_max: 1,
            workflow_retention_days: 30,
            source_status_detect: false,
            source_status_detect_disk_usage: 95,
            notice: NoticeKind::Log,
            email_host: String::new(),
            email_port: 0,
            email_username: String::new(),
            email_password: String::new(),
            email_insecure_skip_verify: false,
        }
    }
}

impl RuntimeConfig {
    pub fn excluded_databases(&self) -> Vec<String> {
        split_csv(&self.cluster_exclude_database)
    }

    pub fn excluded_tables(&self) -> Vec<String> {
        split_csv(&self.cluster_exclude_tables)
    }
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Drop excluded tables from a listing. Exclusions may be bare table names
/// or qualified `database.table` entries.
pub fn filter_excluded_tables(database: &str, tables: Vec<String>, excluded: &[String]) -> Vec<String> {
    tables
        .into_iter()
        .filter(|table| {
            !excluded.iter().any(|e| match e.split_once('.') {
                None => e == table,
                Some((db, t)) => db == database && t == table,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bootstrap() {
        let c = RuntimeConfig::default();
        assert_eq!(c.task_max_parallel, 3);
        assert_eq!(c.task_timeout, 604_800);
        assert_eq!(c.task_conflict_level, ConflictLevel::Cluster);
        assert_eq!(c.task_conflict_max, 1);
        assert_eq!(c.workflow_retention_days, 30);
        assert_eq!(c.source_status_detect_disk_usage, 95);
        assert!(!c.source_status_detect);
    }

    #[test]
    fn test_exclude_lists_parse() {
        let c = RuntimeConfig {
            cluster_exclude_database: "mysql, information_schema,".into(),
            cluster_exclude_tables: "tmp_load, shop.audit".into(),
            ..Default::default()
        };
        assert_eq!(c.excluded_databases(), vec!["mysql", "information_schema"]);
        assert_eq!(c.excluded_tables(), vec!["tmp_load", "shop.audit"]);
    }

    #[test]
    fn test_filter_excluded_tables() {
        let excluded = vec!["tmp_load".to_string(), "shop.audit".to_string()];
        let tables = vec!["orders".to_string(), "tmp_load".to_string(), "audit".to_string()];
        assert_eq!(
            filter_excluded_tables("shop", tables.clone(), &excluded),
            vec!["orders"]
        );
        // The qualified exclusion only applies to its own database.
        assert_eq!(
            filter_excluded_tables("crm", tables, &excluded),
            vec!["orders", "audit"]
        );
    }
}
