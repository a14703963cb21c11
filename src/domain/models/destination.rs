//! Destination and archive-connection domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Archive storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Mysql,
    Databend,
}

impl Default for StorageKind {
    fn default() -> Self {
        Self::Mysql
    }
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mysql => "mysql",
            Self::Databend => "databend",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mysql" => Some(Self::Mysql),
            "databend" => Some(Self::Databend),
            _ => None,
        }
    }
}

/// Where archived rows land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub name: String,
    pub bu: String,
    pub storage: StorageKind,
    pub connection_id: i64,
    /// Empty means "same as the source database".
    pub database_name: String,
    /// Template; `{source_table}` and `{YYYY-MM}` are substituted at
    /// supplementation time.
    pub table_name: String,
    pub compress: bool,
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Connection details for an archive store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: i64,
    pub name: String,
    pub bu: String,
    pub storage: StorageKind,
    pub addr: String,
    pub port: u16,
    pub user: String,
    /// Sealed at rest.
    pub passwd: String,
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
