//! SQLite implementation of the ConfigRepository. One row, id = 1.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConflictLevel, NoticeKind, RuntimeConfig};
use crate::domain::ports::ConfigRepository;

#[derive(Clone)]
pub struct SqliteConfigRepository {
    pool: SqlitePool,
}

impl SqliteConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigRepository for SqliteConfigRepository {
    async fn load(&self) -> DomainResult<Option<RuntimeConfig>> {
        let row: Option<ConfigRow> = sqlx::query_as("SELECT * FROM config WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, config: &RuntimeConfig) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT OR REPLACE INTO config
               (id, cluster_default_user, cluster_default_passwd, cluster_exclude_database,
                cluster_exclude_tables, task_max_parallel, task_timeout, task_conflict_level,
                task_conflict_max, workflow_retention_days, source_status_detect,
                source_status_detect_disk_usage, notice, email_host, email_port, email_username,
                email_password, email_insecure_skip_verify)
               VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&config.cluster_default_user)
        .bind(&config.cluster_default_passwd)
        .bind(&config.cluster_exclude_database)
        .bind(&config.cluster_exclude_tables)
        .bind(config.task_max_parallel as i64)
        .bind(config.task_timeout as i64)
        .bind(config.task_conflict_level.as_str())
        .bind(config.task_conflict_max as i64)
        .bind(config.workflow_retention_days as i64)
        .bind(config.source_status_detect as i32)
        .bind(config.source_status_detect_disk_usage as i64)
        .bind(config.notice.as_str())
        .bind(&config.email_host)
        .bind(config.email_port as i64)
        .bind(&config.email_username)
        .bind(&config.email_password)
        .bind(config.email_insecure_skip_verify as i32)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_or_seed(&self) -> DomainResult<RuntimeConfig> {
        if let Some(config) = self.load().await? {
            return Ok(config);
        }
        let defaults = RuntimeConfig::default();
        self.save(&defaults).await?;
        Ok(defaults)
    }
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    #[allow(dead_code)]
    id: i64,
    cluster_default_user: String,
    cluster_default_passwd: String,
    cluster_exclude_database: String,
    cluster_exclude_tables: String,
    task_max_parallel: i64,
    task_timeout: i64,
    task_conflict_level: String,
    task_conflict_max: i64,
    workflow_retention_days: i64,
    source_status_detect: i32,
    source_status_detect_disk_usage: i64,
    notice: String,
    email_host: String,
    email_port: i64,
    email_username: String,
    email_password: String,
    email_insecure_skip_verify: i32,
}

impl TryFrom<ConfigRow> for RuntimeConfig {
    type Error = DomainError;

    fn try_from(r: ConfigRow) -> Result<Self, Self::Error> {
        Ok(RuntimeConfig {
            cluster_default_user: r.cluster_default_user,
            cluster_default_passwd: r.cluster_default_passwd,
            cluster_exclude_database: r.cluster_exclude_database,
            cluster_exclude_tables: r.cluster_exclude_tables,
            task_max_parallel: r.task_max_parallel as u32,
            task_timeout: r.task_timeout as u64,
            task_conflict_level: ConflictLevel::from_str(&r.task_conflict_level).ok_or_else(|| {
                DomainError::SerializationError(format!(
                    "config: bad task_conflict_level '{}'",
                    r.task_conflict_level
                ))
            })?,
            task_conflict_max: r.task_conflict_max as u32,
            workflow_retention_days: r.workflow_retention_days as u32,
            source_status_detect: r.source_status_detect != 0,
            source_status_detect_disk_usage: r.source_status_detect_disk_usage as u8,
            notice: NoticeKind::from_str(&r.notice).ok_or_else(|| {
                DomainError::SerializationError(format!("config: bad notice '{}'", r.notice))
            })?,
            email_host: r.email_host,
            email_port: r.email_port as u16,
            email_username: r.email_username,
            email_password: r.email_password,
            email_insecure_skip_verify: r.email_insecure_skip_verify != 0,
        })
    }
}
