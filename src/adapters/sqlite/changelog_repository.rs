//! SQLite implementation of the ChangeLogRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{TaskChangeLog, TaskStatus};
use crate::domain::ports::ChangeLogRepository;

use super::util::parse_datetime;

#[derive(Clone)]
pub struct SqliteChangeLogRepository {
    pool: SqlitePool,
}

impl SqliteChangeLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeLogRepository for SqliteChangeLogRepository {
    async fn append(&self, log: &TaskChangeLog) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO task_change_logs (task_id, time, user_name, task_status, content)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(log.task_id)
        .bind(log.time.to_rfc3339())
        .bind(&log.user_name)
        .bind(log.task_status.as_str())
        .bind(&log.content)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_for_task(&self, task_id: i64) -> DomainResult<Vec<TaskChangeLog>> {
        let rows: Vec<ChangeLogRow> =
            sqlx::query_as("SELECT * FROM task_change_logs WHERE task_id = ? ORDER BY id")
                .bind(task_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ChangeLogRow {
    id: i64,
    task_id: i64,
    time: String,
    user_name: String,
    task_status: String,
    content: String,
}

impl TryFrom<ChangeLogRow> for TaskChangeLog {
    type Error = DomainError;

    fn try_from(r: ChangeLogRow) -> Result<Self, Self::Error> {
        Ok(TaskChangeLog {
            id: r.id,
            task_id: r.task_id,
            time: parse_datetime(&r.time)?,
            user_name: r.user_name,
            task_status: TaskStatus::from_str(&r.task_status).ok_or_else(|| {
                DomainError::SerializationError(format!(
                    "change log {}: bad task_status '{}'",
                    r.id, r.task_status
                ))
            })?,
            content: r.content,
        })
    }
}
