//! SQLite implementation of the PolicyRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CleaningSpeed, ExecuteWindow, Govern, NotifyPolicy, Period, Policy};
use crate::domain::ports::PolicyRepository;

use super::util::parse_datetime;

#[derive(Clone)]
pub struct SqlitePolicyRepository {
    pool: SqlitePool,
}

impl SqlitePolicyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyRepository for SqlitePolicyRepository {
    async fn create(&self, policy: &Policy) -> DomainResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO policies (name, description, bu, enable, period, day, execute_window,
               pause, rebuild_flag, cleaning_speed, src_id, govern, condition, archive_scope,
               retain_src_data, dest_id, relevant, notify_policy, creator, editor, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&policy.name)
        .bind(&policy.description)
        .bind(&policy.bu)
        .bind(policy.enable as i32)
        .bind(policy.period.as_str())
        .bind(policy.day as i64)
        .bind(serde_json::to_string(&policy.execute_window)?)
        .bind(policy.pause as i32)
        .bind(policy.rebuild_flag as i32)
        .bind(policy.cleaning_speed.as_str())
        .bind(policy.src_id)
        .bind(policy.govern.as_str())
        .bind(&policy.condition)
        .bind(&policy.archive_scope)
        .bind(policy.retain_src_data as i32)
        .bind(policy.dest_id)
        .bind(serde_json::to_string(&policy.relevant)?)
        .bind(policy.notify_policy.as_str())
        .bind(&policy.creator)
        .bind(&policy.editor)
        .bind(policy.created_at.to_rfc3339())
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Policy>> {
        let row: Option<PolicyRow> = sqlx::query_as("SELECT * FROM policies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, policy: &Policy) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE policies SET name = ?, description = ?, bu = ?, enable = ?, period = ?,
               day = ?, execute_window = ?, pause = ?, rebuild_flag = ?, cleaning_speed = ?,
               src_id = ?, govern = ?, condition = ?, archive_scope = ?, retain_src_data = ?,
               dest_id = ?, relevant = ?, notify_policy = ?, editor = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&policy.name)
        .bind(&policy.description)
        .bind(&policy.bu)
        .bind(policy.enable as i32)
        .bind(policy.period.as_str())
        .bind(policy.day as i64)
        .bind(serde_json::to_string(&policy.execute_window)?)
        .bind(policy.pause as i32)
        .bind(policy.rebuild_flag as i32)
        .bind(policy.cleaning_speed.as_str())
        .bind(policy.src_id)
        .bind(policy.govern.as_str())
        .bind(&policy.condition)
        .bind(&policy.archive_scope)
        .bind(policy.retain_src_data as i32)
        .bind(policy.dest_id)
        .bind(serde_json::to_string(&policy.relevant)?)
        .bind(policy.notify_policy.as_str())
        .bind(&policy.editor)
        .bind(Utc::now().to_rfc3339())
        .bind(policy.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::PolicyNotFound(policy.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        // Policy delete cascades to its revision rows.
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM policies WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::PolicyNotFound(id));
        }
        sqlx::query("DELETE FROM revisions WHERE kind = 'policy' AND entity_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_enabled(&self) -> DomainResult<Vec<Policy>> {
        let rows: Vec<PolicyRow> = sqlx::query_as("SELECT * FROM policies WHERE enable = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn set_enable(&self, id: i64, enable: bool) -> DomainResult<()> {
        let result = sqlx::query("UPDATE policies SET enable = ?, updated_at = ? WHERE id = ?")
            .bind(enable as i32)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::PolicyNotFound(id));
        }
        Ok(())
    }
}

/// Row from the `policies` table.
#[derive(sqlx::FromRow)]
struct PolicyRow {
    id: i64,
    name: String,
    description: String,
    bu: String,
    enable: i32,
    period: String,
    day: i64,
    execute_window: String,
    pause: i32,
    rebuild_flag: i32,
    cleaning_speed: String,
    src_id: i64,
    govern: String,
    condition: String,
    archive_scope: String,
    retain_src_data: i32,
    dest_id: i64,
    relevant: String,
    notify_policy: String,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<PolicyRow> for Policy {
    type Error = DomainError;

    fn try_from(r: PolicyRow) -> Result<Self, Self::Error> {
        let bad = |field: &str, value: &str| {
            DomainError::SerializationError(format!("policy {}: bad {field} '{value}'", r.id))
        };
        Ok(Policy {
            id: r.id,
            name: r.name,
            description: r.description,
            bu: r.bu,
            enable: r.enable != 0,
            period: Period::from_str(&r.period).ok_or_else(|| bad("period", &r.period))?,
            day: r.day as u32,
            execute_window: serde_json::from_str::<ExecuteWindow>(&r.execute_window)?,
            pause: r.pause != 0,
            rebuild_flag: r.rebuild_flag != 0,
            cleaning_speed: CleaningSpeed::from_str(&r.cleaning_speed)
                .ok_or_else(|| bad("cleaning_speed", &r.cleaning_speed))?,
            src_id: r.src_id,
            govern: Govern::from_str(&r.govern).ok_or_else(|| bad("govern", &r.govern))?,
            condition: r.condition,
            archive_scope: r.archive_scope,
            retain_src_data: r.retain_src_data != 0,
            dest_id: r.dest_id,
            relevant: serde_json::from_str(&r.relevant)?,
            notify_policy: NotifyPolicy::from_str(&r.notify_policy)
                .ok_or_else(|| bad("notify_policy", &r.notify_policy))?,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}
