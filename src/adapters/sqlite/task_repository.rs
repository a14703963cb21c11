//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CleaningSpeed, ExecuteWindow, Govern, NotifyPolicy, StorageKind, Task, TaskStatus,
};
use crate::domain::ports::TaskRepository;

use super::util::{format_date, parse_date, parse_opt_datetime, placeholders, parse_datetime};

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_list(&self, query: String, binds: Vec<String>) -> DomainResult<Vec<Task>> {
        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for b in &binds {
            q = q.bind(b);
        }
        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<i64> {
        let result = sqlx::query(
            r#"INSERT INTO tasks (name, description, enable, policy_id, execute_window, execute_date,
               pause, rebuild_flag,
               src_id, src_name, src_bu, src_cluster_name, src_cluster_id, src_database_name,
               src_tables_name, src_columns, src_cluster_free_disk, src_cluster_sum_table_size,
               dest_id, dest_name, dest_storage, dest_connection_id, dest_database_name,
               dest_table_name, dest_compress,
               govern, condition, retain_src_data, cleaning_speed,
               relevant, notify_policy,
               task_result_quantity, task_result_size, task_start_time, task_end_time,
               task_duration, workflow, task_status, task_reason, task_detail,
               need_check_execute_date, creator, editor, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                       ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.enable as i32)
        .bind(task.policy_id)
        .bind(serde_json::to_string(&task.execute_window)?)
        .bind(format_date(task.execute_date))
        .bind(task.pause as i32)
        .bind(task.rebuild_flag as i32)
        .bind(task.src_id)
        .bind(&task.src_name)
        .bind(&task.src_bu)
        .bind(&task.src_cluster_name)
        .bind(&task.src_cluster_id)
        .bind(&task.src_database_name)
        .bind(&task.src_tables_name)
        .bind(&task.src_columns)
        .bind(task.src_cluster_free_disk)
        .bind(task.src_cluster_sum_table_size)
        .bind(task.dest_id)
        .bind(&task.dest_name)
        .bind(task.dest_storage.as_str())
        .bind(task.dest_connection_id)
        .bind(&task.dest_database_name)
        .bind(&task.dest_table_name)
        .bind(task.dest_compress as i32)
        .bind(task.govern.as_str())
        .bind(&task.condition)
        .bind(task.retain_src_data as i32)
        .bind(task.cleaning_speed.as_str())
        .bind(serde_json::to_string(&task.relevant)?)
        .bind(task.notify_policy.as_str())
        .bind(task.task_result_quantity)
        .bind(task.task_result_size)
        .bind(task.task_start_time.map(|t| t.to_rfc3339()))
        .bind(task.task_end_time.map(|t| t.to_rfc3339()))
        .bind(task.task_duration)
        .bind(&task.workflow)
        .bind(task.task_status.as_str())
        .bind(&task.task_reason)
        .bind(&task.task_detail)
        .bind(task.need_check_execute_date as i32)
        .bind(&task.creator)
        .bind(&task.editor)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, task: &Task) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE tasks SET name = ?, description = ?, enable = ?, policy_id = ?,
               execute_window = ?, execute_date = ?, pause = ?, rebuild_flag = ?,
               src_id = ?, src_name = ?, src_bu = ?, src_cluster_name = ?, src_cluster_id = ?,
               src_database_name = ?, src_tables_name = ?, src_columns = ?,
               src_cluster_free_disk = ?, src_cluster_sum_table_size = ?,
               dest_id = ?, dest_name = ?, dest_storage = ?, dest_connection_id = ?,
               dest_database_name = ?, dest_table_name = ?, dest_compress = ?,
               govern = ?, condition = ?, retain_src_data = ?, cleaning_speed = ?,
               relevant = ?, notify_policy = ?,
               task_result_quantity = ?, task_result_size = ?, task_start_time = ?,
               task_end_time = ?, task_duration = ?, workflow = ?, task_status = ?,
               task_reason = ?, task_detail = ?, need_check_execute_date = ?,
               editor = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.enable as i32)
        .bind(task.policy_id)
        .bind(serde_json::to_string(&task.execute_window)?)
        .bind(format_date(task.execute_date))
        .bind(task.pause as i32)
        .bind(task.rebuild_flag as i32)
        .bind(task.src_id)
        .bind(&task.src_name)
        .bind(&task.src_bu)
        .bind(&task.src_cluster_name)
        .bind(&task.src_cluster_id)
        .bind(&task.src_database_name)
        .bind(&task.src_tables_name)
        .bind(&task.src_columns)
        .bind(task.src_cluster_free_disk)
        .bind(task.src_cluster_sum_table_size)
        .bind(task.dest_id)
        .bind(&task.dest_name)
        .bind(task.dest_storage.as_str())
        .bind(task.dest_connection_id)
        .bind(&task.dest_database_name)
        .bind(&task.dest_table_name)
        .bind(task.dest_compress as i32)
        .bind(task.govern.as_str())
        .bind(&task.condition)
        .bind(task.retain_src_data as i32)
        .bind(task.cleaning_speed.as_str())
        .bind(serde_json::to_string(&task.relevant)?)
        .bind(task.notify_policy.as_str())
        .bind(task.task_result_quantity)
        .bind(task.task_result_size)
        .bind(task.task_start_time.map(|t| t.to_rfc3339()))
        .bind(task.task_end_time.map(|t| t.to_rfc3339()))
        .bind(task.task_duration)
        .bind(&task.workflow)
        .bind(task.task_status.as_str())
        .bind(&task.task_reason)
        .bind(&task.task_detail)
        .bind(task.need_check_execute_date as i32)
        .bind(&task.editor)
        .bind(Utc::now().to_rfc3339())
        .bind(task.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(task.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        // Task and its journal go together.
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }
        sqlx::query("DELETE FROM task_change_logs WHERE task_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>> {
        let query = format!(
            "SELECT * FROM tasks WHERE task_status IN ({}) ORDER BY id",
            placeholders(statuses.len())
        );
        let binds = statuses.iter().map(|s| s.as_str().to_string()).collect();
        self.fetch_list(query, binds).await
    }

    async fn list_enabled_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>> {
        let query = format!(
            "SELECT * FROM tasks WHERE enable = 1 AND task_status IN ({}) ORDER BY id",
            placeholders(statuses.len())
        );
        let binds = statuses.iter().map(|s| s.as_str().to_string()).collect();
        self.fetch_list(query, binds).await
    }

    async fn list_for_policy(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>> {
        let query = format!(
            "SELECT * FROM tasks WHERE policy_id = ? AND task_status IN ({}) ORDER BY id",
            placeholders(statuses.len())
        );
        let mut q = sqlx::query_as::<_, TaskRow>(&query).bind(policy_id);
        for s in statuses {
            q = q.bind(s.as_str());
        }
        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn count_for_policy_excluding(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<u64> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks WHERE policy_id = ? AND task_status NOT IN ({})",
            placeholders(statuses.len())
        );
        let mut q = sqlx::query_as::<_, (i64,)>(&query).bind(policy_id);
        for s in statuses {
            q = q.bind(s.as_str());
        }
        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn count_for_policy_in(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<u64> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks WHERE policy_id = ? AND task_status IN ({})",
            placeholders(statuses.len())
        );
        let mut q = sqlx::query_as::<_, (i64,)>(&query).bind(policy_id);
        for s in statuses {
            q = q.bind(s.as_str());
        }
        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn last_for_policy_in(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<Option<Task>> {
        let query = format!(
            "SELECT * FROM tasks WHERE policy_id = ? AND task_status IN ({}) ORDER BY id DESC LIMIT 1",
            placeholders(statuses.len())
        );
        let mut q = sqlx::query_as::<_, TaskRow>(&query).bind(policy_id);
        for s in statuses {
            q = q.bind(s.as_str());
        }
        let row: Option<TaskRow> = q.fetch_optional(&self.pool).await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn count_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<u64> {
        let query = format!(
            "SELECT COUNT(*) FROM tasks WHERE task_status IN ({})",
            placeholders(statuses.len())
        );
        let mut q = sqlx::query_as::<_, (i64,)>(&query);
        for s in statuses {
            q = q.bind(s.as_str());
        }
        let (count,) = q.fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn list_finished_with_workflow_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Task>> {
        let query = format!(
            "SELECT * FROM tasks WHERE task_end_time < ? AND workflow != '' AND task_status IN ({}) ORDER BY id",
            placeholders(TaskStatus::TERMINAL.len())
        );
        let mut binds = vec![cutoff.to_rfc3339()];
        binds.extend(TaskStatus::TERMINAL.iter().map(|s| s.as_str().to_string()));
        self.fetch_list(query, binds).await
    }

    async fn clear_workflow(&self, id: i64) -> DomainResult<()> {
        sqlx::query("UPDATE tasks SET workflow = '' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_need_check_execute_date(&self, policy_id: i64) -> DomainResult<u64> {
        let query = format!(
            "UPDATE tasks SET need_check_execute_date = 1 WHERE policy_id = ? AND task_status IN ({})",
            placeholders(TaskStatus::CAN_UPDATE.len())
        );
        let mut q = sqlx::query(&query).bind(policy_id);
        for s in &TaskStatus::CAN_UPDATE {
            q = q.bind(s.as_str());
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Row from the `tasks` table.
#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    name: String,
    description: String,
    enable: i32,
    policy_id: i64,
    execute_window: String,
    execute_date: String,
    pause: i32,
    rebuild_flag: i32,
    src_id: i64,
    src_name: String,
    src_bu: String,
    src_cluster_name: String,
    src_cluster_id: String,
    src_database_name: String,
    src_tables_name: String,
    src_columns: String,
    src_cluster_free_disk: i64,
    src_cluster_sum_table_size: i64,
    dest_id: i64,
    dest_name: String,
    dest_storage: String,
    dest_connection_id: i64,
    dest_database_name: String,
    dest_table_name: String,
    dest_compress: i32,
    govern: String,
    condition: String,
    retain_src_data: i32,
    cleaning_speed: String,
    relevant: String,
    notify_policy: String,
    task_result_quantity: i64,
    task_result_size: i64,
    task_start_time: Option<String>,
    task_end_time: Option<String>,
    task_duration: i64,
    workflow: String,
    task_status: String,
    task_reason: String,
    task_detail: String,
    need_check_execute_date: i32,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        let bad = |field: &str, value: &str| {
            DomainError::SerializationError(format!("task {}: bad {field} '{value}'", r.id))
        };
        Ok(Task {
            id: r.id,
            name: r.name,
            description: r.description,
            enable: r.enable != 0,
            policy_id: r.policy_id,
            execute_window: serde_json::from_str::<ExecuteWindow>(&r.execute_window)?,
            execute_date: parse_date(&r.execute_date)?,
            pause: r.pause != 0,
            rebuild_flag: r.rebuild_flag != 0,
            src_id: r.src_id,
            src_name: r.src_name,
            src_bu: r.src_bu,
            src_cluster_name: r.src_cluster_name,
            src_cluster_id: r.src_cluster_id,
            src_database_name: r.src_database_name,
            src_tables_name: r.src_tables_name,
            src_columns: r.src_columns,
            src_cluster_free_disk: r.src_cluster_free_disk,
            src_cluster_sum_table_size: r.src_cluster_sum_table_size,
            dest_id: r.dest_id,
            dest_name: r.dest_name,
            dest_storage: StorageKind::from_str(&r.dest_storage)
                .ok_or_else(|| bad("dest_storage", &r.dest_storage))?,
            dest_connection_id: r.dest_connection_id,
            dest_database_name: r.dest_database_name,
            dest_table_name: r.dest_table_name,
            dest_compress: r.dest_compress != 0,
            govern: Govern::from_str(&r.govern).ok_or_else(|| bad("govern", &r.govern))?,
            condition: r.condition,
            retain_src_data: r.retain_src_data != 0,
            cleaning_speed: CleaningSpeed::from_str(&r.cleaning_speed)
                .ok_or_else(|| bad("cleaning_speed", &r.cleaning_speed))?,
            relevant: serde_json::from_str(&r.relevant)?,
            notify_policy: NotifyPolicy::from_str(&r.notify_policy)
                .ok_or_else(|| bad("notify_policy", &r.notify_policy))?,
            task_result_quantity: r.task_result_quantity,
            task_result_size: r.task_result_size,
            task_start_time: parse_opt_datetime(r.task_start_time.as_deref())?,
            task_end_time: parse_opt_datetime(r.task_end_time.as_deref())?,
            task_duration: r.task_duration,
            workflow: r.workflow,
            task_status: TaskStatus::from_str(&r.task_status)
                .ok_or_else(|| bad("task_status", &r.task_status))?,
            task_reason: r.task_reason,
            task_detail: r.task_detail,
            need_check_execute_date: r.need_check_execute_date != 0,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}
