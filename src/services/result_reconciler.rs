//! Result reconciler: workflow status ingestion, timeout and cleanup.
//!
//! Two inputs feed the same terminal transition: the polling pass (driver
//! status + timeout) and the authenticated callback. Either way the task is
//! finalized, journaled, notified, and its policy re-enqueued so the next
//! period's task materializes promptly.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::errors::{codes, DomainResult, Fault};
use crate::domain::models::{Task, TaskStatus};
use crate::domain::ports::{
    Clock as _, ClusterDirectory as _, ClusterDriver as _, ConfigRepository as _,
    TaskRepository as _, WorkflowDriver as _, WorkflowStatus,
};

use super::changelog;
use super::queue::PolicyHandle;
use super::{SchedulerContext, SYSTEM_USER};

/// Callback body for `PUT /task/result`. Absent numeric fields mean "not
/// supplied"; the reconciler then derives them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResultUpdate {
    pub id: i64,
    pub task_status: String,
    #[serde(default)]
    pub task_reason: String,
    #[serde(default)]
    pub task_detail: String,
    #[serde(default)]
    pub task_result_quantity: Option<i64>,
    #[serde(default)]
    pub task_result_size: Option<i64>,
    /// "YYYY-MM-DD HH:MM:SS"
    #[serde(default)]
    pub task_start_time: String,
    #[serde(default)]
    pub task_end_time: String,
}

pub struct ResultReconciler {
    ctx: Arc<SchedulerContext>,
}

impl ResultReconciler {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// Polling pass over every executing task: map driver status, apply the
    /// timeout, finalize what finished. One task's failure never stops the
    /// pass.
    pub async fn poll_pass(&self) -> DomainResult<()> {
        let ctx = &self.ctx;
        let config = ctx.config.load_or_seed().await?;
        let executing = ctx.tasks.list_by_status(&[TaskStatus::Executing]).await?;

        for mut task in executing {
            let status = match ctx.workflow.workflow_status(&task.workflow).await {
                Ok(s) => s,
                Err(fault) => {
                    tracing::error!(task_id = task.id, workflow = %task.workflow, "query workflow status failed: {fault}");
                    let fault = Fault::new(codes::WORKFLOW_GET_STATUS_ERR, fault.to_string());
                    task.set_fault(TaskStatus::Failed, &fault);
                    self.finalize(&mut task, SYSTEM_USER).await;
                    continue;
                }
            };

            match status {
                WorkflowStatus::Pending => {
                    // Not started yet; surface the reason but stay executing.
                    if task.task_reason != codes::WORKFLOW_PENDING.message {
                        task.task_reason = codes::WORKFLOW_PENDING.message.to_string();
                        task.task_detail.clear();
                        if let Err(e) = ctx.tasks.save(&task).await {
                            tracing::error!(task_id = task.id, "persist pending reason failed: {e}");
                            continue;
                        }
                        ctx.changelog.record(&task, SYSTEM_USER, changelog::WORKFLOW_PENDING).await;
                    }
                }
                WorkflowStatus::Running => {
                    if let Some(start) = task.task_start_time {
                        let deadline = start + Duration::seconds(config.task_timeout as i64);
                        if ctx.clock.now() >= deadline {
                            tracing::error!(task_id = task.id, workflow = %task.workflow, "workflow timed out");
                            task.task_status = TaskStatus::Timeout;
                            task.clear_fault();
                            self.finalize(&mut task, SYSTEM_USER).await;
                        }
                    }
                }
                WorkflowStatus::Succeeded => {
                    task.task_status = TaskStatus::Success;
                    task.clear_fault();
                    self.finalize(&mut task, SYSTEM_USER).await;
                }
                WorkflowStatus::Failed | WorkflowStatus::Error => {
                    task.task_status = TaskStatus::Failed;
                    task.clear_fault();
                    self.finalize(&mut task, SYSTEM_USER).await;
                }
                WorkflowStatus::Unknown => {
                    let fault = Fault::new(codes::WORKFLOW_UNKNOWN_STATUS, String::new());
                    task.set_fault(TaskStatus::Failed, &fault);
                    self.finalize(&mut task, SYSTEM_USER).await;
                }
            }
        }
        Ok(())
    }

    /// Callback path. The caller has already authenticated the per-task
    /// token; this validates and applies the reported result.
    pub async fn apply_result(&self, result: &TaskResultUpdate, user: &str) -> Result<Task, Fault> {
        let ctx = &self.ctx;

        let status = TaskStatus::from_str(&result.task_status).ok_or_else(|| {
            Fault::new(codes::TASK_STATUS_ERR, format!("status ({})", result.task_status))
        })?;

        let mut task = ctx
            .tasks
            .get(result.id)
            .await
            .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?
            .ok_or_else(|| Fault::new(codes::TASK_NOT_EXIST, format!("task ({})", result.id)))?;

        // Reported start/end win over observed times when both parse.
        let now = ctx.clock.now();
        match (parse_report_time(&result.task_start_time), parse_report_time(&result.task_end_time)) {
            (Some(start), Some(end)) => {
                task.task_start_time = Some(start);
                task.task_end_time = Some(end);
            }
            _ => task.task_end_time = Some(now),
        }
        task.task_duration = duration_secs(task.task_start_time, task.task_end_time);

        task.task_status = status;
        task.task_reason = result.task_reason.clone();
        task.task_detail = result.task_detail.clone();
        if let Some(quantity) = result.task_result_quantity {
            task.task_result_quantity = quantity;
        }

        match result.task_result_size {
            Some(size) => task.task_result_size = size.max(0),
            // Not supplied: derive from the pre-exec capture.
            None => {
                let driver = ctx.clusters.driver_for(&task.src_cluster_id).await?;
                let current = driver
                    .get_tables_size(&task.src_database_name, &task.src_tables())
                    .await?;
                task.task_result_size = (task.src_cluster_sum_table_size - current).max(0);
            }
        }

        ctx.tasks
            .save(&task)
            .await
            .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?;
        ctx.changelog.record(&task, user, changelog::WORKFLOW_FINISHED).await;
        tracing::info!(task_id = task.id, status = task.task_status.as_str(), "task result ingested");

        self.schedule_next(&task);
        Ok(task)
    }

    /// Terminal transition shared by the polling paths: stamp times, derive
    /// the result size, persist, journal, and re-enqueue the policy.
    async fn finalize(&self, task: &mut Task, user: &str) {
        let ctx = &self.ctx;

        task.task_end_time = Some(ctx.clock.now());
        task.task_duration = duration_secs(task.task_start_time, task.task_end_time);

        match self.measure_result_size(task).await {
            Ok(size) => task.task_result_size = size,
            Err(e) => {
                tracing::warn!(task_id = task.id, "could not measure result size: {e}");
            }
        }

        if let Err(e) = ctx.tasks.save(task).await {
            tracing::error!(task_id = task.id, "persist terminal task failed: {e}");
            return;
        }
        ctx.changelog.record(task, user, changelog::WORKFLOW_FINISHED).await;

        self.schedule_next(task);
    }

    async fn measure_result_size(&self, task: &Task) -> Result<i64, Fault> {
        let driver = self.ctx.clusters.driver_for(&task.src_cluster_id).await?;
        let current = driver
            .get_tables_size(&task.src_database_name, &task.src_tables())
            .await?;
        Ok((task.src_cluster_sum_table_size - current).max(0))
    }

    /// The task is terminal: ask the reconciler for the next period's task.
    fn schedule_next(&self, task: &Task) {
        let handle = PolicyHandle::new(task.policy_id);
        if self.ctx.policy_queue.push(handle) {
            tracing::info!(policy_id = task.policy_id, "policy re-enqueued for next task");
        } else {
            tracing::info!(policy_id = task.policy_id, "policy already queued");
        }
    }

    /// Delete workflow artifacts for tasks finished longer ago than the
    /// retention window, then drop the stored handle.
    pub async fn clean_pass(&self) -> DomainResult<()> {
        let ctx = &self.ctx;
        let config = ctx.config.load_or_seed().await?;
        let cutoff = ctx.clock.now() - Duration::days(config.workflow_retention_days as i64);
        let finished = ctx.tasks.list_finished_with_workflow_before(cutoff).await?;

        for task in finished {
            match ctx.workflow.delete_workflow(&task.workflow).await {
                Ok(()) => {
                    tracing::info!(task_id = task.id, workflow = %task.workflow, "workflow artifacts deleted");
                    ctx.tasks.clear_workflow(task.id).await?;
                }
                Err(fault) if fault.detail.contains("not found") => {
                    ctx.tasks.clear_workflow(task.id).await?;
                }
                Err(fault) => {
                    tracing::error!(task_id = task.id, workflow = %task.workflow, "delete workflow failed: {fault}");
                }
            }
        }
        Ok(())
    }
}

fn parse_report_time(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn duration_secs(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).num_seconds().max(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_time() {
        assert!(parse_report_time("").is_none());
        assert!(parse_report_time("2024-01-15T02:00:00Z").is_none());
        let t = parse_report_time("2024-01-15 02:00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-01-15T02:00:00+00:00");
    }

    #[test]
    fn test_duration_clamped() {
        let start = parse_report_time("2024-01-15 02:00:00");
        let end = parse_report_time("2024-01-15 02:10:00");
        assert_eq!(duration_secs(start, end), 600);
        // End before start clamps to zero.
        assert_eq!(duration_secs(end, start), 0);
        assert_eq!(duration_secs(None, end), 0);
    }
}
