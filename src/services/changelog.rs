//! Change-log journal and notification fan-out.
//!
//! Every observable `(status, reason)` transition appends exactly one
//! journal row; when the task's notify policy matches the new status a
//! message is rendered from the task snapshot and handed to the transport.
//! Notification is fire-and-forget.

use std::sync::Arc;

use crate::adapters::notify::new_notifier;
use crate::domain::models::{
    check_same_sharding_tables, Message, NotifyPolicy, Task, TaskChangeLog, TaskStatus,
};
use crate::domain::ports::{ChangeLogRepository, Clock, ConfigRepository, Notifier};

// Journal contents.
pub const TASK_CREATED: &str = "task created";
pub const SUPPLEMENT_OK: &str = "task information supplemented";
pub const WORKFLOW_CALLED: &str = "workflow submitted";
pub const WORKFLOW_FINISHED: &str = "workflow finished";
pub const WORKFLOW_PENDING: &str = "workflow pending";

pub fn updated_by_policy(execute_date: &str, window: &str) -> String {
    format!("policy changed, task updated; execute date: {execute_date} window: {window}")
}

pub fn supplement_failed(reason: &str, detail: &str) -> String {
    format!("supplementing task information failed; reason: {reason}, detail: {detail}")
}

pub fn waiting_exec(reason: &str, detail: &str) -> String {
    format!("task waiting to execute; reason: {reason}, detail: {detail}")
}

pub fn workflow_call_failed(reason: &str, detail: &str) -> String {
    format!("workflow submission failed; reason: {reason}, detail: {detail}")
}

pub fn workflow_stopped(detail: &str) -> String {
    format!("workflow stopped; reason: source disk pressure, detail: {detail}")
}

pub struct ChangeLogService {
    changelog: Arc<dyn ChangeLogRepository>,
    config: Arc<dyn ConfigRepository>,
    clock: Arc<dyn Clock>,
    external_addr: String,
    notifier_override: Option<Arc<dyn Notifier>>,
}

impl ChangeLogService {
    pub fn new(
        changelog: Arc<dyn ChangeLogRepository>,
        config: Arc<dyn ConfigRepository>,
        clock: Arc<dyn Clock>,
        external_addr: impl Into<String>,
    ) -> Self {
        Self {
            changelog,
            config,
            clock,
            external_addr: external_addr.into(),
            notifier_override: None,
        }
    }

    /// Pin the transport; tests capture messages this way.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier_override = Some(notifier);
        self
    }

    /// Append one journal row and fan out per the task's notify policy.
    /// Failures are logged, never propagated into task state.
    pub async fn record(&self, task: &Task, user: &str, content: impl Into<String>) {
        let log = TaskChangeLog {
            id: 0,
            task_id: task.id,
            time: self.clock.now(),
            user_name: user.to_string(),
            task_status: task.task_status,
            content: content.into(),
        };
        if let Err(e) = self.changelog.append(&log).await {
            tracing::error!(task_id = task.id, "append change log failed: {e}");
            return;
        }

        if !should_notify(task.notify_policy, task.task_status) {
            return;
        }

        let message = self.generate_message(task);
        let notifier = match &self.notifier_override {
            Some(n) => n.clone(),
            None => match self.config.load_or_seed().await {
                Ok(config) => new_notifier(config.notice),
                Err(e) => {
                    tracing::error!(task_id = task.id, "load notice config failed: {e}");
                    return;
                }
            },
        };
        if let Err(e) = notifier.send(&message).await {
            tracing::error!(task_id = task.id, "send notification failed: {e}");
        } else {
            tracing::debug!(task_id = task.id, "notification sent");
        }
    }

    /// Render the notification from the task snapshot.
    pub fn generate_message(&self, task: &Task) -> Message {
        let tables = match check_same_sharding_tables(&task.src_tables_name) {
            Ok((true, base)) => {
                format!("{base} [{} shards]", task.src_tables().len())
            }
            Ok((false, single)) => single,
            Err(_) => task.src_tables_name.clone(),
        };

        Message {
            task_id: task.id,
            task_name: task.name.clone(),
            src_cluster_name: task.src_cluster_name.clone(),
            src_database_name: task.src_database_name.clone(),
            src_tables_name: tables,
            govern: task.govern.label().to_string(),
            condition: task.condition.clone(),
            task_start_time: task
                .task_start_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            task_end_time: task
                .task_end_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            task_duration: human_duration(task.task_duration),
            task_status: task.task_status.label().to_string(),
            task_result_quantity: task.task_result_quantity,
            task_result_size: task.task_result_size,
            task_reason: task.task_reason.clone(),
            relevant: task.relevant.clone(),
            home_url: self.external_addr.clone(),
            task_url: format!("{}/#/task/detail?task_id={}", self.external_addr, task.id),
        }
    }
}

/// Whether a transition into `status` notifies under `policy`.
pub fn should_notify(policy: NotifyPolicy, status: TaskStatus) -> bool {
    match policy {
        NotifyPolicy::Silence => false,
        NotifyPolicy::Success => matches!(
            status,
            TaskStatus::SupplementFailed | TaskStatus::ExecCheckFailed | TaskStatus::Success
        ),
        NotifyPolicy::Failed => matches!(
            status,
            TaskStatus::SupplementFailed
                | TaskStatus::ExecCheckFailed
                | TaskStatus::Failed
                | TaskStatus::Timeout
        ),
        NotifyPolicy::Always => matches!(
            status,
            TaskStatus::SupplementFailed
                | TaskStatus::ExecCheckFailed
                | TaskStatus::Success
                | TaskStatus::Failed
                | TaskStatus::Timeout
        ),
    }
}

fn human_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, rem) = (seconds / 3600, seconds % 3600);
    let (m, s) = (rem / 60, rem % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_notify_matrix() {
        use NotifyPolicy::*;
        use TaskStatus::*;

        assert!(!should_notify(Silence, TaskStatus::Failed));
        assert!(should_notify(NotifyPolicy::Success, TaskStatus::Success));
        assert!(should_notify(NotifyPolicy::Success, SupplementFailed));
        assert!(!should_notify(NotifyPolicy::Success, TaskStatus::Failed));
        assert!(should_notify(NotifyPolicy::Failed, Timeout));
        assert!(!should_notify(NotifyPolicy::Failed, TaskStatus::Success));
        assert!(should_notify(Always, TaskStatus::Success));
        assert!(should_notify(Always, Timeout));
        assert!(!should_notify(Always, Executing));
        assert!(!should_notify(Always, Scheduled));
    }

    #[test]
    fn test_human_duration() {
        assert_eq!(human_duration(0), "0s");
        assert_eq!(human_duration(59), "59s");
        assert_eq!(human_duration(61), "1m1s");
        assert_eq!(human_duration(3700), "1h1m40s");
        assert_eq!(human_duration(-5), "0s");
    }
}
