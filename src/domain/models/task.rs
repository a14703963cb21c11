//! Task domain model: one dated materialization of a policy.
//!
//! A task is the unit of admission, dispatch and result. Snapshot fields are
//! copied from the policy/source/destination so the record stays meaningful
//! after the policy changes or disappears.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::destination::StorageKind;
use super::exec_window::ExecuteWindow;
use super::policy::{CleaningSpeed, Govern, NotifyPolicy, Policy};
use super::source::Source;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Dated, waiting for the pre-exec check window.
    Scheduled,
    /// Supplementation (source/destination/condition validation) failed.
    SupplementFailed,
    /// Supplemented, waiting for admission.
    Waiting,
    /// Pre-dispatch check failed; retried next admission tick.
    ExecCheckFailed,
    /// Workflow submitted and running.
    Executing,
    Success,
    Failed,
    Timeout,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::SupplementFailed => "supplement_failed",
            Self::Waiting => "waiting",
            Self::ExecCheckFailed => "exec_check_failed",
            Self::Executing => "executing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "supplement_failed" => Some(Self::SupplementFailed),
            "waiting" => Some(Self::Waiting),
            "exec_check_failed" => Some(Self::ExecCheckFailed),
            "executing" => Some(Self::Executing),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::SupplementFailed => "supplement failed",
            Self::Waiting => "waiting to execute",
            Self::ExecCheckFailed => "pre-exec check failed",
            Self::Executing => "executing",
            Self::Success => "succeeded",
            Self::Failed => "failed",
            Self::Timeout => "timed out",
        }
    }

    /// Terminal: the task record never changes again (admin delete aside).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Timeout)
    }

    /// Dispatch has started; the execute date is frozen.
    pub fn is_exec_time_immutable(&self) -> bool {
        matches!(self, Self::Executing | Self::Success | Self::Failed | Self::Timeout)
    }

    /// Admission candidates.
    pub fn can_exec(&self) -> bool {
        matches!(self, Self::Waiting | Self::ExecCheckFailed)
    }

    /// The policy reconciler may still rewrite the task.
    pub fn can_update(&self) -> bool {
        matches!(
            self,
            Self::Scheduled | Self::SupplementFailed | Self::Waiting | Self::ExecCheckFailed
        )
    }

    pub const TERMINAL: [TaskStatus; 3] = [Self::Success, Self::Failed, Self::Timeout];
    pub const EXEC_TIME_IMMUTABLE: [TaskStatus; 4] =
        [Self::Executing, Self::Success, Self::Failed, Self::Timeout];
    pub const CAN_EXEC: [TaskStatus; 2] = [Self::Waiting, Self::ExecCheckFailed];
    pub const CAN_UPDATE: [TaskStatus; 4] =
        [Self::Scheduled, Self::SupplementFailed, Self::Waiting, Self::ExecCheckFailed];
}

/// One dated instance of a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub enable: bool,
    pub policy_id: i64,

    // -- Dated plan --
    pub execute_window: ExecuteWindow,
    pub execute_date: NaiveDate,
    pub pause: bool,
    pub rebuild_flag: bool,

    // -- Source snapshot --
    pub src_id: i64,
    pub src_name: String,
    pub src_bu: String,
    pub src_cluster_name: String,
    pub src_cluster_id: String,
    pub src_database_name: String,
    /// Comma-separated table list.
    pub src_tables_name: String,
    pub src_columns: String,
    /// Free disk in MB captured right before dispatch.
    pub src_cluster_free_disk: i64,
    /// Summed table size in MB captured right before dispatch.
    pub src_cluster_sum_table_size: i64,

    // -- Destination snapshot (archive only) --
    pub dest_id: i64,
    pub dest_name: String,
    pub dest_storage: StorageKind,
    pub dest_connection_id: i64,
    pub dest_database_name: String,
    pub dest_table_name: String,
    pub dest_compress: bool,

    // -- Governance --
    pub govern: Govern,
    pub condition: String,
    pub retain_src_data: bool,
    pub cleaning_speed: CleaningSpeed,

    // -- Subscribers --
    pub relevant: Vec<String>,
    pub notify_policy: NotifyPolicy,

    // -- Runtime / result --
    pub task_result_quantity: i64,
    pub task_result_size: i64,
    pub task_start_time: Option<DateTime<Utc>>,
    pub task_end_time: Option<DateTime<Utc>>,
    pub task_duration: i64,
    /// Opaque handle returned by the workflow driver.
    pub workflow: String,
    pub task_status: TaskStatus,
    pub task_reason: String,
    pub task_detail: String,
    pub need_check_execute_date: bool,

    // -- Audit --
    pub creator: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Materialize a fresh `scheduled` task from a policy + source snapshot.
    pub fn materialize(policy: &Policy, source: &Source, execute_date: NaiveDate) -> Self {
        let now = Utc::now();
        let mut task = Self {
            id: 0,
            name: format!("{}-{}", policy.period.label(), policy.name),
            description: policy.description.clone(),
            enable: policy.enable,
            policy_id: policy.id,
            execute_window: policy.execute_window,
            execute_date,
            pause: policy.pause,
            rebuild_flag: policy.rebuild_flag,
            src_id: 0,
            src_name: String::new(),
            src_bu: String::new(),
            src_cluster_name: String::new(),
            src_cluster_id: String::new(),
            src_database_name: String::new(),
            src_tables_name: String::new(),
            src_columns: String::new(),
            src_cluster_free_disk: 0,
            src_cluster_sum_table_size: 0,
            dest_id: 0,
            dest_name: String::new(),
            dest_storage: StorageKind::default(),
            dest_connection_id: 0,
            dest_database_name: String::new(),
            dest_table_name: String::new(),
            dest_compress: false,
            govern: policy.govern,
            condition: String::new(),
            retain_src_data: false,
            cleaning_speed: policy.cleaning_speed,
            relevant: vec![],
            notify_policy: policy.notify_policy,
            task_result_quantity: 0,
            task_result_size: 0,
            task_start_time: None,
            task_end_time: None,
            task_duration: 0,
            workflow: String::new(),
            task_status: TaskStatus::Scheduled,
            task_reason: String::new(),
            task_detail: String::new(),
            need_check_execute_date: false,
            creator: policy.creator.clone(),
            editor: String::new(),
            created_at: now,
            updated_at: now,
        };
        task.snapshot_from(policy, source);
        task
    }

    /// Refresh the source/governance snapshot from the current policy and
    /// source rows. Used both at materialization and at supplementation.
    pub fn snapshot_from(&mut self, policy: &Policy, source: &Source) {
        self.pause = policy.pause;
        self.rebuild_flag = policy.rebuild_flag;

        self.src_id = policy.src_id;
        self.src_name = source.name.clone();
        self.src_bu = source.bu.clone();
        self.src_cluster_id = source.cluster_id.clone();
        self.src_cluster_name = source.cluster_name.clone();
        self.src_database_name = source.database_name.clone();
        self.src_tables_name = source.tables_name.clone();
        self.src_columns = policy.archive_scope.clone();

        self.govern = policy.govern;
        self.condition = policy.condition.clone();
        self.retain_src_data = policy.retain_src_data;
        self.cleaning_speed = policy.cleaning_speed;

        self.relevant = policy.relevant.clone();
        self.notify_policy = policy.notify_policy;
    }

    /// Copy the policy fields that propagate onto a still-updatable task.
    /// Returns true when anything actually changed.
    pub fn propagate_policy_fields(&mut self, policy: &Policy) -> bool {
        let changed = self.condition != policy.condition
            || self.pause != policy.pause
            || self.rebuild_flag != policy.rebuild_flag
            || self.cleaning_speed != policy.cleaning_speed
            || self.retain_src_data != policy.retain_src_data
            || self.src_columns != policy.archive_scope
            || self.notify_policy != policy.notify_policy
            || self.relevant != policy.relevant;
        if changed {
            self.condition = policy.condition.clone();
            self.pause = policy.pause;
            self.rebuild_flag = policy.rebuild_flag;
            self.cleaning_speed = policy.cleaning_speed;
            self.retain_src_data = policy.retain_src_data;
            self.src_columns = policy.archive_scope.clone();
            self.notify_policy = policy.notify_policy;
            self.relevant = policy.relevant.clone();
        }
        changed
    }

    /// Record a coded failure on the task.
    pub fn set_fault(&mut self, status: TaskStatus, fault: &crate::domain::errors::Fault) {
        self.task_status = status;
        self.task_reason = fault.code.message.to_string();
        self.task_detail = fault.detail.clone();
    }

    /// Clear reason/detail, typically on a successful transition.
    pub fn clear_fault(&mut self) {
        self.task_reason.clear();
        self.task_detail.clear();
    }

    pub fn src_tables(&self) -> Vec<String> {
        self.src_tables_name
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}


#[cfg(test)]
pub mod test_support {
    use super::*;
    use chrono::NaiveTime;

    /// A bare task for unit tests; fields get overridden per test.
    pub fn minimal_task() -> Task {
        Task {
            id: 0,
            name: "monthly-orders-cleanup".into(),
            description: String::new(),
            enable: true,
            policy_id: 1,
            execute_window: ExecuteWindow::new(
                NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(5, 0, 0).unwrap(),
            ),
            execute_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            pause: false,
            rebuild_flag: false,
            src_id: 1,
            src_name: "orders".into(),
            src_bu: "commerce".into(),
            src_cluster_name: "c1".into(),
            src_cluster_id: "cluster-1".into(),
            src_database_name: "shop".into(),
            src_tables_name: "orders".into(),
            src_columns: String::new(),
            src_cluster_free_disk: 0,
            src_cluster_sum_table_size: 0,
            dest_id: 0,
            dest_name: String::new(),
            dest_storage: StorageKind::default(),
            dest_connection_id: 0,
            dest_database_name: String::new(),
            dest_table_name: String::new(),
            dest_compress: false,
            govern: Govern::Delete,
            condition: "created_at < now()".into(),
            retain_src_data: false,
            cleaning_speed: CleaningSpeed::Balanced,
            relevant: vec![],
            notify_policy: NotifyPolicy::Silence,
            task_result_quantity: 0,
            task_result_size: 0,
            task_start_time: None,
            task_end_time: None,
            task_duration: 0,
            workflow: String::new(),
            task_status: TaskStatus::Scheduled,
            task_reason: String::new(),
            task_detail: String::new(),
            need_check_execute_date: false,
            creator: "admin".into(),
            editor: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
