//! Per-task change journal and notification message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::TaskStatus;

/// One append-only journal row; produced on every observable transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChangeLog {
    pub id: i64,
    pub task_id: i64,
    pub time: DateTime<Utc>,
    pub user_name: String,
    pub task_status: TaskStatus,
    pub content: String,
}

/// Templated notification rendered from a task snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub task_id: i64,
    pub task_name: String,
    pub src_cluster_name: String,
    pub src_database_name: String,
    pub src_tables_name: String,
    pub govern: String,
    pub condition: String,
    pub task_start_time: String,
    pub task_end_time: String,
    pub task_duration: String,
    pub task_status: String,
    pub task_result_quantity: i64,
    pub task_result_size: i64,
    pub task_reason: String,
    pub relevant: Vec<String>,
    pub home_url: String,
    pub task_url: String,
}
