//! Workflow driver port: the external executor of the physical data
//! operation. At-least-once submission with dedup by task id downstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::Fault;
use crate::domain::models::{CleaningSpeed, StorageKind};

/// Driver-reported workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Unknown,
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Error => "Error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Error" => Self::Error,
            _ => Self::Unknown,
        }
    }
}

/// Where and how the workflow reports its result back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callback {
    pub url: String,
    /// Per-task JWT; may only update that task's result, expires in 30 days.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncateParams {
    pub task_id: i64,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tables: String,
    pub callback: Callback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteParams {
    pub task_id: i64,
    /// Window bounds, "HH:MM:SS".
    pub start_time: String,
    pub end_time: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tables: String,
    /// Base64-encoded predicate; survives the driver's string handling.
    pub condition: String,
    pub rebuild_flag: bool,
    pub cleaning_speed: CleaningSpeed,
    pub free_disk: String,
    pub callback: Callback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDestination {
    pub storage: StorageKind,
    pub database: String,
    pub table: String,
    pub compress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveParams {
    pub task_id: i64,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tables: String,
    /// Base64-encoded predicate.
    pub condition: String,
    pub cleaning_speed: CleaningSpeed,
    pub retain_src_data: bool,
    pub free_disk: String,
    pub destination: ArchiveDestination,
    pub callback: Callback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildParams {
    pub task_id: i64,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub tables: String,
    pub free_disk: String,
    pub callback: Callback,
}

#[async_trait]
pub trait WorkflowDriver: Send + Sync {
    /// Each submit returns the driver's opaque workflow handle.
    async fn truncate_data(&self, params: &TruncateParams) -> Result<String, Fault>;
    async fn delete_data(&self, params: &DeleteParams) -> Result<String, Fault>;
    async fn archive_data(&self, params: &ArchiveParams) -> Result<String, Fault>;
    async fn rebuild_tables(&self, params: &RebuildParams) -> Result<String, Fault>;

    async fn workflow_status(&self, handle: &str) -> Result<WorkflowStatus, Fault>;

    /// Human-facing URL of the workflow, when the driver has one.
    async fn workflow_addr(&self, handle: &str) -> Result<String, Fault>;

    async fn stop_workflow(&self, handle: &str) -> Result<(), Fault>;
    async fn delete_workflow(&self, handle: &str) -> Result<(), Fault>;
}
