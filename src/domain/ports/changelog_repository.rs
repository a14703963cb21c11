//! Change-log repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskChangeLog;

#[async_trait]
pub trait ChangeLogRepository: Send + Sync {
    async fn append(&self, log: &TaskChangeLog) -> DomainResult<i64>;

    /// Journal rows for one task, oldest first.
    async fn list_for_task(&self, task_id: i64) -> DomainResult<Vec<TaskChangeLog>>;
}
