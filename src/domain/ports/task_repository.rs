//! Task repository port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Task, TaskStatus};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert and return the assigned id.
    async fn create(&self, task: &Task) -> DomainResult<i64>;

    async fn get(&self, id: i64) -> DomainResult<Option<Task>>;

    /// Full-row update keyed by id.
    async fn save(&self, task: &Task) -> DomainResult<()>;

    /// Delete the task together with its change-log rows.
    async fn delete(&self, id: i64) -> DomainResult<()>;

    /// Tasks in any of the given statuses, regardless of `enable`.
    async fn list_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>>;

    /// Tasks with `enable = true` in any of the given statuses.
    async fn list_enabled_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>>;

    /// Tasks of one policy in any of the given statuses, lowest id first.
    async fn list_for_policy(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<Vec<Task>>;

    /// Count of one policy's tasks whose status is NOT in the given set.
    async fn count_for_policy_excluding(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<u64>;

    /// Count of one policy's tasks whose status is in the given set.
    async fn count_for_policy_in(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<u64>;

    /// The newest (highest id) task of one policy in the given statuses.
    async fn last_for_policy_in(&self, policy_id: i64, statuses: &[TaskStatus]) -> DomainResult<Option<Task>>;

    async fn count_by_status(&self, statuses: &[TaskStatus]) -> DomainResult<u64>;

    /// Finished tasks that still hold a workflow handle and ended before the
    /// cutoff. Drives workflow artifact cleanup.
    async fn list_finished_with_workflow_before(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<Task>>;

    /// Drop the stored workflow handle after its artifacts were deleted.
    async fn clear_workflow(&self, id: i64) -> DomainResult<()>;

    /// Flag one policy's still-updatable tasks for execute-date
    /// recomputation. Called when the policy is edited.
    async fn mark_need_check_execute_date(&self, policy_id: i64) -> DomainResult<u64>;
}
