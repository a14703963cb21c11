//! Policy repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Policy;

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Insert and return the assigned id.
    async fn create(&self, policy: &Policy) -> DomainResult<i64>;

    async fn get(&self, id: i64) -> DomainResult<Option<Policy>>;

    /// Full-row update.
    async fn save(&self, policy: &Policy) -> DomainResult<()>;

    /// Delete the policy together with its revisions.
    async fn delete(&self, id: i64) -> DomainResult<()>;

    /// All policies with `enable = true`.
    async fn list_enabled(&self) -> DomainResult<Vec<Policy>>;

    async fn set_enable(&self, id: i64, enable: bool) -> DomainResult<()>;
}
