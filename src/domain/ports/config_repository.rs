//! Runtime-config repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RuntimeConfig;

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    async fn load(&self) -> DomainResult<Option<RuntimeConfig>>;

    async fn save(&self, config: &RuntimeConfig) -> DomainResult<()>;

    /// Return the singleton row, inserting the defaults when absent.
    async fn load_or_seed(&self) -> DomainResult<RuntimeConfig>;
}
