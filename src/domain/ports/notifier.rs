//! Notifier port. Fire-and-forget: transport failures are logged, never
//! propagated into task state.

use async_trait::async_trait;

use crate::domain::errors::Fault;
use crate::domain::models::Message;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), Fault>;

    /// Deliver a probe to one recipient, for config validation.
    async fn test(&self, user: &str) -> Result<(), Fault>;
}
