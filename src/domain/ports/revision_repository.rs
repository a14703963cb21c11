//! Revision repository port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Revision, RevisionKind};

#[async_trait]
pub trait RevisionRepository: Send + Sync {
    async fn append(&self, revision: &Revision) -> DomainResult<i64>;

    /// Revisions for one entity, oldest first.
    async fn list_for_entity(&self, kind: RevisionKind, entity_id: i64) -> DomainResult<Vec<Revision>>;
}
