//! Catalog repository ports: sources, destinations, connections, clusters.
//!
//! CRUD surfaces for these entities live outside the scheduler core; the
//! engine only needs lookups plus the inserts its tests seed data with.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Cluster, Connection, Destination, Source};

#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn create(&self, source: &Source) -> DomainResult<i64>;
    async fn get(&self, id: i64) -> DomainResult<Option<Source>>;
}

#[async_trait]
pub trait DestinationRepository: Send + Sync {
    async fn create(&self, destination: &Destination) -> DomainResult<i64>;
    async fn get(&self, id: i64) -> DomainResult<Option<Destination>>;
}

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn create(&self, connection: &Connection) -> DomainResult<i64>;
    async fn get(&self, id: i64) -> DomainResult<Option<Connection>>;
}

#[async_trait]
pub trait ClusterRepository: Send + Sync {
    async fn create(&self, cluster: &Cluster) -> DomainResult<i64>;
    async fn get_by_cluster_id(&self, cluster_id: &str) -> DomainResult<Option<Cluster>>;
    async fn list(&self) -> DomainResult<Vec<Cluster>>;
}
