//! SQLite implementations of the catalog repositories: sources,
//! destinations, connections, clusters.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Cluster, Connection, Destination, Source, StorageKind};
use crate::domain::ports::{ClusterRepository, ConnectionRepository, DestinationRepository, SourceRepository};

use super::util::parse_datetime;

#[derive(Clone)]
pub struct SqliteSourceRepository {
    pool: SqlitePool,
}

impl SqliteSourceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SourceRepository for SqliteSourceRepository {
    async fn create(&self, source: &Source) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO sources (name, bu, cluster_id, cluster_name, database_name, tables_name,
             creator, editor, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&source.name)
        .bind(&source.bu)
        .bind(&source.cluster_id)
        .bind(&source.cluster_name)
        .bind(&source.database_name)
        .bind(&source.tables_name)
        .bind(&source.creator)
        .bind(&source.editor)
        .bind(source.created_at.to_rfc3339())
        .bind(source.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Source>> {
        let row: Option<SourceRow> = sqlx::query_as("SELECT * FROM sources WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    bu: String,
    cluster_id: String,
    cluster_name: String,
    database_name: String,
    tables_name: String,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SourceRow> for Source {
    type Error = DomainError;

    fn try_from(r: SourceRow) -> Result<Self, Self::Error> {
        Ok(Source {
            id: r.id,
            name: r.name,
            bu: r.bu,
            cluster_id: r.cluster_id,
            cluster_name: r.cluster_name,
            database_name: r.database_name,
            tables_name: r.tables_name,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteDestinationRepository {
    pool: SqlitePool,
}

impl SqliteDestinationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DestinationRepository for SqliteDestinationRepository {
    async fn create(&self, destination: &Destination) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO destinations (name, bu, storage, connection_id, database_name, table_name,
             compress, creator, editor, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&destination.name)
        .bind(&destination.bu)
        .bind(destination.storage.as_str())
        .bind(destination.connection_id)
        .bind(&destination.database_name)
        .bind(&destination.table_name)
        .bind(destination.compress as i32)
        .bind(&destination.creator)
        .bind(&destination.editor)
        .bind(destination.created_at.to_rfc3339())
        .bind(destination.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Destination>> {
        let row: Option<DestinationRow> = sqlx::query_as("SELECT * FROM destinations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct DestinationRow {
    id: i64,
    name: String,
    bu: String,
    storage: String,
    connection_id: i64,
    database_name: String,
    table_name: String,
    compress: i32,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<DestinationRow> for Destination {
    type Error = DomainError;

    fn try_from(r: DestinationRow) -> Result<Self, Self::Error> {
        Ok(Destination {
            id: r.id,
            name: r.name,
            bu: r.bu,
            storage: StorageKind::from_str(&r.storage).ok_or_else(|| {
                DomainError::SerializationError(format!("destination {}: bad storage '{}'", r.id, r.storage))
            })?,
            connection_id: r.connection_id,
            database_name: r.database_name,
            table_name: r.table_name,
            compress: r.compress != 0,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteConnectionRepository {
    pool: SqlitePool,
}

impl SqliteConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRepository for SqliteConnectionRepository {
    async fn create(&self, connection: &Connection) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO connections (name, bu, storage, addr, port, user, passwd,
             creator, editor, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&connection.name)
        .bind(&connection.bu)
        .bind(connection.storage.as_str())
        .bind(&connection.addr)
        .bind(connection.port as i64)
        .bind(&connection.user)
        .bind(&connection.passwd)
        .bind(&connection.creator)
        .bind(&connection.editor)
        .bind(connection.created_at.to_rfc3339())
        .bind(connection.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> DomainResult<Option<Connection>> {
        let row: Option<ConnectionRow> = sqlx::query_as("SELECT * FROM connections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct ConnectionRow {
    id: i64,
    name: String,
    bu: String,
    storage: String,
    addr: String,
    port: i64,
    user: String,
    passwd: String,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = DomainError;

    fn try_from(r: ConnectionRow) -> Result<Self, Self::Error> {
        Ok(Connection {
            id: r.id,
            name: r.name,
            bu: r.bu,
            storage: StorageKind::from_str(&r.storage).ok_or_else(|| {
                DomainError::SerializationError(format!("connection {}: bad storage '{}'", r.id, r.storage))
            })?,
            addr: r.addr,
            port: r.port as u16,
            user: r.user,
            passwd: r.passwd,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}

#[derive(Clone)]
pub struct SqliteClusterRepository {
    pool: SqlitePool,
}

impl SqliteClusterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterRepository for SqliteClusterRepository {
    async fn create(&self, cluster: &Cluster) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO clusters (name, cluster_id, cluster_kind, import_from, service_addr,
             service_port, user, passwd, description, creator, editor, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&cluster.name)
        .bind(&cluster.cluster_id)
        .bind(&cluster.cluster_kind)
        .bind(&cluster.import_from)
        .bind(&cluster.service_addr)
        .bind(cluster.service_port as i64)
        .bind(&cluster.user)
        .bind(&cluster.passwd)
        .bind(&cluster.description)
        .bind(&cluster.creator)
        .bind(&cluster.editor)
        .bind(cluster.created_at.to_rfc3339())
        .bind(cluster.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get_by_cluster_id(&self, cluster_id: &str) -> DomainResult<Option<Cluster>> {
        let row: Option<ClusterRow> = sqlx::query_as("SELECT * FROM clusters WHERE cluster_id = ?")
            .bind(cluster_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Cluster>> {
        let rows: Vec<ClusterRow> = sqlx::query_as("SELECT * FROM clusters ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ClusterRow {
    id: i64,
    name: String,
    cluster_id: String,
    cluster_kind: String,
    import_from: String,
    service_addr: String,
    service_port: i64,
    user: String,
    passwd: String,
    description: String,
    creator: String,
    editor: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ClusterRow> for Cluster {
    type Error = DomainError;

    fn try_from(r: ClusterRow) -> Result<Self, Self::Error> {
        Ok(Cluster {
            id: r.id,
            name: r.name,
            cluster_id: r.cluster_id,
            cluster_kind: r.cluster_kind,
            import_from: r.import_from,
            service_addr: r.service_addr,
            service_port: r.service_port as u16,
            user: r.user,
            passwd: r.passwd,
            description: r.description,
            creator: r.creator,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
            updated_at: parse_datetime(&r.updated_at)?,
        })
    }
}
