//! SQLite implementation of the RevisionRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Revision, RevisionKind};
use crate::domain::ports::RevisionRepository;

use super::util::parse_datetime;

#[derive(Clone)]
pub struct SqliteRevisionRepository {
    pool: SqlitePool,
}

impl SqliteRevisionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevisionRepository for SqliteRevisionRepository {
    async fn append(&self, revision: &Revision) -> DomainResult<i64> {
        let result = sqlx::query(
            "INSERT INTO revisions (kind, entity_id, field, old_value, new_value, editor, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(revision.kind.as_str())
        .bind(revision.entity_id)
        .bind(&revision.field)
        .bind(&revision.old_value)
        .bind(&revision.new_value)
        .bind(&revision.editor)
        .bind(revision.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_for_entity(&self, kind: RevisionKind, entity_id: i64) -> DomainResult<Vec<Revision>> {
        let rows: Vec<RevisionRow> =
            sqlx::query_as("SELECT * FROM revisions WHERE kind = ? AND entity_id = ? ORDER BY id")
                .bind(kind.as_str())
                .bind(entity_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct RevisionRow {
    id: i64,
    kind: String,
    entity_id: i64,
    field: String,
    old_value: String,
    new_value: String,
    editor: String,
    created_at: String,
}

impl TryFrom<RevisionRow> for Revision {
    type Error = DomainError;

    fn try_from(r: RevisionRow) -> Result<Self, Self::Error> {
        Ok(Revision {
            id: r.id,
            kind: RevisionKind::from_str(&r.kind).ok_or_else(|| {
                DomainError::SerializationError(format!("revision {}: bad kind '{}'", r.id, r.kind))
            })?,
            entity_id: r.entity_id,
            field: r.field,
            old_value: r.old_value,
            new_value: r.new_value,
            editor: r.editor,
            created_at: parse_datetime(&r.created_at)?,
        })
    }
}
