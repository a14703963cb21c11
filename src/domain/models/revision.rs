//! Field-level revision records for user edits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which entity a revision row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionKind {
    Policy,
    Task,
}

impl RevisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Task => "task",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "policy" => Some(Self::Policy),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

/// One `{field, old, new}` diff from a user edit. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub kind: RevisionKind,
    /// Policy id or task id depending on `kind`.
    pub entity_id: i64,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub editor: String,
    pub created_at: DateTime<Utc>,
}
