//! Result-updater token port.
//!
//! At dispatch, every workflow call gets a JWT scoped to a single task; the
//! callback endpoint only accepts a result for the task named in the token.

use crate::domain::errors::Fault;

pub trait ResultTokenIssuer: Send + Sync {
    /// Mint the per-task result-updater token (30-day expiry).
    fn issue_result_token(&self, task_id: i64) -> Result<String, Fault>;
}
