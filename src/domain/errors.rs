//! Domain errors and the stable service-code catalog.
//!
//! Every operator-visible failure carries a `ServiceCode`: a stable numeric
//! code (HTTP class x 10000 + domain x 100 + sequence) plus a short message.
//! Task-level failures are recorded on the task itself as
//! `(task_reason = code message, task_detail = free text)`.

use thiserror::Error;

/// A stable numeric code paired with its operator-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceCode {
    pub code: u32,
    pub message: &'static str,
}

impl ServiceCode {
    /// HTTP status class this code maps to (0 maps to 200).
    pub fn http_status(&self) -> u16 {
        if self.code == 0 {
            200
        } else {
            (self.code / 10000) as u16
        }
    }
}

pub mod codes {
    use super::ServiceCode;

    pub const OK: ServiceCode = ServiceCode { code: 0, message: "" };

    // Generic
    pub const BIND_ERR: ServiceCode = ServiceCode { code: 400_0000, message: "request body invalid" };
    pub const INVALID_ID: ServiceCode = ServiceCode { code: 400_0001, message: "missing or invalid id" };
    pub const MISS_AUTH: ServiceCode = ServiceCode { code: 401_0001, message: "no authorization" };
    pub const TOKEN_INVALID: ServiceCode = ServiceCode { code: 401_0002, message: "token malformed" };
    pub const TOKEN_EXPIRED: ServiceCode = ServiceCode { code: 401_0003, message: "token expired" };
    pub const DENIED: ServiceCode = ServiceCode { code: 403_0000, message: "permission denied" };
    pub const ADMIN_ONLY: ServiceCode = ServiceCode { code: 403_0001, message: "administrator privileges required" };
    pub const NOT_FOUND: ServiceCode = ServiceCode { code: 404_0000, message: "not found" };
    pub const SERVER_ERR: ServiceCode = ServiceCode { code: 500_0000, message: "internal server error" };
    pub const DECRYPT_PASSWD_ERR: ServiceCode = ServiceCode { code: 500_0001, message: "failed to unseal stored password" };
    pub const ENCRYPT_PASSWD_ERR: ServiceCode = ServiceCode { code: 500_0002, message: "failed to seal password" };
    pub const CONFIG_ERR: ServiceCode = ServiceCode { code: 500_0003, message: "failed to load runtime configuration" };

    // Source checks
    pub const SOURCE_DATABASE_NOT_EXIST: ServiceCode = ServiceCode { code: 400_0206, message: "source database does not exist" };
    pub const SOURCE_TABLE_NOT_EXIST: ServiceCode = ServiceCode { code: 400_0207, message: "source table does not exist" };
    pub const SOURCE_TABLE_NO_PRIMARY_KEY: ServiceCode = ServiceCode { code: 400_0209, message: "source tables must have a primary key" };
    pub const SOURCE_SHARDING_NAME_ERR: ServiceCode = ServiceCode { code: 400_0210, message: "multiple source tables must share one sharding base name" };
    pub const SOURCE_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0201, message: "source does not exist" };

    // Destination / connection checks
    pub const DEST_PARAM_ERR: ServiceCode = ServiceCode { code: 400_0407, message: "destination validation failed" };
    pub const DEST_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0401, message: "destination does not exist" };
    pub const CONN_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0301, message: "connection does not exist" };

    // Policy
    pub const POLICY_PERIOD_ERR: ServiceCode = ServiceCode { code: 400_0503, message: "invalid execution period" };
    pub const POLICY_DAY_ERR: ServiceCode = ServiceCode { code: 400_0513, message: "invalid expected execution day" };
    pub const POLICY_EXECUTE_WINDOW_ERR: ServiceCode = ServiceCode { code: 400_0507, message: "malformed execution window" };
    pub const POLICY_NEED_CONDITION: ServiceCode = ServiceCode { code: 400_0511, message: "delete governance requires a condition" };
    pub const POLICY_CONDITION_ERR: ServiceCode = ServiceCode { code: 400_0512, message: "governance condition check failed" };
    pub const POLICY_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0501, message: "policy does not exist" };

    // Task
    pub const TASK_STATUS_IMMUTABLE: ServiceCode = ServiceCode { code: 400_0604, message: "task in its current status cannot be modified" };
    pub const TASK_NOT_REACHED_EXEC_WIN: ServiceCode = ServiceCode { code: 400_0607, message: "execution window not yet open" };
    pub const TASK_MISSED_EXEC_WIN: ServiceCode = ServiceCode { code: 400_0608, message: "missed this execution window, waiting for the next one" };
    pub const TASK_SRC_CLUSTER_CONFLICT: ServiceCode = ServiceCode { code: 400_0609, message: "executing tasks on the same cluster reached the limit" };
    pub const TASK_STATUS_ERR: ServiceCode = ServiceCode { code: 400_0610, message: "invalid task status" };
    pub const TASK_EXEC_DATE_NOT_REACHED: ServiceCode = ServiceCode { code: 400_0611, message: "task execution date not reached" };
    pub const TASK_SRC_DATABASE_CONFLICT: ServiceCode = ServiceCode { code: 400_0612, message: "executing tasks on the same database reached the limit" };
    pub const TASK_SRC_TABLE_CONFLICT: ServiceCode = ServiceCode { code: 400_0613, message: "executing tasks on the same table reached the limit" };
    pub const TASK_STATUS_UPDATE_DENIED: ServiceCode = ServiceCode { code: 403_0601, message: "not allowed to update this task's result" };
    pub const TASK_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0601, message: "task does not exist" };
    pub const TASK_GEN_DEST_TABLE_NAME_ERR: ServiceCode = ServiceCode { code: 500_0601, message: "failed to derive destination table name" };
    pub const TASK_PARALLEL_UPPER_LIMIT: ServiceCode = ServiceCode { code: 500_0602, message: "task parallelism limit reached" };

    // Workflow
    pub const WORKFLOW_PENDING: ServiceCode = ServiceCode { code: 500_0701, message: "workflow pending" };
    pub const WORKFLOW_GET_STATUS_ERR: ServiceCode = ServiceCode { code: 500_0702, message: "failed to query workflow status" };
    pub const WORKFLOW_CALL_FAILED: ServiceCode = ServiceCode { code: 500_0703, message: "workflow invocation failed" };
    pub const WORKFLOW_UNKNOWN_STATUS: ServiceCode = ServiceCode { code: 500_0704, message: "workflow status unknown" };
    pub const WORKFLOW_UNSUPPORTED: ServiceCode = ServiceCode { code: 500_0705, message: "no matching workflow driver" };

    // Cluster
    pub const CLUSTER_UNSUPPORTED: ServiceCode = ServiceCode { code: 400_0807, message: "unsupported cluster kind" };
    pub const CLUSTER_UNREACHABLE: ServiceCode = ServiceCode { code: 400_0808, message: "cannot connect to cluster: address, user or password wrong" };
    pub const CLUSTER_COLLECT_RUNNING: ServiceCode = ServiceCode { code: 400_0811, message: "a big-table collection run is already in progress" };
    pub const CLUSTER_NOT_EXIST: ServiceCode = ServiceCode { code: 404_0801, message: "cluster does not exist" };
    pub const CLUSTER_FREE_DISK_ERR: ServiceCode = ServiceCode { code: 500_0801, message: "failed to read source cluster free disk" };

    // Runtime config
    pub const CONFIG_CONFLICT_LEVEL_ERR: ServiceCode = ServiceCode { code: 400_0901, message: "invalid task conflict level" };
    pub const CONFIG_NOTICE_USER_ERR: ServiceCode = ServiceCode { code: 400_0902, message: "notification test user is empty" };
    pub const CONFIG_NOTICE_ERR: ServiceCode = ServiceCode { code: 400_0903, message: "notification test failed" };
}

/// A coded failure: what gets written onto a task as `(reason, detail)`.
#[derive(Debug, Clone, Error)]
#[error("{}: {detail}", code.message)]
pub struct Fault {
    pub code: ServiceCode,
    pub detail: String,
}

impl Fault {
    pub fn new(code: ServiceCode, detail: impl Into<String>) -> Self {
        Self { code, detail: detail.into() }
    }
}

/// Domain-level errors.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Policy not found: {0}")]
    PolicyNotFound(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Source not found: {0}")]
    SourceNotFound(i64),

    #[error("Destination not found: {0}")]
    DestinationNotFound(i64),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(i64),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Fault(#[from] Fault),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_from_code() {
        assert_eq!(codes::OK.http_status(), 200);
        assert_eq!(codes::TASK_NOT_EXIST.http_status(), 404);
        assert_eq!(codes::TASK_PARALLEL_UPPER_LIMIT.http_status(), 500);
        assert_eq!(codes::TASK_STATUS_UPDATE_DENIED.http_status(), 403);
    }

    #[test]
    fn test_fault_display() {
        let f = Fault::new(codes::TASK_MISSED_EXEC_WIN, "window [\"02:00:00\",\"05:00:00\"]");
        assert!(f.to_string().starts_with("missed this execution window"));
    }
}
