//! In-memory workflow driver: the test double and the default driver tag.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::errors::{codes, Fault};
use crate::domain::ports::{
    ArchiveParams, DeleteParams, RebuildParams, TruncateParams, WorkflowDriver, WorkflowStatus,
};

/// What a submit call carried, for assertions.
#[derive(Debug, Clone)]
pub enum SubmittedParams {
    Truncate(TruncateParams),
    Delete(DeleteParams),
    Archive(ArchiveParams),
    Rebuild(RebuildParams),
}

impl SubmittedParams {
    pub fn task_id(&self) -> i64 {
        match self {
            Self::Truncate(p) => p.task_id,
            Self::Delete(p) => p.task_id,
            Self::Archive(p) => p.task_id,
            Self::Rebuild(p) => p.task_id,
        }
    }
}

#[derive(Default)]
struct MockWorkflowState {
    statuses: HashMap<String, WorkflowStatus>,
    submitted: Vec<(String, SubmittedParams)>,
    stopped: Vec<String>,
    deleted: Vec<String>,
    fail_submit: Option<Fault>,
}

pub struct MockWorkflowDriver {
    state: Mutex<MockWorkflowState>,
}

impl Default for MockWorkflowDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorkflowDriver {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockWorkflowState::default()) }
    }

    fn submit(&self, task_id: i64, params: SubmittedParams) -> Result<String, Fault> {
        let mut state = self.state.lock().unwrap();
        if let Some(fault) = &state.fail_submit {
            return Err(fault.clone());
        }
        let handle = format!("mock/task-{task_id}-{}", Uuid::new_v4());
        state.statuses.insert(handle.clone(), WorkflowStatus::Running);
        state.submitted.push((handle.clone(), params));
        Ok(handle)
    }

    /// Steer the reported status of a handle.
    pub fn set_status(&self, handle: &str, status: WorkflowStatus) {
        self.state.lock().unwrap().statuses.insert(handle.to_string(), status);
    }

    pub fn fail_next_submits(&self, fault: Option<Fault>) {
        self.state.lock().unwrap().fail_submit = fault;
    }

    pub fn submitted(&self) -> Vec<(String, SubmittedParams)> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        self.state.lock().unwrap().stopped.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl WorkflowDriver for MockWorkflowDriver {
    async fn truncate_data(&self, params: &TruncateParams) -> Result<String, Fault> {
        self.submit(params.task_id, SubmittedParams::Truncate(params.clone()))
    }

    async fn delete_data(&self, params: &DeleteParams) -> Result<String, Fault> {
        self.submit(params.task_id, SubmittedParams::Delete(params.clone()))
    }

    async fn archive_data(&self, params: &ArchiveParams) -> Result<String, Fault> {
        self.submit(params.task_id, SubmittedParams::Archive(params.clone()))
    }

    async fn rebuild_tables(&self, params: &RebuildParams) -> Result<String, Fault> {
        self.submit(params.task_id, SubmittedParams::Rebuild(params.clone()))
    }

    async fn workflow_status(&self, handle: &str) -> Result<WorkflowStatus, Fault> {
        self.state
            .lock()
            .unwrap()
            .statuses
            .get(handle)
            .copied()
            .ok_or_else(|| Fault::new(codes::WORKFLOW_GET_STATUS_ERR, format!("workflow ({handle}) not found")))
    }

    async fn workflow_addr(&self, handle: &str) -> Result<String, Fault> {
        Ok(format!("mock://{handle}"))
    }

    async fn stop_workflow(&self, handle: &str) -> Result<(), Fault> {
        let mut state = self.state.lock().unwrap();
        state.stopped.push(handle.to_string());
        state.statuses.insert(handle.to_string(), WorkflowStatus::Failed);
        Ok(())
    }

    async fn delete_workflow(&self, handle: &str) -> Result<(), Fault> {
        let mut state = self.state.lock().unwrap();
        state.deleted.push(handle.to_string());
        state.statuses.remove(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::Callback;

    fn truncate_params(task_id: i64) -> TruncateParams {
        TruncateParams {
            task_id,
            host: "127.0.0.1".into(),
            port: 3306,
            user: "steward".into(),
            password: "secret".into(),
            database: "shop".into(),
            tables: "orders".into(),
            callback: Callback { url: "http://localhost/task/result".into(), token: "t".into() },
        }
    }

    #[tokio::test]
    async fn test_submit_and_status() {
        let driver = MockWorkflowDriver::new();
        let handle = driver.truncate_data(&truncate_params(7)).await.unwrap();
        assert_eq!(driver.workflow_status(&handle).await.unwrap(), WorkflowStatus::Running);

        driver.set_status(&handle, WorkflowStatus::Succeeded);
        assert_eq!(driver.workflow_status(&handle).await.unwrap(), WorkflowStatus::Succeeded);
        assert_eq!(driver.submitted().len(), 1);
        assert_eq!(driver.submitted()[0].1.task_id(), 7);
    }

    #[tokio::test]
    async fn test_stop_marks_failed() {
        let driver = MockWorkflowDriver::new();
        let handle = driver.truncate_data(&truncate_params(7)).await.unwrap();
        driver.stop_workflow(&handle).await.unwrap();
        assert_eq!(driver.workflow_status(&handle).await.unwrap(), WorkflowStatus::Failed);
        assert_eq!(driver.stopped(), vec![handle]);
    }

    #[tokio::test]
    async fn test_submit_failure_injection() {
        let driver = MockWorkflowDriver::new();
        driver.fail_next_submits(Some(Fault::new(codes::WORKFLOW_CALL_FAILED, "down")));
        assert!(driver.truncate_data(&truncate_params(7)).await.is_err());
    }
}
