//! Sentinel driver for unknown workflow driver tags.

use async_trait::async_trait;

use crate::domain::errors::{codes, Fault};
use crate::domain::ports::{
    ArchiveParams, DeleteParams, RebuildParams, TruncateParams, WorkflowDriver, WorkflowStatus,
};

pub struct UnsupportedWorkflowDriver {
    tag: String,
}

impl UnsupportedWorkflowDriver {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    fn fault(&self) -> Fault {
        Fault::new(codes::WORKFLOW_UNSUPPORTED, format!("workflow driver ({})", self.tag))
    }
}

#[async_trait]
impl WorkflowDriver for UnsupportedWorkflowDriver {
    async fn truncate_data(&self, _params: &TruncateParams) -> Result<String, Fault> {
        Err(self.fault())
    }

    async fn delete_data(&self, _params: &DeleteParams) -> Result<String, Fault> {
        Err(self.fault())
    }

    async fn archive_data(&self, _params: &ArchiveParams) -> Result<String, Fault> {
        Err(self.fault())
    }

    async fn rebuild_tables(&self, _params: &RebuildParams) -> Result<String, Fault> {
        Err(self.fault())
    }

    async fn workflow_status(&self, _handle: &str) -> Result<WorkflowStatus, Fault> {
        Err(self.fault())
    }

    async fn workflow_addr(&self, _handle: &str) -> Result<String, Fault> {
        Err(self.fault())
    }

    async fn stop_workflow(&self, _handle: &str) -> Result<(), Fault> {
        Err(self.fault())
    }

    async fn delete_workflow(&self, _handle: &str) -> Result<(), Fault> {
        Err(self.fault())
    }
}
