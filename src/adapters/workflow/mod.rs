//! Workflow driver implementations and selection.

pub mod argo;
pub mod mock;
pub mod unsupported;

use std::sync::Arc;

use crate::domain::ports::WorkflowDriver;

pub use argo::{ArgoTemplates, ArgoWorkflowDriver};
pub use mock::{MockWorkflowDriver, SubmittedParams};
pub use unsupported::UnsupportedWorkflowDriver;

/// Select a workflow driver by its config tag.
pub fn new_workflow_driver(
    tag: &str,
    argo_url: &str,
    argo_token: &str,
    templates: ArgoTemplates,
) -> Arc<dyn WorkflowDriver> {
    match tag {
        "argo" => Arc::new(ArgoWorkflowDriver::new(argo_url, argo_token, templates)),
        "mock" => Arc::new(MockWorkflowDriver::new()),
        other => Arc::new(UnsupportedWorkflowDriver::new(other)),
    }
}
