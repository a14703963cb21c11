//! Argo-style HTTP workflow driver.
//!
//! Submits template-based workflows over the Argo Server REST API. Handles
//! are `namespace/name`. Templates per govern action come from the process
//! configuration as `namespace/template-name` strings.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::errors::{codes, Fault};
use crate::domain::ports::{
    ArchiveParams, DeleteParams, RebuildParams, TruncateParams, WorkflowDriver, WorkflowStatus,
};

/// Workflow template names per action, `namespace/template`.
#[derive(Debug, Clone, Default, serde::Serialize, Deserialize)]
pub struct ArgoTemplates {
    pub truncate: String,
    pub delete: String,
    pub archive: String,
    pub rebuild: String,
}

pub struct ArgoWorkflowDriver {
    base_url: String,
    token: String,
    templates: ArgoTemplates,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ArgoResponse {
    #[serde(default)]
    metadata: ArgoMetadata,
    #[serde(default)]
    status: ArgoStatus,
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Default)]
struct ArgoMetadata {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Default)]
struct ArgoStatus {
    #[serde(default)]
    phase: String,
}

impl ArgoWorkflowDriver {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, templates: ArgoTemplates) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            templates,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
        }
    }

    fn split_template(template: &str) -> Result<(&str, &str), Fault> {
        template.split_once('/').ok_or_else(|| {
            Fault::new(
                codes::WORKFLOW_CALL_FAILED,
                format!("workflow template ({template}) must be namespace/name"),
            )
        })
    }

    fn split_handle(handle: &str) -> Result<(&str, &str), Fault> {
        handle.split_once('/').ok_or_else(|| {
            Fault::new(
                codes::WORKFLOW_GET_STATUS_ERR,
                format!("workflow handle ({handle}) must be namespace/name"),
            )
        })
    }

    /// Submit a workflow template with key=value parameters.
    async fn submit(&self, template: &str, parameters: Vec<String>) -> Result<String, Fault> {
        let (namespace, name) = Self::split_template(template)?;
        let url = format!("{}/api/v1/workflows/{namespace}/submit", self.base_url);
        let body = json!({
            "resourceKind": "WorkflowTemplate",
            "resourceName": name,
            "submitOptions": { "parameters": parameters },
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, e.to_string()))?;

        let parsed: ArgoResponse = resp
            .json()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, format!("bad argo response: {e}")))?;

        if parsed.code != 0 {
            return Err(Fault::new(
                codes::WORKFLOW_CALL_FAILED,
                format!("submit workflow ({template}) refused: {}", parsed.message),
            ));
        }

        Ok(format!("{}/{}", parsed.metadata.namespace, parsed.metadata.name))
    }
}

fn callback_parameters(url: &str, token: &str) -> [String; 2] {
    [format!("callback_url={url}"), format!("callback_token={token}")]
}

#[async_trait]
impl WorkflowDriver for ArgoWorkflowDriver {
    async fn truncate_data(&self, p: &TruncateParams) -> Result<String, Fault> {
        let mut parameters = vec![
            format!("task_id={}", p.task_id),
            format!("host={}", p.host),
            format!("port={}", p.port),
            format!("user={}", p.user),
            format!("password={}", p.password),
            format!("database={}", p.database),
            format!("tables={}", p.tables),
        ];
        parameters.extend(callback_parameters(&p.callback.url, &p.callback.token));
        self.submit(&self.templates.truncate, parameters).await
    }

    async fn delete_data(&self, p: &DeleteParams) -> Result<String, Fault> {
        let mut parameters = vec![
            format!("task_id={}", p.task_id),
            format!("start_time={}", p.start_time),
            format!("end_time={}", p.end_time),
            format!("host={}", p.host),
            format!("port={}", p.port),
            format!("user={}", p.user),
            format!("password={}", p.password),
            format!("database={}", p.database),
            format!("tables={}", p.tables),
            format!("condition={}", p.condition),
            format!("rebuild_flag={}", p.rebuild_flag),
            format!("cleaning_speed={}", p.cleaning_speed.as_str()),
            format!("free_disk={}", p.free_disk),
        ];
        parameters.extend(callback_parameters(&p.callback.url, &p.callback.token));
        self.submit(&self.templates.delete, parameters).await
    }

    async fn archive_data(&self, p: &ArchiveParams) -> Result<String, Fault> {
        let mut parameters = vec![
            format!("task_id={}", p.task_id),
            format!("host={}", p.host),
            format!("port={}", p.port),
            format!("user={}", p.user),
            format!("password={}", p.password),
            format!("database={}", p.database),
            format!("tables={}", p.tables),
            format!("condition={}", p.condition),
            format!("cleaning_speed={}", p.cleaning_speed.as_str()),
            format!("retain_src_data={}", p.retain_src_data),
            format!("free_disk={}", p.free_disk),
            format!("dest_storage={}", p.destination.storage.as_str()),
            format!("dest_database={}", p.destination.database),
            format!("dest_table={}", p.destination.table),
            format!("dest_compress={}", p.destination.compress),
        ];
        parameters.extend(callback_parameters(&p.callback.url, &p.callback.token));
        self.submit(&self.templates.archive, parameters).await
    }

    async fn rebuild_tables(&self, p: &RebuildParams) -> Result<String, Fault> {
        let mut parameters = vec![
            format!("task_id={}", p.task_id),
            format!("host={}", p.host),
            format!("port={}", p.port),
            format!("user={}", p.user),
            format!("password={}", p.password),
            format!("database={}", p.database),
            format!("tables={}", p.tables),
            format!("free_disk={}", p.free_disk),
        ];
        parameters.extend(callback_parameters(&p.callback.url, &p.callback.token));
        self.submit(&self.templates.rebuild, parameters).await
    }

    async fn workflow_status(&self, handle: &str) -> Result<WorkflowStatus, Fault> {
        let (namespace, name) = Self::split_handle(handle)?;
        let url = format!("{}/api/v1/workflows/{namespace}/{name}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_GET_STATUS_ERR, e.to_string()))?;

        let parsed: ArgoResponse = resp
            .json()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_GET_STATUS_ERR, format!("bad argo response: {e}")))?;

        if parsed.code != 0 {
            return Err(Fault::new(
                codes::WORKFLOW_GET_STATUS_ERR,
                format!("workflow ({handle}): {}", parsed.message),
            ));
        }

        Ok(WorkflowStatus::from_str(&parsed.status.phase))
    }

    async fn workflow_addr(&self, handle: &str) -> Result<String, Fault> {
        let (_, name) = Self::split_handle(handle)?;
        Ok(format!("{}/workflows/{name}", self.base_url))
    }

    async fn stop_workflow(&self, handle: &str) -> Result<(), Fault> {
        let (namespace, name) = Self::split_handle(handle)?;
        let url = format!("{}/api/v1/workflows/{namespace}/{name}/stop", self.base_url);
        self.client
            .put(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, e.to_string()))?
            .error_for_status()
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, e.to_string()))?;
        Ok(())
    }

    async fn delete_workflow(&self, handle: &str) -> Result<(), Fault> {
        let (namespace, name) = Self::split_handle(handle)?;
        let url = format!("{}/api/v1/workflows/{namespace}/{name}", self.base_url);
        self.client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, e.to_string()))?
            .error_for_status()
            .map_err(|e| Fault::new(codes::WORKFLOW_CALL_FAILED, e.to_string()))?;
        Ok(())
    }
}
