//! Disk guard: stops in-flight workflows when source disk pressure crosses
//! the configured threshold. Runs every ten seconds while enabled.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskStatus;
use crate::domain::ports::{
    ClusterDirectory as _, ClusterDriver as _, ConfigRepository as _, TaskRepository as _,
    WorkflowDriver as _,
};

use super::{changelog, SchedulerContext, SYSTEM_USER};

pub struct DiskGuard {
    ctx: Arc<SchedulerContext>,
}

impl DiskGuard {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    pub async fn check_pass(&self) -> DomainResult<()> {
        let ctx = &self.ctx;
        let config = ctx.config.load_or_seed().await?;
        if !config.source_status_detect {
            tracing::debug!("source status detection disabled");
            return Ok(());
        }

        let executing = ctx.tasks.list_by_status(&[TaskStatus::Executing]).await?;
        for task in executing {
            let driver = match ctx.clusters.driver_for(&task.src_cluster_id).await {
                Ok(d) => d,
                Err(fault) => {
                    tracing::error!(task_id = task.id, cluster = %task.src_cluster_id, "resolve cluster failed: {fault}");
                    continue;
                }
            };

            let usage = match driver.get_disk_usage().await {
                Ok(u) => u,
                Err(fault) => {
                    tracing::error!(task_id = task.id, cluster = %task.src_cluster_id, "read disk usage failed: {fault}");
                    continue;
                }
            };

            if usage <= config.source_status_detect_disk_usage {
                continue;
            }

            let detail = format!(
                "cluster ({}) disk usage ({usage}%) > threshold ({}%)",
                task.src_cluster_id, config.source_status_detect_disk_usage
            );
            tracing::warn!(task_id = task.id, workflow = %task.workflow, "{detail}");

            match ctx.workflow.stop_workflow(&task.workflow).await {
                Ok(()) => {
                    tracing::info!(task_id = task.id, workflow = %task.workflow, "workflow stopped");
                    ctx.changelog
                        .record(&task, SYSTEM_USER, changelog::workflow_stopped(&detail))
                        .await;
                }
                Err(fault) => {
                    tracing::error!(task_id = task.id, workflow = %task.workflow, "stop workflow failed: {fault}");
                }
            }
        }
        Ok(())
    }
}
