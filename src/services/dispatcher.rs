//! Dispatcher: admission, ordering and workflow submission.
//!
//! Runs once per `run-admitted-tasks` tick. Candidates are every enabled
//! task in `waiting` or `exec_check_failed`; each passes the admission
//! gates, the admitted set is ordered, then dispatched one at a time with
//! parallelism and conflict re-checked before every submit (state moves
//! under the batch).

use base64::Engine as _;
use std::sync::Arc;

use crate::domain::errors::{codes, DomainResult, Fault};
use crate::domain::models::{Govern, Task, TaskStatus};
use crate::domain::ports::{
    ArchiveDestination, ArchiveParams, Callback, Clock as _, ClusterDirectory as _,
    ClusterDriver as _, ConfigRepository as _, DeleteParams, RebuildParams, TaskRepository as _,
    TruncateParams, WorkflowDriver as _,
};

use super::{admission, changelog, SchedulerContext, SYSTEM_USER};

pub struct Dispatcher {
    ctx: Arc<SchedulerContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// One full admission + dispatch pass.
    pub async fn run_pass(&self) -> DomainResult<()> {
        let ctx = &self.ctx;
        let config = ctx.config.load_or_seed().await?;
        let candidates = ctx.tasks.list_enabled_by_status(&TaskStatus::CAN_EXEC).await?;
        let now = ctx.clock.now_naive();

        let mut admitted = Vec::new();
        for task in candidates {
            match admission::admit(&ctx.tasks, &config, &task, now).await {
                Ok(()) => {
                    tracing::info!(task_id = task.id, task = %task.name, "task passed admission");
                    admitted.push(task);
                }
                Err(fault) => {
                    self.record_denial(task, &fault).await?;
                }
            }
        }

        admission::dispatch_order(&mut admitted);

        for mut task in admitted {
            // State moved while earlier candidates dispatched; re-check the
            // capacity gates.
            if let Err(fault) = admission::parallel_gate(&ctx.tasks, &config).await {
                self.record_denial(task, &fault).await?;
                continue;
            }
            if let Err(fault) = admission::conflict_gate(&ctx.tasks, &config, &task).await {
                self.record_denial(task, &fault).await?;
                continue;
            }

            if self.pre_exec_capture(&mut task).await.is_err() {
                continue;
            }
            if let Err(e) = self.call_workflow(&mut task).await {
                tracing::error!(task_id = task.id, "workflow submission failed: {e}");
            }
        }

        Ok(())
    }

    /// Persist a denied candidate's reason without changing its status.
    async fn record_denial(&self, mut task: Task, fault: &Fault) -> DomainResult<()> {
        let orig_reason = task.task_reason.clone();
        task.task_reason = fault.code.message.to_string();
        task.task_detail = fault.detail.clone();
        tracing::info!(task_id = task.id, reason = %task.task_reason, "task not admitted");

        self.ctx.tasks.save(&task).await?;
        if task.task_reason != orig_reason {
            self.ctx
                .changelog
                .record(&task, SYSTEM_USER, changelog::waiting_exec(&task.task_reason, &task.task_detail))
                .await;
        }
        Ok(())
    }

    /// Capture free disk and the pre-clean table size sum right before
    /// dispatch. Failure parks the task in `exec_check_failed` for the next
    /// tick.
    async fn pre_exec_capture(&self, task: &mut Task) -> Result<(), Fault> {
        let ctx = &self.ctx;
        let orig_status = task.task_status;
        let orig_reason = task.task_reason.clone();

        let outcome = async {
            let driver = ctx.clusters.driver_for(&task.src_cluster_id).await?;
            let free_disk = driver
                .get_free_disk()
                .await
                .map_err(|f| Fault::new(codes::CLUSTER_FREE_DISK_ERR, f.to_string()))?;
            let table_size = driver
                .get_tables_size(&task.src_database_name, &task.src_tables())
                .await?;
            Ok::<(i64, i64), Fault>((free_disk, table_size))
        }
        .await;

        match outcome {
            Ok((free_disk, table_size)) => {
                task.src_cluster_free_disk = free_disk;
                task.src_cluster_sum_table_size = table_size;
                if let Err(e) = ctx.tasks.save(task).await {
                    tracing::error!(task_id = task.id, "persist pre-exec capture failed: {e}");
                }
                Ok(())
            }
            Err(fault) => {
                task.set_fault(TaskStatus::ExecCheckFailed, &fault);
                if let Err(e) = ctx.tasks.save(task).await {
                    tracing::error!(task_id = task.id, "persist exec-check failure failed: {e}");
                }
                if task.task_status != orig_status || task.task_reason != orig_reason {
                    ctx.changelog
                        .record(task, SYSTEM_USER, changelog::waiting_exec(&task.task_reason, &task.task_detail))
                        .await;
                }
                Err(fault)
            }
        }
    }

    /// Resolve credentials, mint the per-task callback token and submit the
    /// workflow matching the task's govern action.
    async fn call_workflow(&self, task: &mut Task) -> DomainResult<()> {
        let ctx = &self.ctx;
        let orig_status = task.task_status;
        let orig_reason = task.task_reason.clone();

        let outcome = self.submit(task).await;

        match outcome {
            Ok(ref handle) => {
                task.workflow = handle.clone();
                task.task_status = TaskStatus::Executing;
                task.clear_fault();
                task.task_start_time = Some(ctx.clock.now());
            }
            Err(ref fault) => {
                // Submission failures are terminal; anything earlier (cluster
                // lookup, credentials) is retried on the next tick.
                let status = if fault.code == codes::WORKFLOW_CALL_FAILED
                    || fault.code == codes::WORKFLOW_UNSUPPORTED
                {
                    TaskStatus::Failed
                } else {
                    TaskStatus::ExecCheckFailed
                };
                task.set_fault(status, fault);
            }
        }

        ctx.tasks.save(task).await?;

        if task.task_status != orig_status || task.task_reason != orig_reason {
            let content = if task.task_status == TaskStatus::Executing {
                changelog::WORKFLOW_CALLED.to_string()
            } else {
                changelog::workflow_call_failed(&task.task_reason, &task.task_detail)
            };
            ctx.changelog.record(task, SYSTEM_USER, content).await;
        }

        outcome.map(|_| ()).map_err(Into::into)
    }

    async fn submit(&self, task: &Task) -> Result<String, Fault> {
        let ctx = &self.ctx;
        let driver = ctx.clusters.driver_for(&task.src_cluster_id).await?;
        let info = driver.cluster_info().await?;

        let callback = Callback {
            url: ctx.callback_url(),
            token: ctx.tokens.issue_result_token(task.id)?,
        };
        // The predicate may carry arbitrary SQL characters; base64 survives
        // the driver's parameter encoding.
        let condition = base64::engine::general_purpose::STANDARD.encode(&task.condition);
        let free_disk = task.src_cluster_free_disk.to_string();

        let handle = match task.govern {
            Govern::Truncate => {
                ctx.workflow
                    .truncate_data(&TruncateParams {
                        task_id: task.id,
                        host: info.host,
                        port: info.port,
                        user: info.user,
                        password: info.password,
                        database: task.src_database_name.clone(),
                        tables: task.src_tables_name.clone(),
                        callback,
                    })
                    .await?
            }
            Govern::Delete => {
                ctx.workflow
                    .delete_data(&DeleteParams {
                        task_id: task.id,
                        start_time: task.execute_window.start_str(),
                        end_time: task.execute_window.end_str(),
                        host: info.host,
                        port: info.port,
                        user: info.user,
                        password: info.password,
                        database: task.src_database_name.clone(),
                        tables: task.src_tables_name.clone(),
                        condition,
                        rebuild_flag: task.rebuild_flag,
                        cleaning_speed: task.cleaning_speed,
                        free_disk,
                        callback,
                    })
                    .await?
            }
            Govern::Archive => {
                ctx.workflow
                    .archive_data(&ArchiveParams {
                        task_id: task.id,
                        host: info.host,
                        port: info.port,
                        user: info.user,
                        password: info.password,
                        database: task.src_database_name.clone(),
                        tables: task.src_tables_name.clone(),
                        condition,
                        cleaning_speed: task.cleaning_speed,
                        retain_src_data: task.retain_src_data,
                        free_disk,
                        destination: ArchiveDestination {
                            storage: task.dest_storage,
                            database: task.dest_database_name.clone(),
                            table: task.dest_table_name.clone(),
                            compress: task.dest_compress,
                        },
                        callback,
                    })
                    .await?
            }
            Govern::Rebuild => {
                ctx.workflow
                    .rebuild_tables(&RebuildParams {
                        task_id: task.id,
                        host: info.host,
                        port: info.port,
                        user: info.user,
                        password: info.password,
                        database: task.src_database_name.clone(),
                        tables: task.src_tables_name.clone(),
                        free_disk,
                        callback,
                    })
                    .await?
            }
            Govern::BackupDelete => {
                return Err(Fault::new(
                    codes::WORKFLOW_UNSUPPORTED,
                    format!("govern ({}) has no workflow", task.govern.as_str()),
                ));
            }
        };

        Ok(handle)
    }
}
