//! Task supplementer: pre-execution validation plus the runtime snapshot.
//!
//! One worker drains the task queue. Starting one day before the execute
//! date it validates the source, the governance condition and (for archive)
//! the destination, then refreshes the task's snapshot fields. Success
//! leaves the task `waiting`; any check failure leaves `supplement_failed`
//! with the coded reason, retried every minute by the recheck job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::domain::errors::{codes, DomainError, DomainResult, Fault};
use crate::domain::models::{
    check_same_sharding_tables, generate_dest_table_name, Govern, Policy, Source, Task, TaskStatus,
};
use crate::domain::ports::{
    Clock as _, ClusterDirectory as _, ClusterDriver as _, ConnectionRepository as _,
    DestinationRepository as _, PolicyRepository as _, SourceRepository as _, TaskRepository as _,
};

use super::changelog;
use super::policy_reconciler::could_check_before_exec;
use super::{SchedulerContext, SYSTEM_USER};

/// How often the worker polls an empty queue.
const DRAIN_TICK: Duration = Duration::from_secs(1);

pub struct TaskSupplementer {
    ctx: Arc<SchedulerContext>,
}

impl TaskSupplementer {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self { ctx }
    }

    /// Worker loop: pop one handle per tick until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut tick = tokio::time::interval(DRAIN_TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("task supplementer stopped");
                        return;
                    }
                }
                _ = tick.tick() => {
                    if let Some(handle) = self.ctx.task_queue.pop() {
                        tracing::info!(task_id = handle.id, handle_id = %handle.handle_id, "task out of queue");
                        match self.supplement(handle.id).await {
                            Ok(()) => tracing::info!(task_id = handle.id, "task information supplemented"),
                            Err(e) => tracing::error!(task_id = handle.id, "supplement task failed: {e}"),
                        }
                    }
                }
            }
        }
    }

    /// Validate and fill one task. Check failures are persisted on the task
    /// and also returned for logging.
    pub async fn supplement(&self, task_id: i64) -> DomainResult<()> {
        let ctx = &self.ctx;

        let mut task = ctx
            .tasks
            .get(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        if !could_check_before_exec(task.execute_date, ctx.clock.today()) {
            tracing::debug!(task_id, execute_date = %task.execute_date, "execute date not close enough, skipping");
            return Ok(());
        }

        let policy = ctx
            .policies
            .get(task.policy_id)
            .await?
            .ok_or(DomainError::PolicyNotFound(task.policy_id))?;
        let source = ctx
            .sources
            .get(policy.src_id)
            .await?
            .ok_or(DomainError::SourceNotFound(policy.src_id))?;

        let orig_status = task.task_status;
        let orig_reason = task.task_reason.clone();

        task.task_start_time = None;
        task.task_end_time = None;
        task.task_status = TaskStatus::Waiting;
        task.clear_fault();
        task.snapshot_from(&policy, &source);

        let outcome = self.run_checks(&policy, &source, &mut task).await;
        if let Err(fault) = &outcome {
            task.set_fault(TaskStatus::SupplementFailed, fault);
        }

        ctx.tasks.save(&task).await?;

        if task.task_status != orig_status || task.task_reason != orig_reason {
            let content = if task.task_status == TaskStatus::SupplementFailed {
                changelog::supplement_failed(&task.task_reason, &task.task_detail)
            } else {
                changelog::SUPPLEMENT_OK.to_string()
            };
            ctx.changelog.record(&task, SYSTEM_USER, content).await;
        }

        outcome.map_err(Into::into)
    }

    async fn run_checks(&self, policy: &Policy, source: &Source, task: &mut Task) -> Result<(), Fault> {
        self.check_source(source).await?;
        self.check_condition(policy, source).await?;
        if policy.govern == Govern::Archive {
            self.check_destination(policy, source, task).await?;
        }
        Ok(())
    }

    /// Source checks: disk readable, database exists, tables exist, primary
    /// keys present, sharded sets conform to one base name.
    async fn check_source(&self, source: &Source) -> Result<(), Fault> {
        let driver = self.ctx.clusters.driver_for(&source.cluster_id).await?;

        driver
            .get_free_disk()
            .await
            .map_err(|f| Fault::new(codes::CLUSTER_FREE_DISK_ERR, f.to_string()))?;

        let databases = driver.get_databases().await?;
        if !databases.contains(&source.database_name) {
            return Err(Fault::new(
                codes::SOURCE_DATABASE_NOT_EXIST,
                format!("database ({}) not found on cluster ({})", source.database_name, source.cluster_id),
            ));
        }

        let requested = source.tables();
        let existing = driver.get_tables(&source.database_name).await?;
        for table in &requested {
            if !existing.contains(table) {
                return Err(Fault::new(
                    codes::SOURCE_TABLE_NOT_EXIST,
                    format!("table ({table}) not found in ({})", source.database_name),
                ));
            }
        }

        driver.tables_have_primary_key(&source.database_name, &requested).await?;

        if requested.len() > 1 {
            check_same_sharding_tables(&source.tables_name)?;
        }
        Ok(())
    }

    /// Predicate check: the condition must parse and match an index plan.
    /// The returned affected-rows estimate is advisory only.
    async fn check_condition(&self, policy: &Policy, source: &Source) -> Result<(), Fault> {
        let driver = self.ctx.clusters.driver_for(&source.cluster_id).await?;
        let tables = source.tables();
        let first = tables.first().cloned().unwrap_or_default();
        driver
            .sql_explain(&source.database_name, &first, &policy.archive_scope, &policy.condition)
            .await
            .map_err(|f| Fault::new(codes::POLICY_CONDITION_ERR, f.to_string()))?;
        Ok(())
    }

    /// Archive only: the destination and its connection must exist and
    /// agree on storage; the table-name template is instantiated here.
    async fn check_destination(
        &self,
        policy: &Policy,
        source: &Source,
        task: &mut Task,
    ) -> Result<(), Fault> {
        let ctx = &self.ctx;
        let dest = ctx
            .destinations
            .get(policy.dest_id)
            .await
            .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?
            .ok_or_else(|| Fault::new(codes::DEST_NOT_EXIST, format!("destination ({})", policy.dest_id)))?;

        let connection = ctx
            .connections
            .get(dest.connection_id)
            .await
            .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?
            .ok_or_else(|| Fault::new(codes::CONN_NOT_EXIST, format!("connection ({})", dest.connection_id)))?;

        if connection.storage != dest.storage {
            return Err(Fault::new(
                codes::DEST_PARAM_ERR,
                format!(
                    "destination storage ({}) does not match connection storage ({})",
                    dest.storage.as_str(),
                    connection.storage.as_str()
                ),
            ));
        }

        // Empty destination database defaults to the source database.
        let dest_database = if dest.database_name.is_empty() {
            source.database_name.clone()
        } else {
            dest.database_name.clone()
        };

        let dest_table = generate_dest_table_name(&source.tables_name, &dest.table_name, ctx.clock.today())
            .map_err(|e| Fault::new(codes::TASK_GEN_DEST_TABLE_NAME_ERR, e.to_string()))?;

        task.dest_id = policy.dest_id;
        task.dest_name = dest.name;
        task.dest_storage = dest.storage;
        task.dest_connection_id = dest.connection_id;
        task.dest_compress = dest.compress;
        task.dest_database_name = dest_database;
        task.dest_table_name = dest_table;
        Ok(())
    }
}
