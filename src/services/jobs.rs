//! The periodic jobs of the scheduler and their registration.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::TaskStatus;
use crate::domain::ports::{Clock as _, PolicyRepository as _, TaskRepository as _};

use super::cron_runner::CronRunner;
use super::policy_reconciler::could_check_before_exec;
use super::queue::{PolicyHandle, TaskHandle};
use super::{DiskGuard, Dispatcher, ResultReconciler, SchedulerContext};

/// Cron expressions for the calendar-driven jobs; the interval jobs are
/// fixed.
#[derive(Debug, Clone)]
pub struct JobSchedules {
    /// Daily policy-to-task reconciliation sweep.
    pub reconcile_policies: String,
    /// Pre-exec scan of scheduled tasks.
    pub check_scheduled: String,
    /// Workflow artifact retention cleanup.
    pub clean_workflows: String,
}

impl Default for JobSchedules {
    fn default() -> Self {
        Self {
            reconcile_policies: "0 0 2 * * *".to_string(),
            check_scheduled: "0 0 * * * *".to_string(),
            clean_workflows: "0 30 3 * * *".to_string(),
        }
    }
}

fn job<F, Fut>(ctx: &Arc<SchedulerContext>, f: F) -> impl Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static
where
    F: Fn(Arc<SchedulerContext>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let ctx = ctx.clone();
    move || f(ctx.clone()).boxed()
}

/// Wire every periodic job into the runner.
pub fn register_jobs(
    runner: &mut CronRunner,
    ctx: &Arc<SchedulerContext>,
    schedules: &JobSchedules,
) -> DomainResult<()> {
    runner.add_cron(
        "reconcile-all-policies",
        &schedules.reconcile_policies,
        job(ctx, reconcile_all_policies),
    )?;
    runner.add_cron(
        "check-scheduled-tasks",
        &schedules.check_scheduled,
        job(ctx, check_scheduled_tasks),
    )?;
    runner.add_cron("clean-workflows", &schedules.clean_workflows, job(ctx, clean_workflows))?;

    runner.add_interval(
        "recheck-supplement-failed",
        Duration::from_secs(60),
        job(ctx, recheck_supplement_failed),
    );
    runner.add_interval("run-admitted-tasks", Duration::from_secs(60), job(ctx, run_admitted_tasks));
    runner.add_interval(
        "check-workflow-timeout",
        Duration::from_secs(60),
        job(ctx, check_workflow_timeout),
    );
    runner.add_interval("disk-guard", Duration::from_secs(10), job(ctx, disk_guard));
    Ok(())
}

/// Enqueue every enabled policy for reconciliation.
pub async fn reconcile_all_policies(ctx: Arc<SchedulerContext>) {
    let policies = match ctx.policies.list_enabled().await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("list enabled policies failed: {e}");
            return;
        }
    };
    for policy in policies {
        let handle = PolicyHandle::new(policy.id);
        if ctx.policy_queue.push(handle) {
            tracing::info!(policy_id = policy.id, policy = %policy.name, "policy queued");
        } else {
            tracing::debug!(policy_id = policy.id, policy = %policy.name, "policy already queued");
        }
    }
}

/// Enqueue scheduled tasks whose execute date is at most a day out, so a
/// failed pre-exec check leaves time for a human to intervene.
pub async fn check_scheduled_tasks(ctx: Arc<SchedulerContext>) {
    let tasks = match ctx.tasks.list_enabled_by_status(&[TaskStatus::Scheduled]).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("list scheduled tasks failed: {e}");
            return;
        }
    };
    let today = ctx.clock.today();
    for task in tasks {
        if !could_check_before_exec(task.execute_date, today) {
            tracing::debug!(task_id = task.id, execute_date = %task.execute_date, "execute date not close enough");
            continue;
        }
        let handle = TaskHandle::new(task.id, task.policy_id);
        if ctx.task_queue.push(handle) {
            tracing::info!(task_id = task.id, task = %task.name, "task queued for supplementation");
        } else {
            tracing::debug!(task_id = task.id, task = %task.name, "task already queued");
        }
    }
}

/// Re-enqueue every supplement-failed task for another validation attempt.
pub async fn recheck_supplement_failed(ctx: Arc<SchedulerContext>) {
    let tasks = match ctx.tasks.list_enabled_by_status(&[TaskStatus::SupplementFailed]).await {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("list supplement-failed tasks failed: {e}");
            return;
        }
    };
    for task in tasks {
        let handle = TaskHandle::new(task.id, task.policy_id);
        if ctx.task_queue.push(handle) {
            tracing::info!(task_id = task.id, task = %task.name, "task queued for recheck");
        }
    }
}

pub async fn run_admitted_tasks(ctx: Arc<SchedulerContext>) {
    if let Err(e) = Dispatcher::new(ctx).run_pass().await {
        tracing::error!("dispatch pass failed: {e}");
    }
}

pub async fn check_workflow_timeout(ctx: Arc<SchedulerContext>) {
    if let Err(e) = ResultReconciler::new(ctx).poll_pass().await {
        tracing::error!("workflow poll pass failed: {e}");
    }
}

pub async fn disk_guard(ctx: Arc<SchedulerContext>) {
    if let Err(e) = DiskGuard::new(ctx).check_pass().await {
        tracing::error!("disk guard pass failed: {e}");
    }
}

pub async fn clean_workflows(ctx: Arc<SchedulerContext>) {
    if let Err(e) = ResultReconciler::new(ctx).clean_pass().await {
        tracing::error!("workflow cleanup pass failed: {e}");
    }
}
