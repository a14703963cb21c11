//! Policy reconciler: turns a policy into its dated pending task.
//!
//! One worker drains the policy queue. For each handle the reconciler
//! either creates a fresh task, updates the pending one, or does nothing;
//! a store error aborts the whole reconciliation and the handle is dropped
//! (the daily cron re-enqueues every enabled policy).

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    format_execute_date, missed_exec_date_and_window, next_schedule_time, Period, Policy, Task,
    TaskStatus, WindowPosition,
};
use crate::domain::ports::{Clock as _, PolicyRepository as _, SourceRepository as _, TaskRepository as _};

use super::changelog;
use super::queue::TaskHandle;
use super::{SchedulerContext, SYSTEM_USER};

/// How often the worker polls an empty queue.
const DRAIN_TICK: Duration = Duration::from_millis(100);

pub struct PolicyReconciler {
    ctx: Arc<SchedulerContext>,
}

impl PolicyReconciler {
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
                        tracing::info!("policy reconciler stopped");
                        return;
                    }
                }
                _ = tick.tick() => {
                    if let Some(handle) = self.ctx.policy_queue.pop() {
                        tracing::info!(policy_id = handle.id, handle_id = %handle.handle_id, "policy out of queue");
                        if let Err(e) = self.reconcile(handle.id, &handle.handle_id).await {
                            tracing::error!(policy_id = handle.id, handle_id = %handle.handle_id, "reconcile policy failed: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Create-or-update the pending task of one policy.
    pub async fn reconcile(&self, policy_id: i64, handle_id: &str) -> DomainResult<()> {
        let ctx = &self.ctx;

        let policy = match ctx.policies.get(policy_id).await? {
            Some(p) => p,
            None => {
                tracing::debug!(policy_id, "policy gone, nothing to reconcile");
                return Ok(());
            }
        };

        let could_create = policy.enable
            && ctx
                .tasks
                .count_for_policy_excluding(policy_id, &TaskStatus::TERMINAL)
                .await?
                == 0;
        let could_update = ctx
            .tasks
            .count_for_policy_in(policy_id, &TaskStatus::CAN_UPDATE)
            .await?
            != 0;

        if !could_create && !could_update {
            tracing::debug!(policy_id, "neither create nor update needed");
            return Ok(());
        }

        let mut created = false;
        let mut updated = false;
        let mut rechecked = false;
        let mut task = if could_create {
            created = true;
            self.create_task(&policy).await?
        } else {
            let (task, changed, flag_was_set) = self.update_task(&policy).await?;
            updated = changed;
            rechecked = flag_was_set;
            task
        };

        if !created && !updated && !rechecked {
            tracing::debug!(policy_id, task_id = task.id, "pending task unchanged");
            return Ok(());
        }

        // One-off policies go dormant once their task exists.
        if created && policy.period == Period::Once {
            ctx.policies.set_enable(policy.id, false).await?;
        }

        if created {
            ctx.changelog.record(&task, SYSTEM_USER, changelog::TASK_CREATED).await;
            tracing::info!(policy_id, task_id = task.id, execute_date = %task.execute_date, "task created");
        } else if updated {
            ctx.changelog
                .record(
                    &task,
                    SYSTEM_USER,
                    changelog::updated_by_policy(
                        &task.execute_date.to_string(),
                        &task.execute_window.to_string(),
                    ),
                )
                .await;
            tracing::info!(policy_id, task_id = task.id, execute_date = %task.execute_date, "task updated");
        }

        // Within one day of its date the task goes straight to pre-exec
        // checking instead of waiting for the hourly scan.
        if could_check_before_exec(task.execute_date, ctx.clock.today()) {
            task = ctx.tasks.get(task.id).await?.ok_or(DomainError::TaskNotFound(task.id))?;
            let handle = TaskHandle::with_handle_id(task.id, task.policy_id, handle_id);
            if ctx.task_queue.push(handle) {
                tracing::info!(task_id = task.id, "task pushed for supplementation");
            } else {
                tracing::info!(task_id = task.id, "task already queued");
            }
        }

        Ok(())
    }

    /// Create path: date the next task and snapshot the policy + source.
    async fn create_task(&self, policy: &Policy) -> DomainResult<Task> {
        let ctx = &self.ctx;
        let source = ctx
            .sources
            .get(policy.src_id)
            .await?
            .ok_or(DomainError::SourceNotFound(policy.src_id))?;

        let last = ctx
            .tasks
            .last_for_policy_in(policy.id, &TaskStatus::EXEC_TIME_IMMUTABLE)
            .await?;

        let execute_date = match last {
            // A period after the previous run's planned date.
            Some(last) if policy.period != Period::Once => format_execute_date(
                policy.period,
                policy.day,
                next_schedule_time(policy.period, last.execute_date),
            ),
            // Never ran: today, unless today's slot is already missed.
            _ => self.first_execute_date(policy),
        };

        let mut task = Task::materialize(policy, &source, execute_date);
        let id = ctx.tasks.create(&task).await?;
        task.id = id;
        Ok(task)
    }

    /// Execute date for a policy with no prior dispatched task.
    fn first_execute_date(&self, policy: &Policy) -> NaiveDate {
        let now = self.ctx.clock.now_naive();
        let missed =
            missed_exec_date_and_window(policy.period, policy.day, &policy.execute_window, now);
        let base = if missed {
            next_schedule_time(policy.period, now.date())
        } else {
            now.date()
        };
        format_execute_date(policy.period, policy.day, base)
    }

    /// Update path: collapse to the single canonical pending task and apply
    /// policy changes. Returns `(task, anything_changed, recheck_flag_was_set)`.
    async fn update_task(&self, policy: &Policy) -> DomainResult<(Task, bool, bool)> {
        let ctx = &self.ctx;
        let mut pending = ctx
            .tasks
            .list_for_policy(policy.id, &TaskStatus::CAN_UPDATE)
            .await?;
        if pending.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "policy {} has no updatable task",
                policy.id
            )));
        }

        // At most one pending task per policy; the lowest id wins.
        let mut task = pending.remove(0);
        for extra in pending {
            ctx.tasks.delete(extra.id).await?;
            tracing::warn!(policy_id = policy.id, task_id = extra.id, "deleted redundant pending task");
        }

        if !task.need_check_execute_date {
            return Ok((task, false, false));
        }

        let date_changed = self.recalculate_exec_date(policy, &mut task).await?;
        let info_changed = task.propagate_policy_fields(policy);
        task.need_check_execute_date = false;
        ctx.tasks.save(&task).await?;

        Ok((task, date_changed || info_changed, true))
    }

    /// Recompute the pending task's execute date after a policy edit.
    /// Returns whether date or window changed.
    async fn recalculate_exec_date(&self, policy: &Policy, task: &mut Task) -> DomainResult<bool> {
        let ctx = &self.ctx;
        let now = ctx.clock.now_naive();

        // One-off tasks ignore prior history.
        let last = if policy.period != Period::Once {
            ctx.tasks
                .last_for_policy_in(policy.id, &TaskStatus::EXEC_TIME_IMMUTABLE)
                .await?
        } else {
            None
        };

        let mut new_date = match last {
            Some(last) => format_execute_date(
                policy.period,
                policy.day,
                next_schedule_time(policy.period, last.execute_date),
            ),
            None => self.first_execute_date(policy),
        };

        // The recomputed slot may itself already be missed; push one more
        // period out from the present.
        if policy.execute_window.position(new_date, now) == WindowPosition::After {
            new_date = format_execute_date(
                policy.period,
                policy.day,
                next_schedule_time(policy.period, now.date()),
            );
        }

        if task.execute_date != new_date || task.execute_window != policy.execute_window {
            task.task_status = TaskStatus::Scheduled;
            task.execute_date = new_date;
            task.execute_window = policy.execute_window;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Pre-exec checks start one day ahead of the execute date so a human can
/// step in before the window opens.
pub fn could_check_before_exec(execute_date: NaiveDate, today: NaiveDate) -> bool {
    execute_date <= today + chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_could_check_before_exec() {
        let today = date(2024, 1, 14);
        assert!(could_check_before_exec(date(2024, 1, 14), today));
        assert!(could_check_before_exec(date(2024, 1, 15), today));
        assert!(!could_check_before_exec(date(2024, 1, 16), today));
        assert!(could_check_before_exec(date(2024, 1, 1), today));
    }
}
