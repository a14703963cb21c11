//! Admission pipeline: the ordered gates a candidate task passes before
//! dispatch. The first failing gate yields a coded denial that is recorded
//! on the task without dispatching.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::{
    check_same_sharding_tables, ConflictLevel, RuntimeConfig, Task, TaskStatus, WindowPosition,
};
use crate::domain::ports::TaskRepository;

/// Gate 1: the execute date must have arrived.
pub fn exec_date_gate(task: &Task, today: NaiveDate) -> Result<(), Fault> {
    if task.execute_date <= today {
        return Ok(());
    }
    Err(Fault::new(
        codes::TASK_EXEC_DATE_NOT_REACHED,
        format!("execute date ({}) > today ({})", task.execute_date, today),
    ))
}

/// Gate 2: the wall clock must be inside the task's window.
pub fn window_gate(task: &Task, now: NaiveDateTime) -> Result<(), Fault> {
    match task.execute_window.position(task.execute_date, now) {
        WindowPosition::Inside => Ok(()),
        WindowPosition::Before => Err(Fault::new(
            codes::TASK_NOT_REACHED_EXEC_WIN,
            format!("window {} not yet open", task.execute_window),
        )),
        WindowPosition::After => Err(Fault::new(
            codes::TASK_MISSED_EXEC_WIN,
            format!("window {} already closed", task.execute_window),
        )),
    }
}

/// Gate 3: the global executing-task count must be below the cap.
pub async fn parallel_gate(tasks: &Arc<dyn TaskRepository>, config: &RuntimeConfig) -> Result<(), Fault> {
    let executing = tasks
        .count_by_status(&[TaskStatus::Executing])
        .await
        .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?;
    if executing >= config.task_max_parallel as u64 {
        return Err(Fault::new(
            codes::TASK_PARALLEL_UPPER_LIMIT,
            format!(
                "running tasks ({executing}) reached the parallel limit ({})",
                config.task_max_parallel
            ),
        ));
    }
    Ok(())
}

/// Conflict key of a task at the configured level.
fn conflict_key(level: ConflictLevel, task: &Task) -> Result<String, Fault> {
    Ok(match level {
        ConflictLevel::Cluster => task.src_cluster_id.clone(),
        ConflictLevel::Database => format!("{}/{}", task.src_cluster_id, task.src_database_name),
        ConflictLevel::Table => {
            let (_, base) = check_same_sharding_tables(&task.src_tables_name)?;
            format!("{}/{}/{}", task.src_cluster_id, task.src_database_name, base)
        }
    })
}

/// Gate 4: executing tasks sharing the candidate's conflict key must stay
/// below the per-key cap.
pub async fn conflict_gate(
    tasks: &Arc<dyn TaskRepository>,
    config: &RuntimeConfig,
    task: &Task,
) -> Result<(), Fault> {
    let level = config.task_conflict_level;
    let key = conflict_key(level, task)?;

    let executing = tasks
        .list_by_status(&[TaskStatus::Executing])
        .await
        .map_err(|e| Fault::new(codes::SERVER_ERR, e.to_string()))?;

    let mut same_key = 0u32;
    for other in &executing {
        if conflict_key(level, other)? == key {
            same_key += 1;
        }
    }

    if same_key >= config.task_conflict_max {
        let code = match level {
            ConflictLevel::Cluster => codes::TASK_SRC_CLUSTER_CONFLICT,
            ConflictLevel::Database => codes::TASK_SRC_DATABASE_CONFLICT,
            ConflictLevel::Table => codes::TASK_SRC_TABLE_CONFLICT,
        };
        return Err(Fault::new(
            code,
            format!("source ({key}) already has {same_key} executing task(s), limit {}", config.task_conflict_max),
        ));
    }
    Ok(())
}

/// Run all four gates in order.
pub async fn admit(
    tasks: &Arc<dyn TaskRepository>,
    config: &RuntimeConfig,
    task: &Task,
    now: NaiveDateTime,
) -> Result<(), Fault> {
    exec_date_gate(task, now.date())?;
    window_gate(task, now)?;
    parallel_gate(tasks, config).await?;
    conflict_gate(tasks, config, task).await?;
    Ok(())
}

/// Dispatch order for admitted candidates: earlier window open first, then
/// earlier creation day, waiting before exec-check-failed, then lower id.
pub fn dispatch_order(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.execute_window
            .ordering_key()
            .cmp(&b.execute_window.ordering_key())
            .then_with(|| a.created_at.date_naive().cmp(&b.created_at.date_naive()))
            .then_with(|| status_rank(a.task_status).cmp(&status_rank(b.task_status)))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Waiting => 0,
        _ => 1,
    }
}
