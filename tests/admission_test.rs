//! Admission gates and dispatch against an in-memory store.

mod common;

use chrono::NaiveDate;
use datasteward::adapters::workflow::SubmittedParams;
use datasteward::domain::errors::codes;
use datasteward::domain::models::{ConflictLevel, Govern, Period, TaskStatus};
use datasteward::domain::ports::{ConfigRepository as _, FixedClock};
use datasteward::services::Dispatcher;

use common::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Inside the window with capacity available, a waiting task dispatches:
// workflow submitted, status executing, start time and handle recorded.
#[tokio::test]
async fn test_waiting_task_dispatches() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;
    let task = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    h.cluster.set_free_disk(500_000);
    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let stored = get_task(&h, task.id).await;
    assert_eq!(stored.task_status, TaskStatus::Executing);
    assert!(stored.workflow.starts_with("mock/task-"));
    assert!(stored.task_start_time.is_some());
    assert_eq!(stored.src_cluster_free_disk, 500_000);
    assert_eq!(stored.src_cluster_sum_table_size, 100);

    let submitted = h.workflow.submitted();
    assert_eq!(submitted.len(), 1);
    match &submitted[0].1 {
        SubmittedParams::Delete(p) => {
            assert_eq!(p.task_id, task.id);
            assert_eq!(p.database, "shop");
            // The predicate travels base64-encoded and the callback token is
            // scoped to this task.
            assert_ne!(p.condition, stored.condition);
            assert!(p.callback.url.ends_with("/api/v1/task/result"));
            let claims = h.jwt.verify(&p.callback.token).unwrap();
            assert_eq!(claims.user_id, task.id);
            assert_eq!(claims.user_name, "updater");
        }
        other => panic!("expected delete params, got {other:?}"),
    }

    let logs = change_logs(&h, task.id).await;
    assert!(logs.iter().any(|l| l.content == "workflow submitted"));
}

// Before the execute date nothing dispatches; the reason lands on the task.
#[tokio::test]
async fn test_exec_date_gate_denies() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;
    let task = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let stored = get_task(&h, task.id).await;
    assert_eq!(stored.task_status, TaskStatus::Waiting);
    assert_eq!(stored.task_reason, codes::TASK_EXEC_DATE_NOT_REACHED.message);
    assert!(h.workflow.submitted().is_empty());
}

// S3: a cross-midnight window admits on the morning after the execute date.
#[tokio::test]
async fn test_cross_midnight_window_admits() {
    let h = harness_at(FixedClock::at(2024, 3, 2, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, {
        let mut p = base_policy(src, Period::Monthly, 1);
        p.execute_window = window("22:00:00", "05:00:00");
        p
    })
    .await;
    let task = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 3, 1);
    })
    .await;

    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    assert_eq!(get_task(&h, task.id).await.task_status, TaskStatus::Executing);
}

// S4: with max_parallel=2 and two executing tasks, a third candidate is
// denied with the parallel-limit reason, keeps its status, and no workflow
// call is made.
#[tokio::test]
async fn test_parallel_limit_denies() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    let mut config = h.ctx.config.load_or_seed().await.unwrap();
    config.task_max_parallel = 2;
    h.ctx.config.save(&config).await.unwrap();

    for n in 0..2 {
        seed_task(&h, &policy, TaskStatus::Executing, |t| {
            t.execute_date = date(2024, 1, 15);
            t.workflow = format!("mock/running-{n}");
        })
        .await;
    }
    let candidate = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let stored = get_task(&h, candidate.id).await;
    assert_eq!(stored.task_status, TaskStatus::Waiting);
    assert_eq!(stored.task_reason, codes::TASK_PARALLEL_UPPER_LIMIT.message);
    assert!(h.workflow.submitted().is_empty());

    let logs = change_logs(&h, candidate.id).await;
    assert_eq!(logs.len(), 1);
    assert!(logs[0].content.contains(codes::TASK_PARALLEL_UPPER_LIMIT.message));
}

// S5: cluster-level conflict with max 1. Same-cluster candidate is denied;
// a different-cluster candidate is admitted.
#[tokio::test]
async fn test_cluster_conflict_denies_same_cluster_only() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    let mut config = h.ctx.config.load_or_seed().await.unwrap();
    config.task_conflict_level = ConflictLevel::Cluster;
    config.task_conflict_max = 1;
    config.task_max_parallel = 10;
    h.ctx.config.save(&config).await.unwrap();

    seed_task(&h, &policy, TaskStatus::Executing, |t| {
        t.execute_date = date(2024, 1, 15);
        t.workflow = "mock/running".into();
    })
    .await;
    let same_cluster = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;
    let other_cluster = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
        t.src_cluster_id = "cluster-2".into();
    })
    .await;

    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let denied = get_task(&h, same_cluster.id).await;
    assert_eq!(denied.task_status, TaskStatus::Waiting);
    assert_eq!(denied.task_reason, codes::TASK_SRC_CLUSTER_CONFLICT.message);

    let admitted = get_task(&h, other_cluster.id).await;
    assert_eq!(admitted.task_status, TaskStatus::Executing);
}

// A failing pre-exec capture parks the candidate in exec_check_failed; the
// next pass retries it.
#[tokio::test]
async fn test_pre_exec_capture_failure_parks_candidate() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;
    let task = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    h.cluster.set_unreachable(Some(datasteward::domain::errors::Fault::new(
        codes::CLUSTER_UNREACHABLE,
        "connection refused",
    )));
    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let stored = get_task(&h, task.id).await;
    assert_eq!(stored.task_status, TaskStatus::ExecCheckFailed);
    assert!(h.workflow.submitted().is_empty());

    // The cluster recovers; the next pass dispatches.
    h.cluster.set_unreachable(None);
    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();
    assert_eq!(get_task(&h, task.id).await.task_status, TaskStatus::Executing);
}

// A workflow submit failure marks the task failed with the call-failed
// reason.
#[tokio::test]
async fn test_workflow_submit_failure_fails_task() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;
    let task = seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    h.workflow.fail_next_submits(Some(datasteward::domain::errors::Fault::new(
        codes::WORKFLOW_CALL_FAILED,
        "driver down",
    )));
    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let stored = get_task(&h, task.id).await;
    assert_eq!(stored.task_status, TaskStatus::Failed);
    assert_eq!(stored.task_reason, codes::WORKFLOW_CALL_FAILED.message);
}

// Truncate governance routes to the truncate workflow.
#[tokio::test]
async fn test_truncate_routes_to_truncate_workflow() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, {
        let mut p = base_policy(src, Period::Monthly, 15);
        p.govern = Govern::Truncate;
        p.condition = String::new();
        p
    })
    .await;
    seed_task(&h, &policy, TaskStatus::Waiting, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    Dispatcher::new(h.ctx.clone()).run_pass().await.unwrap();

    let submitted = h.workflow.submitted();
    assert_eq!(submitted.len(), 1);
    assert!(matches!(submitted[0].1, SubmittedParams::Truncate(_)));
}
