//! Policy-to-task reconciliation against an in-memory store.

mod common;

use chrono::NaiveDate;
use datasteward::domain::models::{Period, TaskStatus};
use datasteward::domain::ports::{
    FixedClock, PolicyRepository as _, RevisionRepository as _, TaskRepository as _,
};
use datasteward::services::{PolicyAdminService, PolicyReconciler};

use common::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Monthly day-15 policy, clock 2024-01-10 10:00, no prior task: the first
// task lands on 2024-01-15 in `scheduled`.
#[tokio::test]
async fn test_create_first_task_on_policy_day() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let tasks = h.ctx.tasks.list_for_policy(policy.id, &TaskStatus::CAN_UPDATE).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].execute_date, date(2024, 1, 15));
    assert_eq!(tasks[0].task_status, TaskStatus::Scheduled);
    assert_eq!(tasks[0].name, "monthly-orders-cleanup");
    assert_eq!(tasks[0].src_database_name, "shop");

    let logs = change_logs(&h, tasks[0].id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].content, "task created");
}

// Same policy, but the clock is already past the 15th's window: the task
// advances a full period to 2024-02-15.
#[tokio::test]
async fn test_missed_window_advances_a_period() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 6, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let tasks = h.ctx.tasks.list_for_policy(policy.id, &TaskStatus::CAN_UPDATE).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].execute_date, date(2024, 2, 15));
}

// Inside the window on the policy day: today is the execute date, and the
// task is close enough to go straight onto the supplementation queue.
#[tokio::test]
async fn test_in_window_schedules_today_and_queues() {
    let h = harness_at(FixedClock::at(2024, 1, 15, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let tasks = h.ctx.tasks.list_for_policy(policy.id, &TaskStatus::CAN_UPDATE).await.unwrap();
    assert_eq!(tasks[0].execute_date, date(2024, 1, 15));
    assert_eq!(h.ctx.task_queue.len(), 1);
    assert_eq!(h.ctx.task_queue.list()[0].id, tasks[0].id);
}

// With a prior dispatched task, the next execute date counts one period
// from the previous planned date, not from today.
#[tokio::test]
async fn test_next_task_follows_previous_execute_date() {
    let h = harness_at(FixedClock::at(2024, 1, 20, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    seed_task(&h, &policy, TaskStatus::Success, |t| {
        t.execute_date = date(2024, 1, 15);
    })
    .await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let pending = h.ctx.tasks.list_for_policy(policy.id, &TaskStatus::CAN_UPDATE).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].execute_date, date(2024, 2, 15));
}

// At most one non-terminal task per policy: reconciling twice must not
// create a second pending task.
#[tokio::test]
async fn test_single_in_flight_per_policy() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    let reconciler = PolicyReconciler::new(h.ctx.clone());
    reconciler.reconcile(policy.id, "a").await.unwrap();
    reconciler.reconcile(policy.id, "b").await.unwrap();

    let open = h.ctx.tasks.count_for_policy_excluding(policy.id, &TaskStatus::TERMINAL).await.unwrap();
    assert_eq!(open, 1);
}

// Historical anomaly: several pending tasks for one policy collapse to the
// lowest id when the policy is reconciled with the recheck flag set.
#[tokio::test]
async fn test_redundant_pending_tasks_collapse_to_lowest_id() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    let keeper = seed_task(&h, &policy, TaskStatus::Scheduled, |t| {
        t.execute_date = date(2024, 1, 15);
        t.need_check_execute_date = true;
    })
    .await;
    let extra = seed_task(&h, &policy, TaskStatus::Scheduled, |t| {
        t.execute_date = date(2024, 1, 16);
    })
    .await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    assert!(h.ctx.tasks.get(extra.id).await.unwrap().is_none());
    let kept = get_task(&h, keeper.id).await;
    assert!(!kept.need_check_execute_date);
}

// A one-off policy goes dormant the moment its task materializes.
#[tokio::test]
async fn test_once_policy_disabled_after_materialization() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 3, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, {
        let mut p = base_policy(src, Period::Once, 0);
        p.name = "one-shot-cleanup".into();
        p
    })
    .await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let stored = h.ctx.policies.get(policy.id).await.unwrap().unwrap();
    assert!(!stored.enable);
    let open = h.ctx.tasks.count_for_policy_excluding(policy.id, &TaskStatus::TERMINAL).await.unwrap();
    assert_eq!(open, 1);
}

// A disabled policy with no pending task reconciles to nothing.
#[tokio::test]
async fn test_disabled_policy_creates_nothing() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, {
        let mut p = base_policy(src, Period::Monthly, 15);
        p.enable = false;
        p
    })
    .await;

    PolicyReconciler::new(h.ctx.clone()).reconcile(policy.id, "t").await.unwrap();

    let open = h.ctx.tasks.count_for_policy_excluding(policy.id, &TaskStatus::TERMINAL).await.unwrap();
    assert_eq!(open, 0);
}

// Editing a policy flags the pending task; the next reconciliation rewrites
// its date, window and propagatable fields, and journals field revisions.
#[tokio::test]
async fn test_policy_edit_propagates_to_pending_task() {
    let h = harness_at(FixedClock::at(2024, 1, 10, 10, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;

    let reconciler = PolicyReconciler::new(h.ctx.clone());
    reconciler.reconcile(policy.id, "t").await.unwrap();
    let before = h.ctx.tasks.list_for_policy(policy.id, &TaskStatus::CAN_UPDATE).await.unwrap()[0].clone();
    assert_eq!(before.execute_date, date(2024, 1, 15));

    let admin = PolicyAdminService::new(h.ctx.clone(), h.revisions.clone());
    let mut edited = policy.clone();
    edited.day = 20;
    edited.condition = "created_at < now() - interval 30 day".into();
    edited.execute_window = window("03:00:00", "06:00:00");
    admin.update_policy(edited, "admin").await.unwrap();

    // The edit flags the task and queues the policy.
    assert!(get_task(&h, before.id).await.need_check_execute_date);
    assert_eq!(h.ctx.policy_queue.len(), 1);

    reconciler.reconcile(policy.id, "t2").await.unwrap();

    let after = get_task(&h, before.id).await;
    assert_eq!(after.execute_date, date(2024, 1, 20));
    assert_eq!(after.execute_window, window("03:00:00", "06:00:00"));
    assert_eq!(after.condition, "created_at < now() - interval 30 day");
    assert!(!after.need_check_execute_date);
    assert_eq!(after.task_status, TaskStatus::Scheduled);

    let revisions = h
        .revisions
        .list_for_entity(datasteward::domain::models::RevisionKind::Policy, policy.id)
        .await
        .unwrap();
    let fields: Vec<&str> = revisions.iter().map(|r| r.field.as_str()).collect();
    assert!(fields.contains(&"day"));
    assert!(fields.contains(&"condition"));
    assert!(fields.contains(&"execute_window"));
}
