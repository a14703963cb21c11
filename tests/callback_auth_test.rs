//! The task-result callback endpoint: per-task token scoping.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use tower::ServiceExt;

use datasteward::api::{router, ApiState};
use datasteward::domain::models::{Period, TaskStatus};
use datasteward::domain::ports::{FixedClock, ResultTokenIssuer};

use common::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn result_body(task_id: i64) -> String {
    json!({
        "id": task_id,
        "task_status": "success",
        "task_result_quantity": 10,
        "task_result_size": 5,
        "task_start_time": "2024-01-15 02:00:00",
        "task_end_time": "2024-01-15 02:30:00",
    })
    .to_string()
}

fn put_result(token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/api/v1/task/result")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

async fn setup() -> (Harness, axum::Router, i64) {
    let h = harness_at(FixedClock::at(2024, 1, 15, 6, 0, 0)).await;
    let src = seed_source(&h).await;
    let policy = seed_policy(&h, base_policy(src, Period::Monthly, 15)).await;
    let task = seed_task(&h, &policy, TaskStatus::Executing, |t| {
        t.execute_date = date(2024, 1, 15);
        t.workflow = "mock/cb".into();
    })
    .await;
    let app = router(ApiState { ctx: h.ctx.clone(), jwt: h.jwt.clone() });
    (h, app, task.id)
}

// S7, allowed half: a token minted for the task updates it.
#[tokio::test]
async fn test_matching_token_updates_task() {
    let (h, app, task_id) = setup().await;
    let token = h.jwt.issue_result_token(task_id).unwrap();

    let response = app.oneshot(put_result(&token, result_body(task_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = get_task(&h, task_id).await;
    assert_eq!(stored.task_status, TaskStatus::Success);
    assert_eq!(stored.task_result_size, 5);
}

// S7, denied half: the same token aimed at a different task id is refused
// without touching state.
#[tokio::test]
async fn test_token_for_other_task_denied() {
    let (h, app, task_id) = setup().await;
    let token = h.jwt.issue_result_token(task_id).unwrap();

    let response = app.oneshot(put_result(&token, result_body(task_id + 1))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = get_task(&h, task_id).await;
    assert_eq!(stored.task_status, TaskStatus::Executing);
}

// A token with the right id but the wrong principal is refused.
#[tokio::test]
async fn test_non_updater_principal_denied() {
    let (h, app, task_id) = setup().await;
    let token = h
        .jwt
        .issue(task_id, "admin", "Administrator", chrono::Duration::hours(1))
        .unwrap();

    let response = app.oneshot(put_result(&token, result_body(task_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_authorization_rejected() {
    let (_h, app, task_id) = setup().await;
    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1/task/result")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(result_body(task_id)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let (_h, app, task_id) = setup().await;
    let response = app.oneshot(put_result("not-a-jwt", result_body(task_id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_healthz() {
    let (_h, app, _) = setup().await;
    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
