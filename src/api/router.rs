//! Callback router.
//!
//! `PUT /api/v1/task/result` carries a workflow's reported result. It is
//! authenticated by the per-task JWT minted at dispatch: the embedded
//! principal must be the result updater and the embedded id must equal the
//! task being updated.

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::errors::{codes, Fault};
use crate::domain::models::Task;
use crate::infrastructure::auth::JwtService;
use crate::services::{ResultReconciler, SchedulerContext, TaskResultUpdate, RESULT_UPDATER_USER};

#[derive(Clone)]
pub struct ApiState {
    pub ctx: Arc<SchedulerContext>,
    pub jwt: Arc<JwtService>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/task/result", put(update_task_result))
        .with_state(state)
}

/// Uniform response envelope: `{code, message, error?, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                code: codes::OK.code,
                message: codes::OK.message.to_string(),
                error: None,
                data: Some(data),
            }),
        )
    }

    fn fault(fault: &Fault) -> (StatusCode, Json<Self>) {
        let status =
            StatusCode::from_u16(fault.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(Self {
                code: fault.code.code,
                message: fault.code.message.to_string(),
                error: Some(fault.detail.clone()),
                data: None,
            }),
        )
    }
}

async fn healthz() -> (StatusCode, Json<ApiResponse<&'static str>>) {
    ApiResponse::ok("ok")
}

async fn update_task_result(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<TaskResultUpdate>,
) -> (StatusCode, Json<ApiResponse<Task>>) {
    let claims = match authenticate(&state, &headers) {
        Ok(claims) => claims,
        Err(fault) => return ApiResponse::fault(&fault),
    };

    // The token may only touch the task it was minted for.
    if claims.user_name != RESULT_UPDATER_USER || claims.user_id != body.id {
        let fault = Fault::new(
            codes::TASK_STATUS_UPDATE_DENIED,
            format!("token holder ({}/{}) may not update task ({})", claims.user_name, claims.user_id, body.id),
        );
        return ApiResponse::fault(&fault);
    }

    match ResultReconciler::new(state.ctx.clone()).apply_result(&body, &claims.real_name).await {
        Ok(task) => ApiResponse::ok(task),
        Err(fault) => ApiResponse::fault(&fault),
    }
}

fn authenticate(state: &ApiState, headers: &HeaderMap) -> Result<crate::infrastructure::auth::Claims, Fault> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Fault::new(codes::MISS_AUTH, "missing Authorization header"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Fault::new(codes::TOKEN_INVALID, "expected Bearer token"))?;

    state.jwt.verify(token)
}
