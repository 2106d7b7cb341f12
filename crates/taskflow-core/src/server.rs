//! HTTP face of a backing store.
//!
//! Routes (all under `/api`):
//! - `POST /login` -> `200 {token, user}` | `401 {error}`
//! - `GET /tasks` -> `200 [Task]`
//! - `POST /tasks` -> `201 Task`
//! - `PUT /tasks/:id` -> `200 Task` | `404 {error}`
//! - `DELETE /tasks/:id` -> `200 {success: true}` | `404 {error}`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use taskflow_shared::{DeleteResponse, ErrorBody, LoginRequest, TaskInput, TaskPatch};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::backend::TaskBackend;
use crate::backend::local::{INVALID_CREDENTIALS, TASK_NOT_FOUND};
use crate::error::BackendError;

pub type SharedBackend = Arc<dyn TaskBackend>;

pub fn build_router(backend: SharedBackend) -> Router {
    let api = Router::new()
        .route("/login", post(api_login))
        .route("/tasks", get(api_list_tasks).post(api_create_task))
        .route("/tasks/:id", put(api_update_task).delete(api_delete_task))
        .with_state(backend);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
}

/// Serves until ctrl-c.
#[tracing::instrument(skip(backend))]
pub async fn serve(bind: SocketAddr, backend: SharedBackend) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "task service listening");

    axum::serve(listener, build_router(backend))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for ctrl-c");
            }
        })
        .await
        .context("task service stopped unexpectedly")?;

    info!("task service stopped");
    Ok(())
}

async fn api_login(
    State(backend): State<SharedBackend>,
    Json(credentials): Json<LoginRequest>,
) -> Response {
    match backend.login(&credentials).await {
        Ok(auth) => Json(auth).into_response(),
        Err(err) => error_response(err),
    }
}

async fn api_list_tasks(State(backend): State<SharedBackend>) -> Response {
    match backend.list_tasks().await {
        Ok(tasks) => Json(tasks).into_response(),
        Err(err) => error_response(err),
    }
}

async fn api_create_task(
    State(backend): State<SharedBackend>,
    Json(input): Json<TaskInput>,
) -> Response {
    match backend.create_task(&input).await {
        Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn api_update_task(
    State(backend): State<SharedBackend>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Response {
    match backend.update_task(&id, &patch).await {
        Ok(task) => Json(task).into_response(),
        Err(err) => error_response(err),
    }
}

async fn api_delete_task(
    State(backend): State<SharedBackend>,
    Path(id): Path<String>,
) -> Response {
    match backend.delete_task(&id).await {
        Ok(()) => Json(DeleteResponse { success: true }).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: BackendError) -> Response {
    let (status, message) = match err {
        BackendError::InvalidCredentials { message } => (
            StatusCode::UNAUTHORIZED,
            message.unwrap_or_else(|| INVALID_CREDENTIALS.to_string()),
        ),
        BackendError::NotFound { message } => (
            StatusCode::NOT_FOUND,
            message.unwrap_or_else(|| TASK_NOT_FOUND.to_string()),
        ),
        BackendError::Unexpected { status, message } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message.unwrap_or_else(|| "Upstream error".to_string()),
        ),
        BackendError::Transport(detail) => {
            error!(detail = %detail, "upstream task service unreachable");
            (StatusCode::BAD_GATEWAY, "Upstream unavailable".to_string())
        }
        BackendError::Storage(err) => {
            error!(error = %format!("{err:#}"), "task storage failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };
    (status, Json(ErrorBody::new(message))).into_response()
}
