// rest/routes/tasks.rs — Task REST routes.
//
// Every handler here runs behind the auth middleware and trusts the
// attached Principal; scoping to the principal happens in the store,
// not here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::Principal;
use crate::error::ApiError;
use crate::tasks::{TaskListParams, TaskPayload};
use crate::AppContext;

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<TaskPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let task = ctx.task_store.create_task(&principal.id, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Task created successfully",
            "task": task,
        })),
    ))
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<TaskListParams>,
) -> Result<Json<Value>, ApiError> {
    let tasks = ctx.task_store.list_tasks(&principal.id, &params).await?;
    Ok(Json(json!({
        "success": true,
        "count": tasks.len(),
        "tasks": tasks,
    })))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = ctx.task_store.get_task(&principal.id, &id).await?;
    Ok(Json(json!({ "success": true, "task": task })))
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(payload): Json<TaskPayload>,
) -> Result<Json<Value>, ApiError> {
    let task = ctx.task_store.update_task(&principal.id, &id, &payload).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task updated successfully",
        "task": task,
    })))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ctx.task_store.delete_task(&principal.id, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Task deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

pub async fn update_status(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let task = ctx.task_store.set_status(&principal.id, &id, &body.status).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Task marked as {}", task.status),
        "task": task,
    })))
}

pub async fn stats_overview(
    State(ctx): State<Arc<AppContext>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, ApiError> {
    // Two independent point-in-time reads; no cross-query transaction.
    let stats = ctx.task_store.overview_stats(&principal.id).await?;
    let status_stats = ctx.task_store.status_breakdown(&principal.id).await?;
    Ok(Json(json!({
        "success": true,
        "stats": stats,
        "statusStats": status_stats,
    })))
}
