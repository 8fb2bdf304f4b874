use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::state::AppState;

// GET /api/health — no auth required
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bearer-token check for event intake. No configured token means the
/// endpoint is open.
fn authorize(expected: Option<&str>, headers: &HeaderMap) -> Result<(), StatusCode> {
    if let Some(expected) = expected {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if bearer != expected {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(())
}

// POST /api/events/{trigger_id} — fires a trigger with the request
// body as event payload
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Path(trigger_id): Path<String>,
    headers: HeaderMap,
    Json(event): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    authorize(state.config.token.as_deref(), &headers)?;

    info!(trigger_id = %trigger_id, "event received");
    match state.dispatcher.dispatch(&trigger_id, event).await {
        Ok(outcomes) => {
            let outcomes: Vec<serde_json::Value> = outcomes
                .iter()
                .map(|o| {
                    json!({
                        "workflow_id": o.workflow_id,
                        "execution_id": o.execution_id,
                        "status": o.status.map(|s| s.as_str()),
                        "error": o.error,
                    })
                })
                .collect();
            Ok(Json(json!({
                "trigger_id": trigger_id,
                "outcomes": outcomes,
            })))
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

// GET /api/workflows — stored definitions, summarized
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.definitions.list_workflows().await {
        Ok(workflows) => {
            let summaries: Vec<serde_json::Value> = workflows
                .iter()
                .map(|wf| {
                    json!({
                        "id": wf.id,
                        "title": wf.title,
                        "status": wf.status,
                        "trigger_type": wf.trigger().and_then(|n| n.type_ref()),
                        "nodes": wf.nodes.len(),
                    })
                })
                .collect();
            Ok(Json(json!({ "workflows": summaries })))
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Deserialize)]
pub struct ExecutionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

// GET /api/executions?limit=20 — most recent first
pub async fn list_executions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ExecutionsQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.logs.recent_executions(q.limit).await {
        Ok(executions) => Ok(Json(json!({ "executions": executions }))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

// GET /api/executions/{id} — one execution plus its node logs
pub async fn execution_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let execution = state
        .logs
        .execution(&id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let node_logs = state
        .logs
        .node_logs(&id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({
        "execution": execution,
        "node_logs": node_logs,
    })))
}
