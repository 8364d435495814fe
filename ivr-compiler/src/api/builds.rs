//! Build status, history and cancellation
//!
//! GET /builds, GET /builds/:id, POST /builds/:id/cancel

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::parse_build_id;
use crate::db::builds as build_history;
use crate::error::{ApiError, ApiResult};
use crate::models::BuildStatus;
use crate::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /builds: persisted build history, newest first
pub async fn list_builds(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<BuildStatus>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    let builds = build_history::list_builds(&state.db, limit).await?;
    Ok(Json(builds))
}

/// GET /builds/:id: live status, falling back to history
pub async fn get_build(State(state): State<AppState>, Path(build_id): Path<String>) -> ApiResult<Json<BuildStatus>> {
    let build_id = parse_build_id(&build_id)?;

    if let Ok(status) = state.registry.status(build_id).await {
        return Ok(Json(status));
    }

    build_history::load_build(&state.db, build_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Build not found: {}", build_id)))
}

/// POST /builds/:id/cancel
///
/// Stops dispatch of queued nodes; attempts already in flight finish. 409
/// when the build is already done.
pub async fn cancel_build(State(state): State<AppState>, Path(build_id): Path<String>) -> ApiResult<Json<BuildStatus>> {
    let build_id = parse_build_id(&build_id)?;

    state.registry.cancel(build_id).await?;
    tracing::info!(build_id = %build_id, "Cancellation requested via API");

    Ok(Json(state.registry.status(build_id).await?))
}

pub fn build_routes() -> Router<AppState> {
    Router::new()
        .route("/builds", get(list_builds))
        .route("/builds/:id", get(get_build))
        .route("/builds/:id/cancel", post(cancel_build))
}
