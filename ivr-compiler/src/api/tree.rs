//! GET /tree/:id

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::parse_build_id;
use crate::error::{ApiError, ApiResult};
use crate::models::IvrNode;
use crate::AppState;

/// Finalized tree of a build
///
/// Served from the registry while the process holds it, otherwise from the
/// persisted record. Builds still compiling are not found.
pub async fn get_tree(State(state): State<AppState>, Path(build_id): Path<String>) -> ApiResult<Json<IvrNode>> {
    let build_id = parse_build_id(&build_id)?;

    if let Ok(tree) = state.registry.get_tree(build_id).await {
        return Ok(Json(IvrNode::clone(&tree)));
    }

    state
        .store
        .load(build_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No finalized tree for build {}", build_id)))
}

pub fn tree_routes() -> Router<AppState> {
    Router::new().route("/tree/:id", get(get_tree))
}
