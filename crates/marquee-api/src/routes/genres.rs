//! Genre listing.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::failed;
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::server::AppState;

/// Genre routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/genres", get(list_genres))
}

/// `GET /api/genres`
async fn list_genres(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> ApiResult<Json<Vec<String>>> {
    let genres = state
        .data
        .get_genres()
        .await
        .map_err(|e| failed(&ctx, "/api/genres", e))?;
    Ok(Json(genres))
}
