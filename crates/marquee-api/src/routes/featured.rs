//! Featured movie.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use marquee_core::model::Movie;

use super::failed;
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::server::AppState;

/// Featured routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/featured/movie", get(featured_movie))
}

/// `GET /api/featured/movie`
async fn featured_movie(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> ApiResult<Json<Movie>> {
    let movie = state
        .featured
        .get_featured_movie()
        .await
        .map_err(|e| failed(&ctx, "/api/featured/movie", e))?;
    Ok(Json(movie))
}
