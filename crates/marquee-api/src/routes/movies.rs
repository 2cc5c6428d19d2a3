//! Movie search and lookup.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use marquee_core::model::Movie;
use marquee_core::validation::{QueryParams, validate_movie_id, validate_movie_query};

use super::{check_id, failed, rejected};
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::server::AppState;

const LIST: &str = "/api/movies";
const GET: &str = "/api/movies/:id";

/// Movie routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/:id", get(get_movie))
}

/// `GET /api/movies?q=&genre=&year=&rating=&actorId=&pageNumber=&pageSize=`
async fn list_movies(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<Movie>>> {
    let params = QueryParams::from_pairs(pairs);
    let query = validate_movie_query(&params).map_err(|errors| rejected(&ctx, LIST, errors))?;

    let movies = state
        .data
        .query_movies(&query)
        .await
        .map_err(|e| failed(&ctx, LIST, e))?;
    Ok(Json(movies))
}

/// `GET /api/movies/{id}`
async fn get_movie(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Movie>> {
    check_id(&ctx, GET, "movieId", validate_movie_id(&id))?;

    let movie = state
        .data
        .get_movie(&id)
        .await
        .map_err(|e| failed(&ctx, GET, e))?;
    Ok(Json(movie))
}
