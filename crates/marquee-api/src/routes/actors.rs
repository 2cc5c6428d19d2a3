//! Actor search and lookup.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};

use marquee_core::model::Actor;
use marquee_core::validation::{QueryParams, validate_actor_id, validate_actor_query};

use super::{check_id, failed, rejected};
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::server::AppState;

const LIST: &str = "/api/actors";
const GET: &str = "/api/actors/:id";

/// Actor routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actors", get(list_actors))
        .route("/actors/:id", get(get_actor))
}

/// `GET /api/actors?q=&pageNumber=&pageSize=`
async fn list_actors(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<Actor>>> {
    let params = QueryParams::from_pairs(pairs);
    let query = validate_actor_query(&params).map_err(|errors| rejected(&ctx, LIST, errors))?;

    let actors = state
        .data
        .query_actors(&query)
        .await
        .map_err(|e| failed(&ctx, LIST, e))?;
    Ok(Json(actors))
}

/// `GET /api/actors/{id}`
async fn get_actor(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> ApiResult<Json<Actor>> {
    check_id(&ctx, GET, "actorId", validate_actor_id(&id))?;

    let actor = state
        .data
        .get_actor(&id)
        .await
        .map_err(|e| failed(&ctx, GET, e))?;
    Ok(Json(actor))
}
