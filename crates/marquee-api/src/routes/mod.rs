//! HTTP route handlers.

pub mod actors;
pub mod featured;
pub mod genres;
pub mod movies;

use std::sync::Arc;

use axum::Router;

use marquee_core::Error as CoreError;
use marquee_core::validation::{FieldValidation, ValidationErrors};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::metrics::record_validation_rejection;
use crate::server::AppState;

/// `/api` routes.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(actors::routes())
        .merge(movies::routes())
        .merge(genres::routes())
        .merge(featured::routes())
}

/// Maps validation failures to a problem response, logged at warn.
fn rejected(ctx: &RequestContext, endpoint: &'static str, errors: ValidationErrors) -> ApiError {
    tracing::warn!(
        request_id = %ctx.request_id,
        endpoint,
        errors = %errors,
        "Invalid parameters"
    );
    record_validation_rejection(endpoint);
    ApiError::validation(ctx.instance.clone(), errors).with_request_id(ctx.request_id.clone())
}

/// Maps a path id check to a problem response.
fn check_id(
    ctx: &RequestContext,
    endpoint: &'static str,
    target: &'static str,
    result: FieldValidation,
) -> Result<(), ApiError> {
    if result.validated {
        return Ok(());
    }
    let message = result.message.unwrap_or_default();
    Err(rejected(ctx, endpoint, ValidationErrors::single(target, message)))
}

/// Maps a core error to an API error; not-found is logged at warn, the
/// rest at error with the underlying cause.
fn failed(ctx: &RequestContext, endpoint: &'static str, err: CoreError) -> ApiError {
    if err.is_not_found() {
        tracing::warn!(request_id = %ctx.request_id, endpoint, error = %err, "Not found");
    } else {
        tracing::error!(
            request_id = %ctx.request_id,
            endpoint,
            error = %err,
            source = ?std::error::Error::source(&err),
            "Request failed"
        );
    }
    ApiError::from(err).with_request_id(ctx.request_id.clone())
}
