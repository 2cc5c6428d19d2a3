//! API server implementation.
//!
//! Wires the catalog services into an axum router and serves it, together
//! with the health, version and metrics endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use marquee_core::{
    DataAccess, DocumentStore, FeaturedSelector, HealthAggregator, HealthStatus,
    MemoryDocumentStore, Result, ServiceInfo,
};

use crate::config::{Config, CorsConfig};
use crate::context::{RequestContext, context_middleware};
use crate::error::ApiError;

const HEALTH_CONTENT_TYPE: &str = "application/health+json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Catalog data access.
    pub data: Arc<DataAccess>,
    /// Featured movie picker.
    pub featured: FeaturedSelector,
    /// Health battery.
    pub health: HealthAggregator,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates application state over the given document store.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        let data =
            Arc::new(DataAccess::new(store).with_store_timeout(config.store_timeout()));
        let featured = FeaturedSelector::new(Arc::clone(&data));
        let health = HealthAggregator::new(
            Arc::clone(&data),
            ServiceInfo::new(config.instance_id.clone()),
        );
        Self {
            config,
            data,
            featured,
            health,
        }
    }
}

// ============================================================================
// Health, Version
// ============================================================================

async fn healthz(State(state): State<Arc<AppState>>) -> Response {
    let report = state.health.check().await;
    log_health(report.status);
    (
        health_status_code(report.status),
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        report.status.as_str(),
    )
        .into_response()
}

async fn healthz_ietf(State(state): State<Arc<AppState>>) -> Response {
    let report = state.health.check().await;
    log_health(report.status);
    let status = health_status_code(report.status);
    match serde_json::to_vec(&report) {
        Ok(body) => (status, [(header::CONTENT_TYPE, HEALTH_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode health report");
            ApiError::internal("Internal Server Error").into_response()
        }
    }
}

fn health_status_code(status: HealthStatus) -> StatusCode {
    if status.is_available() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn log_health(status: HealthStatus) {
    if status == HealthStatus::Fail {
        tracing::error!(status = %status, "Health check failed");
    }
}

async fn version() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
        env!("CARGO_PKG_VERSION"),
    )
}

async fn not_found(ctx: RequestContext, uri: OriginalUri) -> ApiError {
    ApiError::not_found(format!("not found: {}", uri.0.path())).with_request_id(ctx.request_id)
}

async fn handle_timeout_error(_err: tower::BoxError) -> ApiError {
    ApiError::service_unavailable("Request timed out")
}

// ============================================================================
// Server
// ============================================================================

/// The Marquee API server.
pub struct Server {
    config: Config,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<DocumentStore>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with an explicit document store.
    #[must_use]
    pub fn with_store(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self { config, store }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(self.config.clone(), Arc::clone(&self.store)))
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self, state: Arc<AppState>) -> Router {
        let cors = Self::build_cors_layer(&self.config.cors);
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/healthz/ietf", get(healthz_ietf))
            .route("/version", get(version))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .nest("/api", crate::routes::api_routes())
            .fallback(not_found)
            // Outermost layer is added last.
            .layer(cors)
            .layer(middleware::from_fn(context_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer);

        // Router::layer wraps every route separately; the global layer keeps
        // one semaphore for all of them.
        let router = match self.config.concurrency_limit {
            Some(limit) => router.layer(GlobalConcurrencyLimitLayer::new(limit)),
            None => router,
        };

        let router = match self.config.request_timeout() {
            Some(timeout) => router.layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_timeout_error))
                    .layer(TimeoutLayer::new(timeout)),
            ),
            None => router,
        };

        router.with_state(state)
    }

    fn build_cors_layer(cors_config: &CorsConfig) -> CorsLayer {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds));

        if cors_config.allowed_origins.is_empty() {
            return cors;
        }
        if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
            if cors_config.allowed_origins.len() > 1 {
                tracing::error!(
                    origins = ?cors_config.allowed_origins,
                    "Invalid CORS config: '*' must be the only allowed origin"
                );
                return cors;
            }
            return cors.allow_origin(Any);
        }

        let allowed: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::error!(origin = %origin, "Invalid CORS origin");
                    None
                }
            })
            .collect();

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Connects to the store and serves until ctrl-c.
    ///
    /// A failed store connection does not stop the server; it is reported
    /// by the health endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        crate::metrics::init_metrics();

        let state = self.app_state();
        state.data.initialize().await;
        let router = self.create_router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        tracing::info!(
            http_port = self.config.http_port,
            version = env!("CARGO_PKG_VERSION"),
            "Starting Marquee API server"
        );

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| marquee_core::Error::Internal {
                    message: format!("failed to bind to {addr}: {e}"),
                })?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| marquee_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        tracing::info!("Marquee API server stopped");
        Ok(())
    }

    /// Creates a router for tests without binding a port.
    ///
    /// The store connection is not attempted; call
    /// [`DataAccess::initialize`] through [`Self::test_state`] when needed.
    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router(self.app_state())
    }

    /// Creates application state and a router sharing it, for tests.
    #[doc(hidden)]
    pub fn test_state(&self) -> (Arc<AppState>, Router) {
        let state = self.app_state();
        (Arc::clone(&state), self.create_router(state))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("store", &"<DocumentStore>")
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            store: Arc::new(MemoryDocumentStore::with_sample_catalog()),
        }
    }
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the instance id reported by the health check.
    #[must_use]
    pub fn instance_id(mut self, instance: impl Into<String>) -> Self {
        self.config.instance_id = instance.into();
        self
    }

    /// Bounds every store call.
    #[must_use]
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout_ms = u64::try_from(timeout.as_millis()).ok();
        self
    }

    /// Bounds every request.
    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    /// Limits concurrently handled requests.
    #[must_use]
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = Some(limit);
        self
    }

    /// Sets the allowed CORS origins.
    #[must_use]
    pub fn cors_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors.allowed_origins = origins;
        self
    }

    /// Sets the document store used by request handlers.
    ///
    /// By default, the server serves the built-in sample catalog.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            store: self.store,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
