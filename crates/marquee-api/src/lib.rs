//! # marquee-api
//!
//! HTTP surface for the Marquee movie and actor catalog.
//!
//! This crate is a thin composition layer; catalog logic lives in
//! `marquee-core`.
//!
//! ## Endpoints
//!
//! ```text
//!   GET /api/actors            - Actor search (q, pageNumber, pageSize)
//!   GET /api/actors/{id}       - Actor by id
//!   GET /api/movies            - Movie search (q, genre, year, rating, actorId, paging)
//!   GET /api/movies/{id}       - Movie by id
//!   GET /api/genres            - Genre names
//!   GET /api/featured/movie    - Random featured movie
//!   GET /healthz               - pass / warn / fail as text
//!   GET /healthz/ietf          - Health report (application/health+json)
//!   GET /version               - Service version
//!   GET /metrics               - Prometheus metrics
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use marquee_api::server::Server;
//!
//! let server = Server::builder().http_port(4120).build();
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
