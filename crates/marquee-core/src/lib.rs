//! # marquee-core
//!
//! Catalog logic for the Marquee movie and actor API.
//!
//! - **Validation**: query-string parameters and entity ids, with every
//!   failure reported at once
//! - **Query building**: paged, filtered, ordered store queries
//! - **Data access**: the [`store::DocumentStore`] seam, a Cosmos DB REST
//!   backend and an in-memory backend
//! - **Featured selection** and the **health battery**
//!
//! ## Example
//!
//! ```rust
//! use marquee_core::prelude::*;
//!
//! let query = validate_movie_query(&QueryParams::from_pairs([("q", "ring")])).unwrap();
//! let spec = build_movie_query(&query, None);
//! assert!(spec.to_sql().contains("contains(m.textSearch, 'ring')"));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cosmos;
pub mod data_access;
pub mod error;
pub mod featured;
pub mod health;
pub mod metrics;
pub mod model;
pub mod observability;
pub mod partition;
pub mod query;
pub mod sample;
pub mod secrets;
pub mod store;
pub mod validation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::data_access::DataAccess;
    pub use crate::error::{Error, Result};
    pub use crate::featured::FeaturedSelector;
    pub use crate::health::{HealthAggregator, HealthReport, HealthStatus, ServiceInfo};
    pub use crate::model::{Actor, Genre, Movie};
    pub use crate::query::{QuerySpec, build_actor_query, build_movie_query};
    pub use crate::store::{DocumentStore, MemoryDocumentStore};
    pub use crate::validation::{
        ActorQuery, MovieQuery, QueryParams, ValidationErrors, validate_actor_id,
        validate_actor_query, validate_movie_id, validate_movie_query,
    };
}

pub use cosmos::{CosmosBackend, CosmosConfig};
pub use data_access::DataAccess;
pub use error::{Error, Result};
pub use featured::FeaturedSelector;
pub use health::{HealthAggregator, HealthReport, HealthStatus, ServiceInfo};
pub use observability::{LogFormat, init_logging};
pub use partition::partition_key;
pub use store::{DocumentStore, MemoryDocumentStore};
