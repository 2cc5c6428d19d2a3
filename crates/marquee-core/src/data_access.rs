//! Catalog data access over a [`DocumentStore`].
//!
//! [`DataAccess`] turns validated searches into store queries, decodes the
//! returned documents into the domain model and maps missing documents to
//! typed not-found errors. Every store call can be bounded by an optional
//! timeout; calls are never retried.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::metrics::{record_store_call, record_store_error};
use crate::model::{Actor, Movie};
use crate::partition::partition_key;
use crate::query::{QuerySpec, build_actor_query, build_movie_query, genres_query};
use crate::store::DocumentStore;
use crate::validation::{ActorQuery, MovieQuery};

/// Gateway to the catalog store.
pub struct DataAccess {
    store: Arc<dyn DocumentStore>,
    store_timeout: Option<Duration>,
    connect_error: RwLock<Option<String>>,
}

impl std::fmt::Debug for DataAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccess")
            .field("store_timeout", &self.store_timeout)
            .field("connect_error", &self.connect_error())
            .finish_non_exhaustive()
    }
}

impl DataAccess {
    /// Creates a gateway over `store` with no call timeout.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            store_timeout: None,
            connect_error: RwLock::new(None),
        }
    }

    /// Bounds every store call by `timeout`.
    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Connects to the store.
    ///
    /// A failure does not prevent the gateway from serving; it is logged and
    /// remembered so health checks can report it.
    pub async fn initialize(&self) {
        let outcome = self.bounded("connect", self.store.connect()).await;
        let remembered = match outcome {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to document store");
                Some(e.to_string())
            }
        };
        if let Ok(mut slot) = self.connect_error.write() {
            *slot = remembered;
        }
    }

    /// The error remembered by the last [`Self::initialize`], if it failed.
    #[must_use]
    pub fn connect_error(&self) -> Option<String> {
        self.connect_error
            .read()
            .ok()
            .and_then(|slot| slot.clone())
    }

    /// Runs a query and returns every matching document.
    ///
    /// # Errors
    ///
    /// Returns a store or timeout error if the store call fails.
    pub async fn query_documents(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        self.bounded("query", self.store.query(spec)).await
    }

    /// Reads a document by id; the partition key is derived from the id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no document exists, or a store or
    /// timeout error if the call fails.
    pub async fn get_document(&self, id: &str) -> Result<Value> {
        let partition = partition_key(id);
        self.bounded("read", self.store.read(id, &partition)).await
    }

    /// Searches actors.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails or a document does not decode.
    pub async fn query_actors(&self, query: &ActorQuery) -> Result<Vec<Actor>> {
        let docs = self.query_documents(&build_actor_query(query)).await?;
        decode_all(docs)
    }

    /// Searches movies.
    ///
    /// A genre filter is resolved to its canonical name first; an unknown
    /// genre yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails or a document does not decode.
    pub async fn query_movies(&self, query: &MovieQuery) -> Result<Vec<Movie>> {
        let genre = match query.genre.as_deref() {
            Some(requested) => match self.resolve_genre(requested).await? {
                Some(canonical) => Some(canonical),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let spec = build_movie_query(query, genre.as_deref());
        let docs = self.query_documents(&spec).await?;
        decode_all(docs)
    }

    /// Reads one actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the `Actor` resource when missing.
    pub async fn get_actor(&self, actor_id: &str) -> Result<Actor> {
        self.get_entity("Actor", actor_id).await
    }

    /// Reads one movie.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the `Movie` resource when missing.
    pub async fn get_movie(&self, movie_id: &str) -> Result<Movie> {
        self.get_entity("Movie", movie_id).await
    }

    /// Lists canonical genre names ordered by genre id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store call fails.
    pub async fn get_genres(&self) -> Result<Vec<String>> {
        let docs = self.query_documents(&genres_query()).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get("genre").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn resolve_genre(&self, requested: &str) -> Result<Option<String>> {
        let id = requested.trim().to_lowercase();
        match self.get_document(&id).await {
            Ok(doc) => Ok(doc
                .get("genre")
                .and_then(Value::as_str)
                .map(str::to_string)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(genre = %requested, "Unknown genre");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_entity<T: DeserializeOwned>(
        &self,
        resource_type: &'static str,
        id: &str,
    ) -> Result<T> {
        match self.get_document(id).await {
            Ok(doc) => Ok(serde_json::from_value(doc)?),
            Err(e) if e.is_not_found() => Err(Error::not_found(resource_type, id)),
            Err(e) => Err(e),
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let result = match self.store_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(Error::Timeout {
                    operation,
                    elapsed: limit,
                })),
            None => call.await,
        };
        record_store_call(operation, started.elapsed().as_secs_f64());

        match &result {
            Err(Error::Timeout { .. }) => record_store_error(operation, "timeout"),
            Err(Error::NotFound { .. }) | Ok(_) => {}
            Err(_) => record_store_error(operation, "store"),
        }
        result
    }
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>> {
    docs.into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use crate::validation::Paging;

    fn sample() -> (Arc<MemoryDocumentStore>, DataAccess) {
        let store = Arc::new(MemoryDocumentStore::with_sample_catalog());
        let access = DataAccess::new(store.clone());
        (store, access)
    }

    #[tokio::test]
    async fn get_movie_and_actor_by_id() {
        let (_, access) = sample();

        let movie = access.get_movie("tt0133093").await.unwrap();
        assert_eq!(movie.title, "The Matrix");

        let actor = access.get_actor("nm0000173").await.unwrap();
        assert_eq!(actor.name, "Nicole Kidman");
    }

    #[tokio::test]
    async fn missing_entities_are_typed_not_found() {
        let (_, access) = sample();

        let err = access.get_movie("tt9999999").await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                resource_type: "Movie",
                ..
            }
        ));

        let err = access.get_actor("nm9999999").await.unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                resource_type: "Actor",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn genres_are_canonical_names_in_id_order() {
        let (_, access) = sample();
        let genres = access.get_genres().await.unwrap();
        assert_eq!(genres.first().map(String::as_str), Some("Action"));
        assert!(genres.contains(&"Sci-Fi".to_string()));
        assert_eq!(genres.len(), 8);
    }

    #[tokio::test]
    async fn movie_search_resolves_genre_case_insensitively() {
        let (_, access) = sample();
        let query = MovieQuery {
            genre: Some("HORROR".into()),
            ..MovieQuery::default()
        };
        let titles: Vec<_> = access
            .query_movies(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["The Others", "The Ring"]);
    }

    #[tokio::test]
    async fn unknown_genre_yields_empty_result() {
        let (_, access) = sample();
        let query = MovieQuery {
            genre: Some("western".into()),
            ..MovieQuery::default()
        };
        assert!(access.query_movies(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn movie_search_by_actor_and_text() {
        let (_, access) = sample();
        let query = MovieQuery {
            actor_id: Some("nm0000173".into()),
            ..MovieQuery::default()
        };
        assert_eq!(access.query_movies(&query).await.unwrap().len(), 2);

        let rings = access.query_movies(&MovieQuery::search("ring")).await.unwrap();
        assert_eq!(rings.len(), 3);
    }

    #[tokio::test]
    async fn actor_search_pages_results() {
        let (_, access) = sample();
        let query = ActorQuery {
            q: None,
            paging: Paging {
                page_number: Some(2),
                page_size: Some(3),
            },
        };
        let names: Vec<_> = access
            .query_actors(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Keanu Reeves", "Laurence Fishburne", "Naomi Watts"]);
    }

    #[tokio::test]
    async fn initialize_remembers_connect_failure() {
        let (store, access) = sample();
        store.set_failure(Some("unreachable"));
        access.initialize().await;
        assert!(access.connect_error().unwrap().contains("unreachable"));

        store.set_failure(None);
        access.initialize().await;
        assert!(access.connect_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_calls_time_out() {
        let (store, access) = sample();
        let access = access.with_store_timeout(Some(Duration::from_millis(100)));
        store.set_latency(Some(Duration::from_secs(1)));

        let err = access.get_genres().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Timeout {
                operation: "query",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let (store, access) = sample();
        store.set_failure(Some("throttled"));
        let err = access.get_movie("tt0133093").await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }

    #[tokio::test]
    async fn undecodable_documents_are_serialization_errors() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .insert_value(serde_json::json!({"id": "tt0000001", "type": "Movie"}))
            .unwrap();
        let access = DataAccess::new(store);
        let err = access.get_movie("tt0000001").await.unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
