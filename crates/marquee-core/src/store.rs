//! Document store abstraction.
//!
//! The catalog lives in an external document database that understands a
//! SQL-like query language and addresses single documents by id plus
//! partition key. [`DocumentStore`] is the narrow seam the rest of the crate
//! talks to:
//!
//! - [`crate::cosmos::CosmosBackend`] speaks the Cosmos DB REST API.
//! - [`MemoryDocumentStore`] evaluates [`QuerySpec`]s directly over an
//!   in-memory document set, for tests and local development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::partition::partition_key;
use crate::query::QuerySpec;

/// Document store contract.
///
/// Implementations return documents exactly as stored. A point read that
/// finds nothing must return [`Error::NotFound`] rather than a generic
/// store error.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Verifies connectivity and that the target collection exists.
    async fn connect(&self) -> Result<()>;

    /// Runs a read-only query and returns every matching document.
    ///
    /// Server-side result pages are followed until exhausted.
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<Value>>;

    /// Reads one document by id within `partition_key`.
    async fn read(&self, id: &str, partition_key: &str) -> Result<Value>;
}

/// In-memory document store.
///
/// Thread-safe via `RwLock`. Not suitable for production. Supports simple
/// failure and latency injection for exercising error and health paths.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<RwLock<HashMap<(String, String), Value>>>,
    failure: RwLock<Option<String>>,
    latency: RwLock<Option<Duration>>,
}

impl MemoryDocumentStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with the sample catalog.
    #[must_use]
    pub fn with_sample_catalog() -> Self {
        let store = Self::new();
        for doc in crate::sample::catalog() {
            // Sample documents always carry an id.
            let _ = store.insert_value(doc);
        }
        store
    }

    /// Inserts (or replaces) a serializable document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not serialize to an object with
    /// a string `id`.
    pub fn insert<T: Serialize>(&self, doc: &T) -> Result<()> {
        self.insert_value(serde_json::to_value(doc)?)
    }

    /// Inserts (or replaces) a raw JSON document.
    ///
    /// The partition is taken from the document's `partitionKey` field, or
    /// derived from its id when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no string `id`.
    pub fn insert_value(&self, doc: Value) -> Result<()> {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Serialization {
                message: "document is missing a string id".into(),
            })?
            .to_string();
        let partition = doc
            .get("partitionKey")
            .and_then(Value::as_str)
            .map_or_else(|| partition_key(&id), str::to_string);

        self.documents
            .write()
            .map_err(|_| poisoned())?
            .insert((partition, id), doc);
        Ok(())
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.read().map_or(0, |docs| docs.len())
    }

    /// Returns true when the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every subsequent call fail with a store error carrying
    /// `message`, or restores normal operation with `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = message.map(str::to_string);
        }
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut slot) = self.latency.write() {
            *slot = latency;
        }
    }

    async fn simulate(&self) -> Result<()> {
        let latency = *self.latency.read().map_err(|_| poisoned())?;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self.failure.read().map_err(|_| poisoned())?.clone();
        match failure {
            Some(message) => Err(Error::store(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn connect(&self) -> Result<()> {
        self.simulate().await
    }

    async fn query(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        self.simulate().await?;
        let documents = self.documents.read().map_err(|_| poisoned())?;
        Ok(spec.evaluate(documents.values()))
    }

    async fn read(&self, id: &str, partition_key: &str) -> Result<Value> {
        self.simulate().await?;
        let documents = self.documents.read().map_err(|_| poisoned())?;
        documents
            .get(&(partition_key.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found("document", id))
    }
}

fn poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}
