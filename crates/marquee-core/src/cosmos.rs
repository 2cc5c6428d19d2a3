//! Cosmos DB REST backend.
//!
//! Talks to the SQL API over HTTPS with master-key authorization. Paged
//! queries are fanned out to every catalog partition (see
//! [`crate::partition::PARTITION_KEYS`]) and merged client-side, because the
//! REST gateway does not execute cross-partition `order by`/`offset` queries
//! itself. Each partition query follows `x-ms-continuation` until exhausted.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::observability::store_span;
use crate::partition::PARTITION_KEYS;
use crate::query::{Page, QuerySpec};
use crate::store::DocumentStore;

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2018-12-31";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_ITEM_COUNT: u32 = 1000;

const HEADER_CONTINUATION: &str = "x-ms-continuation";
const HEADER_PARTITION_KEY: &str = "x-ms-documentdb-partitionkey";

/// Connection settings for a Cosmos DB collection.
#[derive(Clone)]
pub struct CosmosConfig {
    /// Account endpoint, e.g. `https://account.documents.azure.com:443/`.
    pub url: String,
    /// Base64-encoded master key.
    pub key: String,
    /// Database name.
    pub database: String,
    /// Collection (container) name.
    pub collection: String,
    /// Documents requested per server-side page.
    pub max_item_count: u32,
    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for CosmosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosConfig")
            .field("url", &self.url)
            .field("key", &"[REDACTED]")
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("max_item_count", &self.max_item_count)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CosmosConfig {
    /// Creates a configuration with default paging and timeout.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        key: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            database: database.into(),
            collection: collection.into(),
            max_item_count: DEFAULT_MAX_ITEM_COUNT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Cosmos DB document store.
#[derive(Clone)]
pub struct CosmosBackend {
    base_url: String,
    key: Vec<u8>,
    collection_link: String,
    max_item_count: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for CosmosBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosBackend")
            .field("base_url", &self.base_url)
            .field("collection_link", &self.collection_link)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "Documents", default)]
    documents: Vec<Value>,
}

impl CosmosBackend {
    /// Creates a backend for the configured collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the master key is not valid base64 or the
    /// HTTP client cannot be built.
    pub fn new(config: &CosmosConfig) -> Result<Self> {
        let key = STANDARD
            .decode(config.key.trim())
            .map_err(|e| Error::Config(format!("cosmos key is not valid base64: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            key,
            collection_link: format!("dbs/{}/colls/{}", config.database, config.collection),
            max_item_count: config.max_item_count.max(1),
            client,
        })
    }

    fn authorization(&self, verb: &Method, resource_type: &str, link: &str, date: &str) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.as_str().to_lowercase(),
            resource_type,
            link,
            date.to_lowercase()
        );
        // HMAC accepts keys of any length.
        let signature = HmacSha256::new_from_slice(&self.key).map_or_else(
            |_| String::new(),
            |mut mac| {
                mac.update(payload.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            },
        );
        urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}")).into_owned()
    }

    /// Builds a signed request for `path`. `resource_link` is the resource
    /// the signature covers, which for feeds and queries is the parent.
    fn request(
        &self,
        method: Method,
        resource_type: &str,
        resource_link: &str,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let authorization = self.authorization(&method, resource_type, resource_link, &date);
        self.client
            .request(method, format!("{}/{path}", self.base_url))
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
    }

    async fn query_partition(&self, sql: &str, partition: &str) -> Result<Vec<Value>> {
        let link = format!("{}/docs", self.collection_link);
        let body = json!({ "query": sql, "parameters": [] });
        let mut documents = Vec::new();
        let mut continuation: Option<HeaderValue> = None;

        loop {
            let mut request = self
                .request(Method::POST, "docs", &self.collection_link, &link)
                .header(CONTENT_TYPE, "application/query+json")
                .header("x-ms-documentdb-isquery", "True")
                .header("x-ms-max-item-count", self.max_item_count.to_string())
                .header(HEADER_PARTITION_KEY, partition_header(partition))
                .body(body.to_string());
            if let Some(token) = continuation.take() {
                request = request.header(HEADER_CONTINUATION, token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::store_with_source(format!("query {link} failed"), e))?;
            let status = response.status();
            let headers = response.headers().clone();
            if !status.is_success() {
                return Err(error_from_response(status, response, &link).await);
            }

            let page: QueryResponse = response
                .json()
                .await
                .map_err(|e| Error::store_with_source("invalid query response", e))?;
            documents.extend(page.documents);

            continuation = next_continuation(&headers);
            if continuation.is_none() {
                return Ok(documents);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for CosmosBackend {
    async fn connect(&self) -> Result<()> {
        let response = self
            .request(Method::GET, "colls", &self.collection_link, &self.collection_link)
            .send()
            .instrument(store_span("connect", &self.collection_link))
            .await
            .map_err(|e| Error::store_with_source("cosmos connection failed", e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(collection = %self.collection_link, "Connected to Cosmos DB");
            Ok(())
        } else {
            Err(error_from_response(status, response, &self.collection_link).await)
        }
    }

    async fn query(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        // Each partition returns its own first offset+limit matches; the
        // requested window is cut after merging.
        let mut partition_spec = spec.clone();
        partition_spec.page = spec.page.map(|page| Page {
            offset: 0,
            limit: page.offset.saturating_add(page.limit),
        });
        let sql = partition_spec.to_sql();
        tracing::debug!(sql = %sql, "Running partitioned query");

        let partitions = PARTITION_KEYS
            .iter()
            .map(|partition| self.query_partition(&sql, partition));
        let merged: Vec<Value> = futures::future::try_join_all(partitions)
            .instrument(store_span("query", spec.doc_type.as_str()))
            .await?
            .into_iter()
            .flatten()
            .collect();

        let window = QuerySpec {
            filters: Vec::new(),
            ..spec.clone()
        };
        Ok(window.evaluate(&merged))
    }

    async fn read(&self, id: &str, partition_key: &str) -> Result<Value> {
        let link = format!("{}/docs/{id}", self.collection_link);
        let response = self
            .request(Method::GET, "docs", &link, &link)
            .header(HEADER_PARTITION_KEY, partition_header(partition_key))
            .send()
            .instrument(store_span("read", id))
            .await
            .map_err(|e| Error::store_with_source(format!("read {link} failed"), e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::not_found("document", id)),
            status if status.is_success() => response
                .json::<Value>()
                .await
                .map_err(|e| Error::store_with_source("invalid document response", e)),
            status => Err(error_from_response(status, response, &link).await),
        }
    }
}

fn partition_header(partition: &str) -> String {
    json!([partition]).to_string()
}

fn next_continuation(headers: &HeaderMap) -> Option<HeaderValue> {
    headers
        .get(HEADER_CONTINUATION)
        .filter(|value| !value.is_empty())
        .cloned()
}

async fn error_from_response(status: StatusCode, response: reqwest::Response, link: &str) -> Error {
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());
    Error::store(format!("{link} returned {status}: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocType;
    use crate::query::{Filter, genres_query};
    use axum::Router;
    use axum::extract::Path;
    use axum::http::HeaderMap as AxumHeaders;
    use axum::routing::{get, post};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_KEY: &str = "c2VjcmV0LWtleQ==";

    fn backend(base_url: &str) -> CosmosBackend {
        CosmosBackend::new(&CosmosConfig::new(base_url, TEST_KEY, "imdb", "movies")).unwrap()
    }

    fn partition_of(headers: &AxumHeaders) -> String {
        let raw = headers
            .get(HEADER_PARTITION_KEY)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("[]");
        serde_json::from_str::<Vec<String>>(raw)
            .ok()
            .and_then(|v| v.into_iter().next())
            .unwrap_or_default()
    }

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    #[test]
    fn rejects_non_base64_key() {
        let err = CosmosBackend::new(&CosmosConfig::new("http://x", "%%%", "db", "c")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn authorization_token_is_url_encoded_master_token() {
        let token = backend("http://localhost").authorization(
            &Method::GET,
            "docs",
            "dbs/imdb/colls/movies/docs/tt0133093",
            "Mon, 01 Jan 2024 00:00:00 GMT",
        );
        assert!(token.starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"), "{token}");
    }

    #[test]
    fn config_debug_redacts_key() {
        let config = CosmosConfig::new("http://x", "super-secret", "db", "c");
        let dbg = format!("{config:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("super-secret"));
    }

    #[tokio::test]
    async fn point_read_maps_404_to_not_found() {
        let app = Router::new().route(
            "/dbs/imdb/colls/movies/docs/:id",
            get(|Path(id): Path<String>, headers: AxumHeaders| async move {
                if id == "tt0133093" && partition_of(&headers) == "3" {
                    (
                        axum::http::StatusCode::OK,
                        axum::Json(json!({"id": id, "title": "The Matrix"})),
                    )
                } else {
                    (
                        axum::http::StatusCode::NOT_FOUND,
                        axum::Json(json!({"code": "NotFound", "message": "missing"})),
                    )
                }
            }),
        );
        let store = backend(&spawn(app).await);

        let doc = store.read("tt0133093", "3").await.unwrap();
        assert_eq!(doc["title"], "The Matrix");

        let err = store.read("tt9999999", "9").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn server_errors_map_to_store_errors() {
        let app = Router::new().route(
            "/dbs/imdb/colls/movies",
            get(|| async {
                (
                    axum::http::StatusCode::UNAUTHORIZED,
                    axum::Json(json!({"message": "bad signature"})),
                )
            }),
        );
        let store = backend(&spawn(app).await);

        let err = store.connect().await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert!(err.to_string().contains("bad signature"));
    }

    #[tokio::test]
    async fn query_follows_continuations_and_merges_partitions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let app = Router::new().route(
            "/dbs/imdb/colls/movies/docs",
            post(move |headers: AxumHeaders| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let partition = partition_of(&headers);
                    let continued = headers.contains_key(HEADER_CONTINUATION);
                    let mut response_headers = AxumHeaders::new();
                    let docs = match (partition.as_str(), continued) {
                        ("0", false) => {
                            response_headers
                                .insert(HEADER_CONTINUATION, "page-2".parse().unwrap());
                            vec![json!({"id": "drama", "type": "Genre"})]
                        }
                        ("0", true) => vec![json!({"id": "action", "type": "Genre"})],
                        _ => Vec::new(),
                    };
                    (response_headers, axum::Json(json!({ "Documents": docs })))
                }
            }),
        );
        let store = backend(&spawn(app).await);

        let docs = store.query(&genres_query()).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["action", "drama"]);
        assert_eq!(calls.load(Ordering::SeqCst), PARTITION_KEYS.len() + 1);
    }

    #[tokio::test]
    async fn paged_query_cuts_window_after_merge() {
        let app = Router::new().route(
            "/dbs/imdb/colls/movies/docs",
            post(|headers: AxumHeaders| async move {
                let partition = partition_of(&headers);
                let docs = vec![json!({
                    "id": format!("tt000000{partition}"),
                    "movieId": format!("tt000000{partition}"),
                    "type": "Movie",
                    "textSearch": "ring",
                })];
                axum::Json(json!({ "Documents": docs }))
            }),
        );
        let store = backend(&spawn(app).await);

        let mut spec = QuerySpec::new(DocType::Movie);
        spec.filters.push(Filter::TextContains("ring".into()));
        spec.order_by = vec!["textSearch", "movieId"];
        spec.page = Some(Page {
            offset: 2,
            limit: 3,
        });

        let docs = store.query(&spec).await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d["movieId"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["tt0000002", "tt0000003", "tt0000004"]);
    }
}
