//! API integration tests.
//!
//! Tests the complete request flow: HTTP → routes → validation → data
//! access → in-memory store.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use marquee_api::server::ServerBuilder;
use marquee_core::MemoryDocumentStore;

fn test_router() -> axum::Router {
    ServerBuilder::new().debug(true).build().test_router()
}

fn test_router_with_store(store: Arc<MemoryDocumentStore>) -> axum::Router {
    ServerBuilder::new().store(store).build().test_router()
}

mod helpers {
    use super::*;

    pub async fn get(router: axum::Router, uri: &str) -> Result<axum::response::Response> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .context("build request")?;
        router.oneshot(request).await.map_err(|err| match err {})
    }

    pub async fn get_json(router: axum::Router, uri: &str) -> Result<(StatusCode, Value)> {
        let response = get(router, uri).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        let json = serde_json::from_slice(&body).context("parse JSON body")?;
        Ok((status, json))
    }

    pub async fn get_text(router: axum::Router, uri: &str) -> Result<(StatusCode, String)> {
        let response = get(router, uri).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        Ok((status, String::from_utf8(body.to_vec()).context("utf-8 body")?))
    }

    pub fn targets(problem: &Value) -> Vec<String> {
        problem["validationErrors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e["target"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

mod actors {
    use super::*;

    #[tokio::test]
    async fn search_by_name() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/actors?q=nicole").await?;
        assert_eq!(status, StatusCode::OK);
        let actors = body.as_array().context("array body")?;
        assert_eq!(actors.len(), 1);
        assert_eq!(actors[0]["name"], "Nicole Kidman");
        assert_eq!(actors[0]["actorId"], "nm0000173");
        Ok(())
    }

    #[tokio::test]
    async fn paging_clamps_page_number() -> Result<()> {
        let (_, first) =
            helpers::get_json(test_router(), "/api/actors?pageNumber=1&pageSize=2").await?;
        let (_, zero) =
            helpers::get_json(test_router(), "/api/actors?pageSize=2").await?;
        assert_eq!(first, zero);
        assert_eq!(first.as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn short_query_is_rejected_with_problem() -> Result<()> {
        let response = helpers::get(test_router(), "/api/actors?q=a").await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).context("content type")?,
            "application/problem+json"
        );

        let (_, body) = helpers::get_json(test_router(), "/api/actors?q=a").await?;
        assert_eq!(helpers::targets(&body), vec!["q"]);
        assert_eq!(body["instance"], "/api/actors?q=a");
        assert_eq!(
            body["validationErrors"][0]["message"],
            "The parameter 'q' should be between 2 and 20 characters."
        );
        Ok(())
    }

    #[tokio::test]
    async fn get_by_id() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/actors/nm0000206").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Keanu Reeves");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/actors/nm9999999").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Actor Not Found");
        Ok(())
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/actors/tt0133093").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(helpers::targets(&body), vec!["actorId"]);
        Ok(())
    }
}

mod movies {
    use super::*;

    #[tokio::test]
    async fn search_pages_and_orders_results() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/movies?q=ring&pageSize=2").await?;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = body
            .as_array()
            .context("array body")?
            .iter()
            .filter_map(|m| m["title"].as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "The Lord of the Rings: The Fellowship of the Ring",
                "The Lord of the Rings: The Two Towers",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn parameter_names_are_case_insensitive() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/movies?ActorId=nm0000173").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn genre_and_year_filters() -> Result<()> {
        let (status, body) =
            helpers::get_json(test_router(), "/api/movies?genre=drama&year=2001").await?;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body
            .as_array()
            .context("array body")?
            .iter()
            .filter_map(|m| m["movieId"].as_str())
            .collect();
        assert_eq!(ids, vec!["tt0203009", "tt0120737"]);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_genre_is_empty() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/movies?genre=western").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn every_invalid_parameter_is_reported() -> Result<()> {
        let (status, body) = helpers::get_json(
            test_router(),
            "/api/movies?genre=action&year=3060&rating=12.34&actorId=actor",
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(helpers::targets(&body), vec!["year", "rating", "actorId"]);
        assert_eq!(body["status"], 400);
        Ok(())
    }

    #[tokio::test]
    async fn get_by_id() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/movies/tt0133093").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "The Matrix");
        assert_eq!(body["partitionKey"], "3");
        Ok(())
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/movies/tt9999999").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Movie Not Found");
        assert!(body["requestId"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn uppercase_prefix_is_rejected() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/movies/TT0133093").await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(helpers::targets(&body), vec!["movieId"]);
        Ok(())
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn genres_are_listed() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/genres").await?;
        assert_eq!(status, StatusCode::OK);
        let genres = body.as_array().context("array body")?;
        assert_eq!(genres.len(), 8);
        assert_eq!(genres[0], "Action");
        Ok(())
    }

    #[tokio::test]
    async fn featured_movie_is_a_candidate() -> Result<()> {
        let (status, body) = helpers::get_json(test_router(), "/api/featured/movie").await?;
        assert_eq!(status, StatusCode::OK);
        let id = body["movieId"].as_str().context("movie id")?;
        assert!(["tt0133093", "tt0120737", "tt0230600"].contains(&id), "{id}");
        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() -> Result<()> {
        let store = Arc::new(MemoryDocumentStore::with_sample_catalog());
        store.set_failure(Some("service unavailable"));

        let (status, body) =
            helpers::get_json(test_router_with_store(store), "/api/genres").await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL");
        assert!(!body["message"].as_str().unwrap_or_default().contains("unavailable"));
        Ok(())
    }

    #[tokio::test]
    async fn request_id_is_echoed() -> Result<()> {
        let request = Request::builder()
            .uri("/api/genres")
            .header("x-request-id", "trace-42")
            .body(Body::empty())
            .context("build request")?;
        let response = test_router()
            .oneshot(request)
            .await
            .map_err(|err| match err {})?;
        assert_eq!(
            response.headers().get("x-request-id").context("request id")?,
            "trace-42"
        );
        Ok(())
    }
}

mod health {
    use super::*;

    #[tokio::test]
    async fn healthy_store_passes() -> Result<()> {
        let (status, body) = helpers::get_text(test_router(), "/healthz").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "pass");
        Ok(())
    }

    #[tokio::test]
    async fn failing_store_returns_503() -> Result<()> {
        let store = Arc::new(MemoryDocumentStore::with_sample_catalog());
        store.set_failure(Some("down"));

        let (status, body) =
            helpers::get_text(test_router_with_store(store.clone()), "/healthz").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "fail");

        let (status, report) =
            helpers::get_json(test_router_with_store(store), "/healthz/ietf").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report["status"], "fail");
        assert_eq!(
            report["checks"]["getGenres:responseTime"]["affectedEndpoints"][0],
            "/api/genres"
        );
        Ok(())
    }

    #[tokio::test]
    async fn ietf_report_lists_every_check() -> Result<()> {
        let router = ServerBuilder::new().instance_id("instance-1").build().test_router();
        let (status, report) = helpers::get_json(router, "/healthz/ietf").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["instance"], "instance-1");
        assert_eq!(report["version"], env!("CARGO_PKG_VERSION"));
        let checks = report["checks"].as_object().context("checks object")?;
        for name in [
            "getGenres",
            "getActorById",
            "getMovieById",
            "searchMovies",
            "searchActors",
        ] {
            assert!(checks.contains_key(&format!("{name}:responseTime")), "{name}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn remembered_connect_error_fails_health() -> Result<()> {
        let store = Arc::new(MemoryDocumentStore::with_sample_catalog());
        let server = ServerBuilder::new().store(store.clone()).build();
        let (state, router) = server.test_state();

        store.set_failure(Some("dns"));
        state.data.initialize().await;
        store.set_failure(None);

        let (status, body) = helpers::get_text(router, "/healthz").await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "fail");
        Ok(())
    }
}
