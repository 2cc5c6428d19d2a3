//! Composite health check.
//!
//! Runs a fixed battery of representative catalog operations, times each one
//! against a latency target and folds the outcomes into an IETF-style health
//! report (`application/health+json`).

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::data_access::DataAccess;
use crate::error::Result;
use crate::validation::{ActorQuery, MovieQuery};

/// Health status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Healthy.
    Pass,
    /// Healthy but slower than targeted.
    Warn,
    /// Unhealthy.
    Fail,
}

impl HealthStatus {
    /// Returns the wire name (`pass`, `warn`, `fail`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }

    /// Returns true unless the status is [`HealthStatus::Fail`].
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Fail)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one timed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    /// Outcome of the check.
    pub status: HealthStatus,
    /// Name of the checked operation.
    pub component_id: String,
    /// Always `datastore`.
    pub component_type: &'static str,
    /// Always `ms`.
    pub observed_unit: &'static str,
    /// Elapsed milliseconds.
    pub observed_value: u64,
    /// Target milliseconds.
    pub target_value: u64,
    /// RFC 3339 time the check completed.
    pub time: String,
    /// Endpoints affected when the check is not passing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_endpoints: Option<Vec<String>>,
    /// Diagnostic message when the check is not passing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Aggregated health report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Worst status among executed checks.
    pub status: HealthStatus,
    /// Service identifier.
    pub service_id: String,
    /// Human-readable description.
    pub description: String,
    /// Instance identifier of this process.
    pub instance: String,
    /// Service version.
    pub version: String,
    /// Checks keyed by `"<name>:responseTime"`.
    pub checks: BTreeMap<String, HealthCheck>,
}

/// Identity reported in every health document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Service identifier.
    pub service_id: String,
    /// Human-readable description.
    pub description: String,
    /// Instance identifier of this process.
    pub instance: String,
    /// Service version.
    pub version: String,
}

impl ServiceInfo {
    /// Creates service info for this crate's version.
    #[must_use]
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            service_id: "marquee".to_string(),
            description: "Marquee catalog API health check".to_string(),
            instance: instance.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Times `operation` and grades it against `target`.
///
/// Elapsed time above the target yields `warn`; any error yields `fail`.
pub async fn run_check<T, F>(
    name: &str,
    endpoint: &str,
    target: Duration,
    operation: F,
) -> HealthCheck
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let outcome = operation.await;
    let elapsed = started.elapsed();

    let (status, output) = match outcome {
        Err(e) => (HealthStatus::Fail, Some(e.to_string())),
        Ok(_) if elapsed > target => (
            HealthStatus::Warn,
            Some(format!(
                "{name} took {}ms, target is {}ms",
                elapsed.as_millis(),
                target.as_millis()
            )),
        ),
        Ok(_) => (HealthStatus::Pass, None),
    };
    let affected_endpoints = output.as_ref().map(|_| vec![endpoint.to_string()]);

    HealthCheck {
        status,
        component_id: name.to_string(),
        component_type: "datastore",
        observed_unit: "ms",
        observed_value: millis(elapsed),
        target_value: millis(target),
        time: now(),
        affected_endpoints,
        output,
    }
}

#[derive(Debug, Clone, Copy)]
enum Probe {
    Genres,
    ActorById,
    MovieById,
    SearchMovies,
    SearchActors,
}

impl Probe {
    const BATTERY: [Self; 5] = [
        Self::Genres,
        Self::ActorById,
        Self::MovieById,
        Self::SearchMovies,
        Self::SearchActors,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Genres => "getGenres",
            Self::ActorById => "getActorById",
            Self::MovieById => "getMovieById",
            Self::SearchMovies => "searchMovies",
            Self::SearchActors => "searchActors",
        }
    }

    const fn endpoint(self) -> &'static str {
        match self {
            Self::Genres => "/api/genres",
            Self::ActorById => "/api/actors/nm0000173",
            Self::MovieById => "/api/movies/tt0133093",
            Self::SearchMovies => "/api/movies?q=ring",
            Self::SearchActors => "/api/actors?q=nicole",
        }
    }

    const fn target(self) -> Duration {
        match self {
            Self::ActorById | Self::MovieById => Duration::from_millis(250),
            Self::Genres | Self::SearchMovies | Self::SearchActors => Duration::from_millis(400),
        }
    }

    async fn run(self, data: &DataAccess) -> HealthCheck {
        let (name, endpoint, target) = (self.name(), self.endpoint(), self.target());
        match self {
            Self::Genres => run_check(name, endpoint, target, data.get_genres()).await,
            Self::ActorById => run_check(name, endpoint, target, data.get_actor("nm0000173")).await,
            Self::MovieById => run_check(name, endpoint, target, data.get_movie("tt0133093")).await,
            Self::SearchMovies => {
                let query = MovieQuery::search("ring");
                run_check(name, endpoint, target, data.query_movies(&query)).await
            }
            Self::SearchActors => {
                let query = ActorQuery::search("nicole");
                run_check(name, endpoint, target, data.query_actors(&query)).await
            }
        }
    }
}

/// Runs the health battery against the catalog.
#[derive(Debug)]
pub struct HealthAggregator {
    data: Arc<DataAccess>,
    info: ServiceInfo,
}

impl HealthAggregator {
    /// Creates an aggregator reporting as `info`.
    #[must_use]
    pub const fn new(data: Arc<DataAccess>, info: ServiceInfo) -> Self {
        Self { data, info }
    }

    /// Runs every check in order and returns the aggregated report.
    ///
    /// A remembered connection failure fails immediately; otherwise the
    /// first failing check stops the battery.
    pub async fn check(&self) -> HealthReport {
        let mut checks = BTreeMap::new();

        if let Some(error) = self.data.connect_error() {
            checks.insert(
                check_key("connect"),
                HealthCheck {
                    status: HealthStatus::Fail,
                    component_id: "connect".to_string(),
                    component_type: "datastore",
                    observed_unit: "ms",
                    observed_value: 0,
                    target_value: 0,
                    time: now(),
                    affected_endpoints: None,
                    output: Some(error),
                },
            );
            return self.report(HealthStatus::Fail, checks);
        }

        let mut status = HealthStatus::Pass;
        for probe in Probe::BATTERY {
            let result = probe.run(&self.data).await;
            status = status.max(result.status);
            if result.status != HealthStatus::Pass {
                tracing::warn!(
                    check = probe.name(),
                    status = %result.status,
                    observed_ms = result.observed_value,
                    output = result.output.as_deref().unwrap_or_default(),
                    "Health check degraded"
                );
            }
            checks.insert(check_key(probe.name()), result);
            if status == HealthStatus::Fail {
                break;
            }
        }

        self.report(status, checks)
    }

    fn report(&self, status: HealthStatus, checks: BTreeMap<String, HealthCheck>) -> HealthReport {
        HealthReport {
            status,
            service_id: self.info.service_id.clone(),
            description: self.info.description.clone(),
            instance: self.info.instance.clone(),
            version: self.info.version.clone(),
            checks,
        }
    }
}

fn check_key(name: &str) -> String {
    format!("{name}:responseTime")
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
