//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use marquee_core::{Error, Result};

/// Configuration for the Marquee API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - logs are pretty-printed instead of JSON
    /// - a seeded in-memory catalog is served when no store secrets exist
    pub debug: bool,

    /// Directory holding one file per secret. When unset, secrets are read
    /// from `MARQUEE_SECRET_<Name>` environment variables.
    #[serde(default)]
    pub secrets_dir: Option<String>,

    /// Upper bound for each document store call, in milliseconds.
    #[serde(default)]
    pub store_timeout_ms: Option<u64>,

    /// Upper bound for a whole HTTP request, in seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Maximum number of requests handled concurrently.
    #[serde(default)]
    pub concurrency_limit: Option<usize>,

    /// Instance identifier reported by the health check.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins.
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 4120,
            debug: false,
            secrets_dir: None,
            store_timeout_ms: None,
            request_timeout_secs: None,
            concurrency_limit: None,
            instance_id: default_instance_id(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported variables:
    /// - `MARQUEE_HTTP_PORT`
    /// - `MARQUEE_DEBUG`
    /// - `MARQUEE_SECRETS_DIR`
    /// - `MARQUEE_STORE_TIMEOUT_MS`
    /// - `MARQUEE_REQUEST_TIMEOUT_SECS`
    /// - `MARQUEE_CONCURRENCY_LIMIT`
    /// - `MARQUEE_INSTANCE_ID`
    /// - `MARQUEE_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `MARQUEE_CORS_MAX_AGE_SECONDS`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("MARQUEE_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("MARQUEE_DEBUG")? {
            config.debug = debug;
        }
        config.secrets_dir = env_string("MARQUEE_SECRETS_DIR");
        config.store_timeout_ms = env_u64("MARQUEE_STORE_TIMEOUT_MS")?.filter(|ms| *ms > 0);
        config.request_timeout_secs =
            env_u64("MARQUEE_REQUEST_TIMEOUT_SECS")?.filter(|secs| *secs > 0);
        config.concurrency_limit = env_usize("MARQUEE_CONCURRENCY_LIMIT")?.filter(|n| *n > 0);
        if let Some(instance) = env_string("MARQUEE_INSTANCE_ID") {
            config.instance_id = instance;
        }

        if let Some(origins) = env_string("MARQUEE_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("MARQUEE_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        Ok(config)
    }

    /// The configured store call bound.
    #[must_use]
    pub fn store_timeout(&self) -> Option<Duration> {
        self.store_timeout_ms.map(Duration::from_millis)
    }

    /// The configured whole-request bound.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn default_instance_id() -> String {
    ulid::Ulid::new().to_string()
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{name} must be a u16: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{name} must be a u64: {e}")))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<usize>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{name} must be a usize: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::Config(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}
