//! Secret lookup.
//!
//! Store credentials come either from environment variables or from a
//! directory with one file per secret (for example a Key Vault CSI mount).

use std::path::PathBuf;

use crate::cosmos::CosmosConfig;
use crate::error::{Error, Result};

/// Cosmos DB account endpoint.
pub const COSMOS_URL: &str = "CosmosUrl";
/// Cosmos DB master key.
pub const COSMOS_KEY: &str = "CosmosKey";
/// Cosmos DB database name.
pub const COSMOS_DATABASE: &str = "CosmosDatabase";
/// Cosmos DB collection name.
pub const COSMOS_COLLECTION: &str = "CosmosCollection";
/// Telemetry instrumentation key (optional).
pub const APP_INSIGHTS_KEY: &str = "AppInsightsKey";

/// A source of named secrets.
pub trait SecretSource: Send + Sync {
    /// Returns the secret value, or `None` when the secret is not defined.
    fn get_secret(&self, name: &str) -> Option<String>;

    /// Returns the secret value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the secret is missing or blank.
    fn require(&self, name: &str) -> Result<String> {
        self.get_secret(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::Config(format!("missing required secret {name}")))
    }
}

/// Secrets read from environment variables named `<prefix><name>`.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    prefix: String,
}

impl EnvSecrets {
    /// Default variable prefix.
    pub const DEFAULT_PREFIX: &'static str = "MARQUEE_SECRET_";

    /// Creates a source reading variables with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl SecretSource for EnvSecrets {
    fn get_secret(&self, name: &str) -> Option<String> {
        std::env::var(format!("{}{name}", self.prefix))
            .ok()
            .map(|value| value.trim().to_string())
    }
}

/// Secrets read from files in a directory, one file per secret.
#[derive(Debug, Clone)]
pub struct DirectorySecrets {
    root: PathBuf,
}

impl DirectorySecrets {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SecretSource for DirectorySecrets {
    fn get_secret(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value.trim().to_string()),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Secret not readable");
                None
            }
        }
    }
}

/// Builds the Cosmos DB connection settings from `secrets`.
///
/// # Errors
///
/// Returns [`Error::Config`] naming the first missing secret.
pub fn cosmos_config(secrets: &dyn SecretSource) -> Result<CosmosConfig> {
    Ok(CosmosConfig::new(
        secrets.require(COSMOS_URL)?,
        secrets.require(COSMOS_KEY)?,
        secrets.require(COSMOS_DATABASE)?,
        secrets.require(COSMOS_COLLECTION)?,
    ))
}
