//! `marquee-api` binary entrypoint.
//!
//! Loads configuration and secrets, picks the document store and starts the
//! HTTP server.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use marquee_api::config::Config;
use marquee_api::server::Server;
use marquee_core::observability::{LogFormat, init_logging};
use marquee_core::secrets::{
    APP_INSIGHTS_KEY, DirectorySecrets, EnvSecrets, SecretSource, cosmos_config,
};
use marquee_core::{CosmosBackend, DocumentStore, MemoryDocumentStore};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

fn secret_source(config: &Config) -> Box<dyn SecretSource> {
    match config.secrets_dir.as_deref() {
        Some(dir) => {
            tracing::info!(dir = %dir, "Reading secrets from directory");
            Box::new(DirectorySecrets::new(dir))
        }
        None => Box::new(EnvSecrets::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    let secrets = secret_source(&config);

    let store: Arc<dyn DocumentStore> = match cosmos_config(secrets.as_ref()) {
        Ok(cosmos) => {
            tracing::info!(
                database = %cosmos.database,
                collection = %cosmos.collection,
                "Using Cosmos DB document store"
            );
            Arc::new(CosmosBackend::new(&cosmos)?)
        }
        Err(e) if config.debug => {
            tracing::warn!(
                error = %e,
                "Cosmos DB secrets not found; serving sample catalog (debug only)"
            );
            Arc::new(MemoryDocumentStore::with_sample_catalog())
        }
        Err(e) => return Err(e.into()),
    };

    if secrets.get_secret(APP_INSIGHTS_KEY).is_some() {
        tracing::info!("Telemetry enabled");
    }

    let server = Server::with_store(config, store);
    server.serve().await?;
    Ok(())
}
