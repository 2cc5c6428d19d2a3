//! Featured movie selection.
//!
//! Candidates come from the `Featured` documents in the store, each repeated
//! according to its weight. The list is loaded on first use and cached for
//! the life of the process.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;

use crate::data_access::DataAccess;
use crate::error::Result;
use crate::model::{FeaturedEntry, Movie};
use crate::query::featured_query;

/// Movie served when the store has no featured candidates.
pub const DEFAULT_FEATURED_MOVIE: &str = "tt0133093";

/// Picks a random featured movie.
#[derive(Debug)]
pub struct FeaturedSelector {
    data: Arc<DataAccess>,
    candidates: RwLock<Vec<String>>,
    rng: Mutex<StdRng>,
}

impl FeaturedSelector {
    /// Creates a selector that loads its candidates lazily.
    #[must_use]
    pub fn new(data: Arc<DataAccess>) -> Self {
        Self {
            data,
            candidates: RwLock::new(Vec::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a selector with a pre-seeded candidate list.
    #[must_use]
    pub fn with_candidates(data: Arc<DataAccess>, candidates: Vec<String>) -> Self {
        Self {
            candidates: RwLock::new(candidates),
            ..Self::new(data)
        }
    }

    /// Replaces the random source, for deterministic draws.
    #[must_use]
    pub fn with_rng(self, rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            ..self
        }
    }

    /// Returns the cached candidate list, loading it if empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the featured documents cannot be queried.
    pub async fn candidates(&self) -> Result<Vec<String>> {
        {
            let cached = self.candidates.read().await;
            if !cached.is_empty() {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_candidates().await?;
        // Concurrent cold loads produce the same list.
        *self.candidates.write().await = loaded.clone();
        Ok(loaded)
    }

    /// Picks a candidate and returns the full movie.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the picked movie does not exist, or a store
    /// error if loading fails.
    pub async fn get_featured_movie(&self) -> Result<Movie> {
        let candidates = self.candidates().await?;
        let index = self.pick_index(candidates.len());
        let movie_id = candidates
            .get(index)
            .map_or(DEFAULT_FEATURED_MOVIE, String::as_str);
        tracing::debug!(movie_id, index, "Selected featured movie");
        self.data.get_movie(movie_id).await
    }

    // The last candidate is never drawn unless it is the only one.
    fn pick_index(&self, len: usize) -> usize {
        let upper = len.saturating_sub(1).max(1);
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..upper),
            Err(_) => 0,
        }
    }

    async fn load_candidates(&self) -> Result<Vec<String>> {
        let docs = self.data.query_documents(&featured_query()).await?;
        let mut candidates = Vec::new();
        for doc in docs {
            let entry: FeaturedEntry = match serde_json::from_value(doc) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable featured document");
                    continue;
                }
            };
            let weight = usize::try_from(entry.weight).unwrap_or(0);
            candidates.extend(std::iter::repeat_n(entry.movie_id, weight));
        }

        if candidates.is_empty() {
            tracing::warn!(
                default = DEFAULT_FEATURED_MOVIE,
                "No featured movies found, using default"
            );
            candidates.push(DEFAULT_FEATURED_MOVIE.to_string());
        }
        Ok(candidates)
    }
}
