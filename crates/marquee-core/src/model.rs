//! Catalog documents as stored in the document database.
//!
//! Field names follow the stored camelCase layout so a document read from the
//! store can be returned to clients unchanged.

use serde::{Deserialize, Deserializer, Serialize};

use crate::partition::partition_key;

/// Discriminator stored in every document's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    /// A person credited in movies.
    Actor,
    /// A movie title.
    Movie,
    /// A genre name lookup document.
    Genre,
    /// A weighted featured-movie candidate.
    Featured,
}

impl DocType {
    /// Returns the stored discriminator value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Actor => "Actor",
            Self::Movie => "Movie",
            Self::Genre => "Genre",
            Self::Featured => "Featured",
        }
    }
}

/// Reference from an actor to a movie they appeared in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRef {
    /// Movie id (`tt…`).
    pub movie_id: String,
    /// Movie title.
    pub title: String,
    /// Release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Reference from a movie to an actor credited in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Actor id (`nm…`).
    pub actor_id: String,
    /// Actor name.
    pub name: String,
    /// Billing order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Credit category (`actor`, `actress`, `director`, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Characters played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<String>>,
}

/// Actor document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Document id (same value as `actor_id`).
    pub id: String,
    /// Actor id (`nm…`).
    pub actor_id: String,
    /// Partition key derived from `actor_id`.
    pub partition_key: String,
    /// Document discriminator, always [`DocType::Actor`].
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Display name.
    pub name: String,
    /// Lowercased name used for free-text search.
    pub text_search: String,
    /// Year of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    /// Year of death.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_year: Option<i32>,
    /// Professions in credit order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<Vec<String>>,
    /// Movies this actor is known for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movies: Option<Vec<MovieRef>>,
}

impl Actor {
    /// Creates an actor with the derived fields (`id`, `partitionKey`,
    /// `textSearch`) filled in consistently.
    #[must_use]
    pub fn new(actor_id: impl Into<String>, name: impl Into<String>) -> Self {
        let actor_id = actor_id.into();
        let name = name.into();
        Self {
            id: actor_id.clone(),
            partition_key: partition_key(&actor_id),
            actor_id,
            doc_type: DocType::Actor,
            text_search: name.to_lowercase(),
            name,
            birth_year: None,
            death_year: None,
            profession: None,
            movies: None,
        }
    }

    /// Returns true when `textSearch` is the lowercased name.
    #[must_use]
    pub fn text_search_is_consistent(&self) -> bool {
        self.text_search == self.name.to_lowercase()
    }
}

/// Movie document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    /// Document id (same value as `movie_id`).
    pub id: String,
    /// Movie id (`tt…`).
    pub movie_id: String,
    /// Partition key derived from `movie_id`.
    pub partition_key: String,
    /// Document discriminator, always [`DocType::Movie`].
    #[serde(rename = "type")]
    pub doc_type: DocType,
    /// Title.
    pub title: String,
    /// Lowercased title used for free-text search.
    pub text_search: String,
    /// Release year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Runtime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    /// Average rating between 0 and 10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Number of votes behind `rating`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<u64>,
    /// Rating multiplied by votes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    /// Canonical genre names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    /// Credited cast and crew in billing order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
}

impl Movie {
    /// Creates a movie with the derived fields (`id`, `partitionKey`,
    /// `textSearch`) filled in consistently.
    #[must_use]
    pub fn new(movie_id: impl Into<String>, title: impl Into<String>) -> Self {
        let movie_id = movie_id.into();
        let title = title.into();
        Self {
            id: movie_id.clone(),
            partition_key: partition_key(&movie_id),
            movie_id,
            doc_type: DocType::Movie,
            text_search: title.to_lowercase(),
            title,
            year: None,
            runtime: None,
            rating: None,
            votes: None,
            total_score: None,
            genres: None,
            roles: None,
        }
    }

    /// Returns true when `textSearch` is the lowercased title.
    #[must_use]
    pub fn text_search_is_consistent(&self) -> bool {
        self.text_search == self.title.to_lowercase()
    }
}

/// Genre lookup document, keyed by the lowercased genre name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    /// Lowercased genre name.
    pub id: String,
    /// Canonical genre name as used in `Movie::genres`.
    pub genre: String,
    /// Partition key (always the default partition).
    pub partition_key: String,
    /// Document discriminator, always [`DocType::Genre`].
    #[serde(rename = "type")]
    pub doc_type: DocType,
}

impl Genre {
    /// Creates a genre document from its canonical name.
    #[must_use]
    pub fn new(genre: impl Into<String>) -> Self {
        let genre = genre.into();
        let id = genre.to_lowercase();
        Self {
            partition_key: partition_key(&id),
            id,
            genre,
            doc_type: DocType::Genre,
        }
    }
}

/// Featured-movie candidate with a selection weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedEntry {
    /// Candidate movie id.
    pub movie_id: String,
    /// Number of slots this movie occupies in the candidate list.
    ///
    /// Fractional weights are truncated; negative or missing weights count
    /// as zero.
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: u32,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let weight = Option::<f64>::deserialize(deserializer)?;
    Ok(match weight {
        Some(w) if w.is_finite() && w >= 1.0 => w.trunc().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    })
}
