//! Small built-in catalog for local development and tests.
//!
//! Includes every document the health-check battery looks up, so a server
//! running against [`crate::store::MemoryDocumentStore::with_sample_catalog`]
//! reports `pass`.

use serde_json::{Value, json};

use crate::model::{Actor, Genre, Movie, MovieRef, Role};

const GENRES: [&str; 8] = [
    "Action", "Adventure", "Comedy", "Drama", "Fantasy", "Horror", "Mystery", "Sci-Fi",
];

struct MovieRow {
    id: &'static str,
    title: &'static str,
    year: i32,
    runtime: u32,
    rating: f64,
    votes: u64,
    genres: &'static [&'static str],
    cast: &'static [(&'static str, &'static str, &'static str)],
}

const MOVIES: [MovieRow; 7] = [
    MovieRow {
        id: "tt0133093",
        title: "The Matrix",
        year: 1999,
        runtime: 136,
        rating: 8.7,
        votes: 1_900_000,
        genres: &["Action", "Sci-Fi"],
        cast: &[
            ("nm0000206", "Keanu Reeves", "Neo"),
            ("nm0000401", "Laurence Fishburne", "Morpheus"),
        ],
    },
    MovieRow {
        id: "tt0120737",
        title: "The Lord of the Rings: The Fellowship of the Ring",
        year: 2001,
        runtime: 178,
        rating: 8.8,
        votes: 1_800_000,
        genres: &["Action", "Adventure", "Drama", "Fantasy"],
        cast: &[
            ("nm0000704", "Elijah Wood", "Frodo"),
            ("nm0005212", "Ian McKellen", "Gandalf"),
        ],
    },
    MovieRow {
        id: "tt0167261",
        title: "The Lord of the Rings: The Two Towers",
        year: 2002,
        runtime: 179,
        rating: 8.7,
        votes: 1_600_000,
        genres: &["Action", "Adventure", "Drama", "Fantasy"],
        cast: &[
            ("nm0000704", "Elijah Wood", "Frodo"),
            ("nm0005212", "Ian McKellen", "Gandalf"),
        ],
    },
    MovieRow {
        id: "tt0298130",
        title: "The Ring",
        year: 2002,
        runtime: 115,
        rating: 7.1,
        votes: 360_000,
        genres: &["Horror", "Mystery"],
        cast: &[("nm0915208", "Naomi Watts", "Rachel Keller")],
    },
    MovieRow {
        id: "tt0230600",
        title: "The Others",
        year: 2001,
        runtime: 101,
        rating: 7.6,
        votes: 370_000,
        genres: &["Horror", "Mystery"],
        cast: &[("nm0000173", "Nicole Kidman", "Grace Stewart")],
    },
    MovieRow {
        id: "tt0203009",
        title: "Moulin Rouge!",
        year: 2001,
        runtime: 127,
        rating: 7.6,
        votes: 290_000,
        genres: &["Drama"],
        cast: &[
            ("nm0000173", "Nicole Kidman", "Satine"),
            ("nm0000191", "Ewan McGregor", "Christian"),
        ],
    },
    MovieRow {
        id: "tt0118971",
        title: "The Devil's Advocate",
        year: 1997,
        runtime: 144,
        rating: 7.5,
        votes: 370_000,
        genres: &["Drama", "Mystery"],
        cast: &[("nm0000206", "Keanu Reeves", "Kevin Lomax")],
    },
];

const ACTORS: [(&str, &str, i32); 7] = [
    ("nm0000173", "Nicole Kidman", 1967),
    ("nm0000191", "Ewan McGregor", 1971),
    ("nm0000206", "Keanu Reeves", 1964),
    ("nm0000401", "Laurence Fishburne", 1961),
    ("nm0000704", "Elijah Wood", 1981),
    ("nm0005212", "Ian McKellen", 1939),
    ("nm0915208", "Naomi Watts", 1968),
];

const FEATURED: [(&str, u32); 3] = [("tt0133093", 3), ("tt0120737", 2), ("tt0230600", 1)];

/// Returns every sample document as stored JSON.
#[must_use]
pub fn catalog() -> Vec<Value> {
    let mut docs = Vec::new();
    docs.extend(GENRES.iter().map(|g| to_value(&Genre::new(*g))));
    docs.extend(MOVIES.iter().map(|row| to_value(&movie(row))));
    docs.extend(ACTORS.iter().map(|(id, name, born)| {
        let mut actor = Actor::new(*id, *name);
        actor.birth_year = Some(*born);
        actor.profession = Some(vec!["actor".to_string()]);
        let movies: Vec<MovieRef> = MOVIES
            .iter()
            .filter(|row| row.cast.iter().any(|(actor_id, _, _)| actor_id == id))
            .map(|row| MovieRef {
                movie_id: row.id.to_string(),
                title: row.title.to_string(),
                year: Some(row.year),
            })
            .collect();
        actor.movies = Some(movies);
        to_value(&actor)
    }));
    docs.extend(FEATURED.iter().map(|(movie_id, weight)| {
        json!({
            "id": format!("featured-{movie_id}"),
            "partitionKey": "0",
            "type": "Featured",
            "movieId": movie_id,
            "weight": weight,
        })
    }));
    docs
}

fn movie(row: &MovieRow) -> Movie {
    let mut movie = Movie::new(row.id, row.title);
    movie.year = Some(row.year);
    movie.runtime = Some(row.runtime);
    movie.rating = Some(row.rating);
    movie.votes = Some(row.votes);
    #[allow(clippy::cast_precision_loss)]
    let total = row.rating * row.votes as f64;
    movie.total_score = Some(total.round());
    movie.genres = Some(row.genres.iter().map(|g| (*g).to_string()).collect());
    movie.roles = Some(
        row.cast
            .iter()
            .zip(1..)
            .map(|((actor_id, name, character), order)| Role {
                actor_id: (*actor_id).to_string(),
                name: (*name).to_string(),
                order: Some(order),
                category: Some("actor".to_string()),
                characters: Some(vec![(*character).to_string()]),
            })
            .collect(),
    );
    movie
}

// The model types serialize to plain JSON objects.
fn to_value<T: serde::Serialize>(doc: &T) -> Value {
    serde_json::to_value(doc).unwrap_or(Value::Null)
}
