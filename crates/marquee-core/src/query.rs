//! Query construction and paging.
//!
//! Validated searches are turned into a [`QuerySpec`]: a document type, a list
//! of filter predicates, an ordering that yields a total order, and an
//! offset/limit window. A query can be rendered to the document store's SQL
//! dialect with [`QuerySpec::to_sql`] or evaluated directly against JSON
//! documents (used by the in-memory store).
//!
//! Building a query never touches the store and cannot fail.

use std::cmp::Ordering;
use std::fmt::Write as _;

use serde_json::Value;

use crate::model::DocType;
use crate::validation::{ActorQuery, MovieQuery, Paging};

/// Page size used when none (or a non-positive one) was requested.
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// Largest page size a query may return.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of documents to skip.
    pub offset: u64,
    /// Maximum number of documents to return.
    pub limit: u64,
}

/// Normalises requested paging into an offset/limit window.
///
/// The page size falls back to [`DEFAULT_PAGE_SIZE`] when absent or below 1
/// and is capped at [`MAX_PAGE_SIZE`]. The 1-based page number is converted
/// to a zero-based page first and then clamped at zero, so any page number
/// of 1 or less starts at offset 0.
#[must_use]
pub fn condition_pages(paging: Paging) -> Page {
    let size = match paging.page_size {
        Some(size) if size >= 1 => size.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    };
    let page = paging.page_number.unwrap_or(1).saturating_sub(1).max(0);

    Page {
        offset: u64::try_from(page.saturating_mul(size)).unwrap_or(0),
        limit: u64::try_from(size).unwrap_or(0),
    }
}

/// A single filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `textSearch` contains the (already lowercased) term.
    TextContains(String),
    /// `year` equals the value.
    YearEquals(i32),
    /// `rating` is at least the value.
    RatingAtLeast(f64),
    /// `roles` contains an entry for the actor.
    HasActor(String),
    /// `genres` contains the canonical genre name.
    HasGenre(String),
}

impl Filter {
    fn write_sql(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            Self::TextContains(term) => {
                write!(out, "contains(m.textSearch, {})", sql_string(term))
            }
            Self::YearEquals(year) => write!(out, "m.year = {year}"),
            Self::RatingAtLeast(rating) => write!(out, "m.rating >= {rating}"),
            Self::HasActor(actor_id) => write!(
                out,
                "array_contains(m.roles, {{actorId: {}}}, true)",
                sql_string(actor_id)
            ),
            Self::HasGenre(genre) => {
                write!(out, "array_contains(m.genres, {})", sql_string(genre))
            }
        };
    }

    /// Evaluates the predicate against a stored document.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Self::TextContains(term) => doc
                .get("textSearch")
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(term.as_str())),
            Self::YearEquals(year) => {
                doc.get("year").and_then(Value::as_i64) == Some(i64::from(*year))
            }
            Self::RatingAtLeast(rating) => doc
                .get("rating")
                .and_then(Value::as_f64)
                .is_some_and(|r| r >= *rating),
            Self::HasActor(actor_id) => array_field(doc, "roles").any(|role| {
                role.get("actorId").and_then(Value::as_str) == Some(actor_id.as_str())
            }),
            Self::HasGenre(genre) => {
                array_field(doc, "genres").any(|g| g.as_str() == Some(genre.as_str()))
            }
        }
    }
}

/// A fully built query against one document type.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Document type to select.
    pub doc_type: DocType,
    /// Predicates combined with `and`.
    pub filters: Vec<Filter>,
    /// Fields to sort by, ascending, in priority order.
    pub order_by: Vec<&'static str>,
    /// Window to return; `None` returns every match.
    pub page: Option<Page>,
}

impl QuerySpec {
    /// Creates an unfiltered, unordered, unpaged query for `doc_type`.
    #[must_use]
    pub fn new(doc_type: DocType) -> Self {
        Self {
            doc_type,
            filters: Vec::new(),
            order_by: Vec::new(),
            page: None,
        }
    }

    /// Renders the query in the document store's SQL dialect.
    ///
    /// String values are embedded as quoted literals with single quotes and
    /// backslashes doubled, so user input cannot terminate the literal.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "select * from m where m.type = {}",
            sql_string(self.doc_type.as_str())
        );
        for filter in &self.filters {
            sql.push_str(" and ");
            filter.write_sql(&mut sql);
        }
        if !self.order_by.is_empty() {
            let fields: Vec<String> = self.order_by.iter().map(|f| format!("m.{f}")).collect();
            sql.push_str(" order by ");
            sql.push_str(&fields.join(", "));
        }
        if let Some(page) = self.page {
            let _ = write!(sql, " offset {} limit {}", page.offset, page.limit);
        }
        sql
    }

    /// Returns true when `doc` has this query's type and passes every filter.
    #[must_use]
    pub fn matches(&self, doc: &Value) -> bool {
        doc.get("type").and_then(Value::as_str) == Some(self.doc_type.as_str())
            && self.filters.iter().all(|filter| filter.matches(doc))
    }

    /// Orders two documents by this query's sort fields.
    #[must_use]
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.order_by
            .iter()
            .map(|field| compare_values(a.get(*field), b.get(*field)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Applies filters, ordering and the page window to `docs`.
    #[must_use]
    pub fn evaluate<'a, I>(&self, docs: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut matched: Vec<&Value> = docs.into_iter().filter(|d| self.matches(d)).collect();
        if !self.order_by.is_empty() {
            matched.sort_by(|a, b| self.compare(a, b));
        }

        let (skip, take) = self.page.map_or((0, usize::MAX), |page| {
            (
                usize::try_from(page.offset).unwrap_or(usize::MAX),
                usize::try_from(page.limit).unwrap_or(usize::MAX),
            )
        });
        matched.into_iter().skip(skip).take(take).cloned().collect()
    }
}

/// Builds the actor search query.
#[must_use]
pub fn build_actor_query(query: &ActorQuery) -> QuerySpec {
    let mut spec = QuerySpec::new(DocType::Actor);
    if let Some(term) = normalize_search(query.q.as_deref()) {
        spec.filters.push(Filter::TextContains(term));
    }
    spec.order_by = vec!["textSearch", "actorId"];
    spec.page = Some(condition_pages(query.paging));
    spec
}

/// Builds the movie search query.
///
/// `genre` is the canonical genre name already resolved from the requested
/// one; the requested value in `query.genre` is not used directly.
#[must_use]
pub fn build_movie_query(query: &MovieQuery, genre: Option<&str>) -> QuerySpec {
    let mut spec = QuerySpec::new(DocType::Movie);
    if let Some(term) = normalize_search(query.q.as_deref()) {
        spec.filters.push(Filter::TextContains(term));
    }
    if let Some(year) = query.year {
        spec.filters.push(Filter::YearEquals(year));
    }
    if let Some(rating) = query.rating {
        spec.filters.push(Filter::RatingAtLeast(rating));
    }
    if let Some(actor_id) = query.actor_id.as_deref() {
        spec.filters
            .push(Filter::HasActor(actor_id.trim().to_lowercase()));
    }
    if let Some(genre) = genre {
        spec.filters.push(Filter::HasGenre(genre.to_string()));
    }
    spec.order_by = vec!["textSearch", "movieId"];
    spec.page = Some(condition_pages(query.paging));
    spec
}

/// Builds the query listing every genre document, ordered by id.
#[must_use]
pub fn genres_query() -> QuerySpec {
    let mut spec = QuerySpec::new(DocType::Genre);
    spec.order_by = vec!["id"];
    spec
}

/// Builds the query listing every featured-movie candidate.
#[must_use]
pub fn featured_query() -> QuerySpec {
    QuerySpec::new(DocType::Featured)
}

/// Trims and lowercases a search term; blank terms produce no filter.
#[must_use]
pub fn normalize_search(q: Option<&str>) -> Option<String> {
    let term = q?.trim().to_lowercase();
    if term.is_empty() { None } else { Some(term) }
}

/// Quotes `value` as a SQL string literal.
#[must_use]
pub fn sql_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\'' => quoted.push_str("''"),
            '\\' => quoted.push_str("\\\\"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn array_field<'a>(doc: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    doc.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

// Undefined < null < bool < number < string, matching the store's ordering.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_) | Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
