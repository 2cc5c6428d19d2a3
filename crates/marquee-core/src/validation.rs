//! Query parameter validation.
//!
//! Raw query-string values arrive as [`QueryParams`] and leave either as a
//! typed query ([`ActorQuery`], [`MovieQuery`]) or as a list of
//! [`ValidationError`]s. Two aggregation policies exist side by side:
//!
//! - [`validate_common`] stops at the first failing field and reports a single
//!   message.
//! - [`validate_actor_query`] and [`validate_movie_query`] check every field
//!   and accumulate all failures, which is what the HTTP surface returns.
//!
//! Direct id lookups ([`validate_movie_id`], [`validate_actor_id`]) check a
//! single value and report one fixed message.
//!
//! Nothing in this module performs I/O or panics.

use std::fmt;

use chrono::Datelike;
use serde::Serialize;

/// Error code attached to every field-level validation failure.
pub const INVALID_VALUE: &str = "InvalidValue";

/// Earliest release year accepted by the `year` filter.
pub const MIN_YEAR: i32 = 1874;
/// How many years past the current year the `year` filter accepts.
pub const YEAR_LOOKAHEAD: i32 = 5;

const Q_LEN: (usize, usize) = (2, 20);
const GENRE_LEN: (usize, usize) = (3, 20);
const PAGE_NUMBER_RANGE: (i64, i64) = (1, 10_000);
const PAGE_SIZE_RANGE: (i64, i64) = (1, 1000);
const RATING_RANGE: (f64, f64) = (0.0, 10.0);
const ID_LEN: (usize, usize) = (7, 11);

const MOVIE_ID_PREFIX: &str = "tt";
const ACTOR_ID_PREFIX: &str = "nm";

const Q_MESSAGE: &str = "The parameter 'q' should be between 2 and 20 characters.";
const PAGE_NUMBER_MESSAGE: &str = "The parameter 'pageNumber' should be between 1 and 10000.";
const PAGE_SIZE_MESSAGE: &str = "The parameter 'pageSize' should be between 1 and 1000.";
const GENRE_MESSAGE: &str = "The parameter 'genre' should be between 3 and 20 characters.";
const RATING_MESSAGE: &str = "The parameter 'rating' should be between 0.0 and 10.0.";
/// Message reported for every malformed movie id.
pub const MOVIE_ID_MESSAGE: &str =
    "The parameter 'movieId' should start with 'tt' and be between 7 and 11 characters in total.";
/// Message reported for every malformed actor id.
pub const ACTOR_ID_MESSAGE: &str =
    "The parameter 'actorId' should start with 'nm' and be between 7 and 11 characters in total.";

// ============================================================================
// Raw parameters
// ============================================================================

/// Raw query-string parameters for the collection endpoints.
///
/// A field is `Some` whenever its key was present in the query string, even
/// when the value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    /// Free-text search.
    pub q: Option<String>,
    /// 1-based page number.
    pub page_number: Option<String>,
    /// Page size.
    pub page_size: Option<String>,
    /// Genre name (movies only).
    pub genre: Option<String>,
    /// Release year (movies only).
    pub year: Option<String>,
    /// Minimum rating (movies only).
    pub rating: Option<String>,
    /// Actor id the movie must credit (movies only).
    pub actor_id: Option<String>,
}

impl QueryParams {
    /// Builds parameters from decoded query-string pairs.
    ///
    /// Keys match case-insensitively; unknown keys are ignored and the last
    /// occurrence of a repeated key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref().to_ascii_lowercase().as_str() {
                "q" => &mut params.q,
                "pagenumber" => &mut params.page_number,
                "pagesize" => &mut params.page_size,
                "genre" => &mut params.genre,
                "year" => &mut params.year,
                "rating" => &mut params.rating,
                "actorid" => &mut params.actor_id,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }
}

// ============================================================================
// Results
// ============================================================================

/// Outcome of a single-field or short-circuiting validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidation {
    /// Whether the value passed.
    pub validated: bool,
    /// Failure message, absent when `validated` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldValidation {
    /// A passing result.
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            validated: true,
            message: None,
        }
    }

    /// A failing result with the given message.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            validated: false,
            message: Some(message.into()),
        }
    }
}

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Stable error code (always [`INVALID_VALUE`] today).
    pub code: &'static str,
    /// Name of the offending query-string parameter.
    pub target: &'static str,
    /// Human-readable description of the constraint.
    pub message: String,
}

/// Ordered list of violated constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty error list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error list holding a single error.
    #[must_use]
    pub fn single(target: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(target, message);
        errors
    }

    /// Appends an error for `target`.
    pub fn push(&mut self, target: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            code: INVALID_VALUE,
            target,
            message: message.into(),
        });
    }

    /// Records `result` against `target` when it failed.
    fn record(&mut self, target: &'static str, result: FieldValidation) {
        if result.validated {
            return;
        }
        if let Some(message) = result.message {
            self.push(target, message);
        }
    }

    /// Returns true when no constraint was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of violated constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates over the errors in the order they were found.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// The errors as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns the names of the offending parameters, in order.
    #[must_use]
    pub fn targets(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.target).collect()
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.target, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Typed queries
// ============================================================================

/// Paging values exactly as requested (not yet clamped).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    /// Requested 1-based page number.
    pub page_number: Option<i64>,
    /// Requested page size.
    pub page_size: Option<i64>,
}

/// Validated actor search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorQuery {
    /// Free-text search.
    pub q: Option<String>,
    /// Requested paging.
    pub paging: Paging,
}

impl ActorQuery {
    /// Search by name with default paging.
    #[must_use]
    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }
}

/// Validated movie search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieQuery {
    /// Free-text search.
    pub q: Option<String>,
    /// Genre name as supplied (resolved to its canonical form at query time).
    pub genre: Option<String>,
    /// Exact release year.
    pub year: Option<i32>,
    /// Minimum rating.
    pub rating: Option<f64>,
    /// Actor that must be credited.
    pub actor_id: Option<String>,
    /// Requested paging.
    pub paging: Paging,
}

impl MovieQuery {
    /// Search by title with default paging.
    #[must_use]
    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }
}

// ============================================================================
// Field validators
// ============================================================================

/// Validates the free-text search term.
#[must_use]
pub fn validate_q(q: Option<&str>) -> FieldValidation {
    match q {
        Some(q) if !char_len_within(q, Q_LEN) => FieldValidation::invalid(Q_MESSAGE),
        _ => FieldValidation::valid(),
    }
}

/// Validates the 1-based page number.
///
/// The value must be an integer written in canonical form (`"01"` is
/// rejected) between 1 and 10000.
#[must_use]
pub fn validate_page_number(page_number: Option<&str>) -> FieldValidation {
    let Some(raw) = page_number else {
        return FieldValidation::valid();
    };
    match raw.parse::<i64>() {
        Ok(n) if n.to_string() == raw && within(n, PAGE_NUMBER_RANGE) => FieldValidation::valid(),
        _ => FieldValidation::invalid(PAGE_NUMBER_MESSAGE),
    }
}

/// Validates the page size.
#[must_use]
pub fn validate_page_size(page_size: Option<&str>) -> FieldValidation {
    let Some(raw) = page_size else {
        return FieldValidation::valid();
    };
    match raw.parse::<i64>() {
        Ok(n) if within(n, PAGE_SIZE_RANGE) => FieldValidation::valid(),
        _ => FieldValidation::invalid(PAGE_SIZE_MESSAGE),
    }
}

/// Validates the genre filter.
///
/// A present-but-empty value is invalid.
#[must_use]
pub fn validate_genre(genre: Option<&str>) -> FieldValidation {
    match genre {
        Some(genre) if !char_len_within(genre, GENRE_LEN) => FieldValidation::invalid(GENRE_MESSAGE),
        _ => FieldValidation::valid(),
    }
}

/// Validates the release-year filter against `current_year`.
#[must_use]
pub fn validate_year(year: Option<&str>, current_year: i32) -> FieldValidation {
    let Some(raw) = year else {
        return FieldValidation::valid();
    };
    let max = current_year + YEAR_LOOKAHEAD;
    match raw.parse::<i32>() {
        Ok(y) if (MIN_YEAR..=max).contains(&y) => FieldValidation::valid(),
        _ => FieldValidation::invalid(format!(
            "The parameter 'year' should be between {MIN_YEAR} and {max}."
        )),
    }
}

/// Validates the minimum-rating filter.
#[must_use]
pub fn validate_rating(rating: Option<&str>) -> FieldValidation {
    let Some(raw) = rating else {
        return FieldValidation::valid();
    };
    match raw.parse::<f64>() {
        Ok(r) if r.is_finite() && r >= RATING_RANGE.0 && r <= RATING_RANGE.1 => {
            FieldValidation::valid()
        }
        _ => FieldValidation::invalid(RATING_MESSAGE),
    }
}

/// Validates a movie id (`tt` followed by digits, 7 to 11 characters).
#[must_use]
pub fn validate_movie_id(id: &str) -> FieldValidation {
    if is_entity_id(id, MOVIE_ID_PREFIX) {
        FieldValidation::valid()
    } else {
        FieldValidation::invalid(MOVIE_ID_MESSAGE)
    }
}

/// Validates an actor id (`nm` followed by digits, 7 to 11 characters).
#[must_use]
pub fn validate_actor_id(id: &str) -> FieldValidation {
    if is_entity_id(id, ACTOR_ID_PREFIX) {
        FieldValidation::valid()
    } else {
        FieldValidation::invalid(ACTOR_ID_MESSAGE)
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Validates `q`, `pageNumber` and `pageSize`, stopping at the first failure.
#[must_use]
pub fn validate_common(params: &QueryParams) -> FieldValidation {
    [
        validate_q(params.q.as_deref()),
        validate_page_number(params.page_number.as_deref()),
        validate_page_size(params.page_size.as_deref()),
    ]
    .into_iter()
    .find(|result| !result.validated)
    .unwrap_or_else(FieldValidation::valid)
}

/// Validates an actor search, accumulating every failure.
///
/// # Errors
///
/// Returns every violated constraint, in parameter order.
pub fn validate_actor_query(params: &QueryParams) -> Result<ActorQuery, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.record("q", validate_q(params.q.as_deref()));
    let paging = validate_paging(params, &mut errors);

    errors.into_result(ActorQuery {
        q: params.q.clone(),
        paging,
    })
}

/// Validates a movie search against the current calendar year.
///
/// # Errors
///
/// Returns every violated constraint, in parameter order.
pub fn validate_movie_query(params: &QueryParams) -> Result<MovieQuery, ValidationErrors> {
    validate_movie_query_at(params, chrono::Utc::now().year())
}

/// Validates a movie search, accumulating every failure.
///
/// `current_year` bounds the `year` filter.
///
/// # Errors
///
/// Returns every violated constraint, in parameter order.
pub fn validate_movie_query_at(
    params: &QueryParams,
    current_year: i32,
) -> Result<MovieQuery, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.record("q", validate_q(params.q.as_deref()));
    let paging = validate_paging(params, &mut errors);
    errors.record("genre", validate_genre(params.genre.as_deref()));

    let year = params.year.as_deref();
    errors.record("year", validate_year(year, current_year));
    let rating = params.rating.as_deref();
    errors.record("rating", validate_rating(rating));

    if let Some(actor_id) = params.actor_id.as_deref() {
        errors.record("actorId", validate_actor_id(actor_id));
    }

    errors.into_result(MovieQuery {
        q: params.q.clone(),
        genre: params.genre.clone(),
        year: year.and_then(|y| y.parse().ok()),
        rating: rating.and_then(|r| r.parse().ok()),
        actor_id: params.actor_id.clone(),
        paging,
    })
}

fn validate_paging(params: &QueryParams, errors: &mut ValidationErrors) -> Paging {
    let page_number = params.page_number.as_deref();
    let page_size = params.page_size.as_deref();
    errors.record("pageNumber", validate_page_number(page_number));
    errors.record("pageSize", validate_page_size(page_size));
    Paging {
        page_number: page_number.and_then(|n| n.parse().ok()),
        page_size: page_size.and_then(|n| n.parse().ok()),
    }
}

fn is_entity_id(id: &str, prefix: &str) -> bool {
    if !(ID_LEN.0..=ID_LEN.1).contains(&id.len()) {
        return false;
    }
    let Some(suffix) = id.strip_prefix(prefix) else {
        return false;
    };
    suffix.bytes().all(|b| b.is_ascii_digit()) && suffix.parse::<u32>().is_ok_and(|n| n > 0)
}

fn char_len_within(value: &str, (min, max): (usize, usize)) -> bool {
    (min..=max).contains(&value.chars().count())
}

fn within(value: i64, (min, max): (i64, i64)) -> bool {
    (min..=max).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn movie_ids() {
        assert!(validate_movie_id("tt333344").validated);
        assert!(validate_movie_id("tt0133093").validated);

        for bad in ["TT333344", "nm333344", "tt", "tttttttttttt", "ttabcdef", "tt000000"] {
            let result = validate_movie_id(bad);
            assert!(!result.validated, "{bad} should be rejected");
            assert_eq!(result.message.as_deref(), Some(MOVIE_ID_MESSAGE));
        }
    }

    #[test]
    fn actor_ids() {
        assert!(validate_actor_id("nm333344").validated);

        for bad in ["NM333344", "tt333344", "nm", "nmnmnmnmnmnm", "nmabcdef", "nm12 456"] {
            let result = validate_actor_id(bad);
            assert!(!result.validated, "{bad} should be rejected");
            assert_eq!(result.message.as_deref(), Some(ACTOR_ID_MESSAGE));
        }
    }

    #[test]
    fn common_accepts_empty_params() {
        let result = validate_common(&QueryParams::default());
        assert!(result.validated);
        assert!(result.message.is_none());
    }

    #[test]
    fn common_rejects_each_field() {
        assert!(!validate_common(&params(&[("q", "a")])).validated);
        assert!(!validate_common(&params(&[("pageNumber", "0")])).validated);
        assert!(!validate_common(&params(&[("pageSize", "2000")])).validated);
        assert!(validate_common(&params(&[("q", "ring"), ("pageSize", "10")])).validated);
    }

    #[test]
    fn common_stops_at_first_failure() {
        let result = validate_common(&params(&[("q", "a"), ("pageNumber", "0")]));
        assert_eq!(result.message.as_deref(), Some(Q_MESSAGE));

        let result = validate_common(&params(&[("pageSize", "0"), ("pageNumber", "0")]));
        assert_eq!(result.message.as_deref(), Some(PAGE_NUMBER_MESSAGE));
    }

    #[test]
    fn page_number_must_round_trip() {
        assert!(validate_page_number(Some("10000")).validated);
        assert!(!validate_page_number(Some("10001")).validated);
        assert!(!validate_page_number(Some("01")).validated);
        assert!(!validate_page_number(Some("1.5")).validated);
        assert!(!validate_page_number(Some("")).validated);
    }

    #[test]
    fn movie_query_field_examples() {
        assert!(validate_movie_query_at(&params(&[("genre", "action")]), 2026).is_ok());
        assert!(validate_movie_query_at(&params(&[("year", "3060")]), 2026).is_err());
        assert!(validate_movie_query_at(&params(&[("rating", "12.34")]), 2026).is_err());
        assert!(validate_movie_query_at(&params(&[("actorId", "actor")]), 2026).is_err());
    }

    #[test]
    fn movie_query_year_window_follows_current_year() {
        assert!(validate_movie_query_at(&params(&[("year", "1874")]), 2026).is_ok());
        assert!(validate_movie_query_at(&params(&[("year", "1873")]), 2026).is_err());
        assert!(validate_movie_query_at(&params(&[("year", "2031")]), 2026).is_ok());

        let errors = validate_movie_query_at(&params(&[("year", "2032")]), 2026).unwrap_err();
        let message = &errors.iter().next().unwrap().message;
        assert_eq!(message, "The parameter 'year' should be between 1874 and 2031.");
    }

    #[test]
    fn rating_rejects_non_finite_values() {
        assert!(validate_rating(Some("0")).validated);
        assert!(validate_rating(Some("10.0")).validated);
        assert!(!validate_rating(Some("NaN")).validated);
        assert!(!validate_rating(Some("inf")).validated);
        assert!(!validate_rating(Some("-0.1")).validated);
    }

    #[test]
    fn present_but_empty_genre_is_invalid() {
        let errors = validate_movie_query_at(&params(&[("genre", "")]), 2026).unwrap_err();
        assert_eq!(errors.targets(), vec!["genre"]);
    }

    #[test]
    fn movie_query_accumulates_every_error_in_order() {
        let errors = validate_movie_query_at(
            &params(&[
                ("actorId", "actor"),
                ("rating", "12.34"),
                ("year", "3060"),
                ("genre", "ab"),
                ("pageSize", "0"),
                ("pageNumber", "0"),
                ("q", "a"),
            ]),
            2026,
        )
        .unwrap_err();

        assert_eq!(
            errors.targets(),
            vec![
                "q",
                "pageNumber",
                "pageSize",
                "genre",
                "year",
                "rating",
                "actorId"
            ]
        );
        assert!(errors.iter().all(|e| e.code == INVALID_VALUE));
    }

    #[test]
    fn movie_query_produces_typed_values() {
        let query = validate_movie_query_at(
            &params(&[
                ("q", "ring"),
                ("genre", "Action"),
                ("year", "2001"),
                ("rating", "8.5"),
                ("actorid", "nm0000173"),
                ("pagenumber", "2"),
                ("PageSize", "25"),
            ]),
            2026,
        )
        .unwrap();

        assert_eq!(query.q.as_deref(), Some("ring"));
        assert_eq!(query.year, Some(2001));
        assert_eq!(query.rating, Some(8.5));
        assert_eq!(query.actor_id.as_deref(), Some("nm0000173"));
        assert_eq!(
            query.paging,
            Paging {
                page_number: Some(2),
                page_size: Some(25)
            }
        );
    }

    #[test]
    fn actor_query_ignores_movie_filters() {
        let query = validate_actor_query(&params(&[("q", "nicole"), ("year", "bogus")])).unwrap();
        assert_eq!(query, ActorQuery::search("nicole"));
    }

    #[test]
    fn actor_query_accumulates_paging_and_search_errors() {
        let errors = validate_actor_query(&params(&[
            ("q", "x"),
            ("pageNumber", "abc"),
            ("pageSize", "5000"),
        ]))
        .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.targets(), vec!["q", "pageNumber", "pageSize"]);
    }

    #[test]
    fn repeated_keys_keep_last_value() {
        let params = params(&[("q", "first"), ("Q", "second"), ("other", "x")]);
        assert_eq!(params.q.as_deref(), Some("second"));
    }

    #[test]
    fn search_length_counts_characters() {
        assert!(validate_q(Some("éé")).validated);
        assert!(!validate_q(Some("é")).validated);
        assert!(!validate_q(Some("abcdefghijklmnopqrstu")).validated);
    }
}
