//! Partition key derivation.
//!
//! Movies (`tt…`) and actors (`nm…`) are spread over ten logical partitions
//! keyed by the last decimal digit of their numeric id. Everything else
//! (genres, malformed ids) lives in partition `"0"`.

const ENTITY_PREFIXES: [&str; 2] = ["tt", "nm"];

/// Partition used for documents whose id carries no numeric entity suffix.
pub const DEFAULT_PARTITION: &str = "0";

/// Every partition key [`partition_key`] can produce.
pub const PARTITION_KEYS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Derives the partition key for a document id.
///
/// Never fails: malformed input degrades to [`DEFAULT_PARTITION`].
///
/// ```rust
/// use marquee_core::partition::partition_key;
///
/// assert_eq!(partition_key("tt0133093"), "3");
/// assert_eq!(partition_key("action"), "0");
/// ```
#[must_use]
pub fn partition_key(id: &str) -> String {
    if id.len() <= 5 {
        return DEFAULT_PARTITION.to_string();
    }

    let Some(suffix) = ENTITY_PREFIXES
        .iter()
        .find_map(|prefix| id.strip_prefix(prefix))
    else {
        return DEFAULT_PARTITION.to_string();
    };

    match suffix.parse::<u64>() {
        Ok(value) => (value % 10).to_string(),
        Err(_) => DEFAULT_PARTITION.to_string(),
    }
}
