//! Document store metrics.
//!
//! Counts store calls and failures by operation. These complement the
//! structured logging done by [`crate::data_access`].

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Store call counter.
pub const STORE_CALLS: &str = "marquee_store_calls_total";

/// Store error counter.
pub const STORE_ERRORS: &str = "marquee_store_errors_total";

/// Store call duration histogram.
pub const STORE_CALL_DURATION: &str = "marquee_store_call_duration_seconds";

/// Registers all store metric descriptions.
///
/// Call this once at application startup after initializing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(STORE_CALLS, "Total document store calls");
    describe_counter!(STORE_ERRORS, "Total document store calls that failed");
    describe_histogram!(
        STORE_CALL_DURATION,
        "Duration of document store calls in seconds"
    );
}

/// Records a completed store call.
pub fn record_store_call(operation: &'static str, duration_secs: f64) {
    counter!(STORE_CALLS, "operation" => operation).increment(1);
    histogram!(STORE_CALL_DURATION, "operation" => operation).record(duration_secs);
}

/// Records a failed store call. `kind` is a short error class such as
/// `timeout` or `store`.
pub fn record_store_error(operation: &'static str, kind: &'static str) {
    counter!(STORE_ERRORS, "operation" => operation, "kind" => kind).increment(1);
}
