//! HTTP-layer metrics, registered in the same process registry chaos-core
//! registers its experiment metrics in.

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests handled",
        &["method", "path", "status_code"]
    )
    .expect("failed to register http_requests_total")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"]
    )
    .expect("failed to register http_request_duration_seconds")
});

/// Replaces dynamic path segments (8-char experiment ids, `dry-` prefixed
/// ids) with a placeholder so per-request labels stay low-cardinality.
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .map(|part| {
            let is_short_id = part.len() == 8 && part.chars().all(|c| c.is_ascii_hexdigit() || c == '-');
            if is_short_id || part.starts_with("dry-") {
                "{id}".to_string()
            } else {
                part.to_string()
            }
        })
        .collect();
    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_short_hex_ids() {
        assert_eq!(normalize_path("/api/chaos/experiments/a1b2c3d4"), "/api/chaos/experiments/{id}");
    }

    #[test]
    fn normalizes_dry_run_ids() {
        assert_eq!(normalize_path("/api/chaos/experiments/dry-a1b2c3d4/rollback"), "/api/chaos/experiments/{id}/rollback");
    }

    #[test]
    fn leaves_static_segments_untouched() {
        assert_eq!(normalize_path("/api/chaos/experiments"), "/api/chaos/experiments");
    }
}
