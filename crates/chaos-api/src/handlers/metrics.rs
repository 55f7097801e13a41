use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, TextEncoder};

/// `GET /metrics`. Exposes the process-wide Prometheus registry: chaos-core's
/// experiment counters/histograms and this crate's HTTP counters share one
/// registry, so a single scrape covers both.
pub async fn get_metrics() -> Response {
    let metric_families = prometheus::gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposes_text_format_metrics() {
        let response = get_metrics().await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
