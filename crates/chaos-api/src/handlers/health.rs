use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "emergency_stop": state.emergency_stop.is_set(),
    }))
}

pub async fn trigger_emergency_stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.emergency_stop.trigger();
    Json(json!({ "status": "emergency_stop_triggered" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn health_reports_emergency_stop_state() {
        let state = Arc::new(test_state().await);
        let response = health(State(state.clone())).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        state.emergency_stop.trigger();
        let response = health(State(state)).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn trigger_sets_the_latch() {
        let state = Arc::new(test_state().await);
        assert!(!state.emergency_stop.is_set());
        trigger_emergency_stop(State(state.clone())).await;
        assert!(state.emergency_stop.is_set());
    }
}
