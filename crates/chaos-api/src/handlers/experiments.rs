use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use chaos_core::experiment::ExperimentConfig;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn create_experiment(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ExperimentConfig>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.runner.run(config).await?;
    Ok(Json(record))
}

pub async fn dry_run_experiment(
    State(state): State<Arc<AppState>>,
    Json(mut config): Json<ExperimentConfig>,
) -> Result<impl IntoResponse, ApiError> {
    config.safety.dry_run = true;
    let record = state.dry_run_runner.run(config).await?;
    Ok(Json(record))
}

pub async fn list_experiments(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let records = state.store.list_experiments(100).await?;
    Ok(Json(records))
}

pub async fn get_experiment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .store
        .get_experiment(&id)
        .await?
        .ok_or_else(|| chaos_core::error::ChaosError::NotFound(id.clone()))?;
    Ok(Json(record))
}

pub async fn rollback_experiment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let results = state.runner.rollback(&id).await;
    Json(json!({ "experiment_id": id, "rollback_results": results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use chaos_core::experiment::{ChaosType, SafetyConfig, TargetSelector};

    fn config() -> ExperimentConfig {
        ExperimentConfig {
            name: "test".to_string(),
            chaos_type: ChaosType::PodDelete,
            target: TargetSelector {
                namespace: Some("default".to_string()),
                labels: None,
                resource_id: None,
            },
            parameters: Default::default(),
            safety: SafetyConfig::default(),
            probes: vec![],
            description: None,
        }
    }

    #[tokio::test]
    async fn create_with_unregistered_actuator_returns_unknown_chaos_type() {
        let state = Arc::new(test_state().await);
        let response = create_experiment(State(state), Json(config())).await;
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let state = Arc::new(test_state().await);
        let response = list_experiments(State(state)).await.unwrap().into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn get_missing_experiment_is_not_found() {
        let state = Arc::new(test_state().await);
        let response = get_experiment(State(state), Path("missing1".to_string())).await;
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn rollback_on_an_empty_stack_returns_empty_results() {
        let state = Arc::new(test_state().await);
        let response = rollback_experiment(State(state), Path("abc12345".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
