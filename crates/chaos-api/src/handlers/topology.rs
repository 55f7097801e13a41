use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use chaos_core::error::ChaosError;
use chaos_core::topology::InfraTopology;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/topology/{k8s|aws|combined}`. `combined` merges both graphs and
/// degrades gracefully if only one provider is configured; `k8s`/`aws`
/// 400 if their provider isn't wired up.
pub async fn get_topology(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let topology = match provider.as_str() {
        "k8s" => {
            let provider = state
                .k8s_topology
                .as_ref()
                .ok_or_else(|| ChaosError::InvalidConfig("k8s topology provider not configured".into()))?;
            provider.get_topology().await?
        }
        "aws" => {
            let provider = state
                .aws_topology
                .as_ref()
                .ok_or_else(|| ChaosError::InvalidConfig("aws topology provider not configured".into()))?;
            provider.get_topology().await?
        }
        "combined" => {
            let mut combined = InfraTopology::default();
            if let Some(provider) = &state.k8s_topology {
                combined = combined.merge(provider.get_topology().await.unwrap_or_default());
            }
            if let Some(provider) = &state.aws_topology {
                combined = combined.merge(provider.get_topology().await.unwrap_or_default());
            }
            combined
        }
        other => return Err(ChaosError::InvalidConfig(format!("unknown topology provider: {other}")).into()),
    };

    Ok(Json(topology))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn unknown_provider_is_rejected() {
        let state = Arc::new(test_state().await);
        let response = get_topology(State(state), Path("unknown".to_string())).await;
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn k8s_without_a_configured_provider_is_rejected() {
        let state = Arc::new(test_state().await);
        let response = get_topology(State(state), Path("k8s".to_string())).await;
        assert!(response.is_err());
    }

    #[tokio::test]
    async fn combined_degrades_to_an_empty_topology_with_no_providers_configured() {
        let state = Arc::new(test_state().await);
        let response = get_topology(State(state), Path("combined".to_string()))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
