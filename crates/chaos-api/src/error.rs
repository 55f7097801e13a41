use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use chaos_core::error::ChaosError;

/// Wraps the engine's error taxonomy for HTTP responses. Status codes match
/// the reference behavior: emergency stop is 503, unknown inputs are 400,
/// missing experiments are 404, everything else is 500.
pub struct ApiError(pub anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<ChaosError>() {
            Some(ChaosError::EmergencyStopActive) => StatusCode::SERVICE_UNAVAILABLE,
            Some(ChaosError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(ChaosError::UnknownChaosType(_))
            | Some(ChaosError::InvalidConfig(_))
            | Some(ChaosError::ConfirmationRequired { .. })
            | Some(ChaosError::BlastRadiusExceeded { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
