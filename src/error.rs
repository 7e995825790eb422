use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("Invalid track: {0}")]
    InvalidTrack(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Tracking session is no longer running")]
    SessionClosed,
}

impl TrackingError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, TrackingError::Provider(ProviderError::PermissionDenied))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error("Run not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::Tracking(TrackingError::Provider(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Tracking(err) if err.is_permission_denied() => {
                (StatusCode::FORBIDDEN, self.to_string())
            }
            AppError::Tracking(TrackingError::SessionClosed) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Tracking(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
