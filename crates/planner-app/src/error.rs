use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use planner_core::CoreError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApiError {
    MissingToken,
    NoActiveSprint,
    Core(CoreError),
}

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        Self::Core(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::UNAUTHORIZED,
            Self::NoActiveSprint => StatusCode::NOT_FOUND,
            Self::Core(CoreError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::Core(CoreError::Configuration(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Core(CoreError::DependencyUnavailable(_) | CoreError::InvalidInput(_)) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::MissingToken => json!({
                "error": "No Jira access token provided",
                "logout": true,
            }),
            Self::Core(CoreError::Unauthorized(_)) => json!({
                "error": "Jira rejected the access token",
                "logout": true,
            }),
            Self::NoActiveSprint => json!({ "error": "No active sprint found" }),
            Self::Core(CoreError::Configuration(message)) => {
                error!(error = %message, "sprint planner is misconfigured");
                json!({ "error": message })
            }
            Self::Core(other) => {
                warn!(error = %other, "upstream request failed");
                json!({ "error": other.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
