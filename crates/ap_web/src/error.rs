use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ap_core::Error;
use serde_json::json;

/// JSON error body `{"error": "..."}` with a status code
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Client-facing errors keep their message; anything else is logged and
    /// reported as `fallback`
    pub fn from_error(error: Error, fallback: &str) -> Self {
        match error {
            Error::InvalidInput(message) => Self::bad_request(message),
            Error::Unauthorized => Self::unauthorized(),
            Error::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            Error::Config(message) => {
                tracing::error!("Configuration error: {}", message);
                Self::internal(message)
            }
            other => {
                tracing::error!(error = %other, "{}", fallback);
                Self::internal(fallback)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = ApiError::from_error(Error::InvalidInput("No URL provided".into()), "Failed to analyze URL");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "No URL provided");

        let err = ApiError::from_error(Error::Config("Gemini API key not configured".into()), "x");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Gemini API key not configured");

        let err = ApiError::from_error(Error::Inference("boom".into()), "Failed to analyze image");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to analyze image");

        let err = ApiError::from_error(Error::Unauthorized, "x");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
