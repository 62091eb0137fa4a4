use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Message returned for requests that are not `text/csv`.
pub const UNSUPPORTED_MEDIA_TYPE_MESSAGE: &str = "This predictor only supports CSV data";

/// Main error type for the inference server
#[derive(Error, Debug)]
pub enum PropensityError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Model artifact errors
    #[error("Model unavailable: {0}")]
    ModelLoad(String),

    // Request errors
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    // Scoring errors
    #[error("Scoring failed: {0}")]
    Scoring(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for PropensityError
pub type Result<T> = std::result::Result<T, PropensityError>;

impl From<csv::Error> for PropensityError {
    fn from(err: csv::Error) -> Self {
        PropensityError::MalformedPayload(err.to_string())
    }
}

impl PropensityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PropensityError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PropensityError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            PropensityError::UnsupportedMediaType(_) => UNSUPPORTED_MEDIA_TYPE_MESSAGE.to_string(),
            other => other.to_string(),
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_errors_are_client_errors() {
        let err = PropensityError::UnsupportedMediaType("application/json".to_string());
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn everything_else_is_a_server_error() {
        let errors = [
            PropensityError::ModelLoad("missing".to_string()),
            PropensityError::MalformedPayload("ragged".to_string()),
            PropensityError::FeatureMismatch("age".to_string()),
            PropensityError::Scoring("nan".to_string()),
        ];
        for err in errors {
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
