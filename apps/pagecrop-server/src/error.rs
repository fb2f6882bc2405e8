//! Error types for the pagecrop server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pagecrop_core::PageCropError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid crop: {0}")]
    InvalidCrop(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Transform failed: {0}")]
    TransformFailed(String),

    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Rasterization failed: {0}")]
    RasterizeFailed(String),

    #[error("Operation timeout after {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::InvalidCrop(_) => (StatusCode::BAD_REQUEST, "INVALID_CROP"),
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::UnreadableDocument(_) => {
                (StatusCode::BAD_REQUEST, "UNREADABLE_DOCUMENT")
            }
            ServerError::TransformFailed(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "TRANSFORM_ERROR")
            }
            ServerError::ConversionFailed(_) => (StatusCode::BAD_GATEWAY, "CONVERSION_FAILURE"),
            ServerError::RasterizeFailed(_) => (StatusCode::BAD_GATEWAY, "RASTERIZE_FAILURE"),
            ServerError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            ServerError::Timeout(ms) => format!("Operation timeout after {}ms", ms),
            ServerError::InvalidCrop(msg)
            | ServerError::InvalidRequest(msg)
            | ServerError::UnreadableDocument(msg)
            | ServerError::TransformFailed(msg)
            | ServerError::ConversionFailed(msg)
            | ServerError::RasterizeFailed(msg)
            | ServerError::Internal(msg) => msg.clone(),
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PageCropError> for ServerError {
    fn from(err: PageCropError) -> Self {
        let message = err.to_string();
        match err {
            PageCropError::InvalidCrop { .. } => ServerError::InvalidCrop(message),
            PageCropError::InvalidScale(_) | PageCropError::Image(_) => {
                ServerError::InvalidRequest(message)
            }
            PageCropError::Transform { .. } => ServerError::TransformFailed(message),
            PageCropError::UnreadableDocument(_) => ServerError::UnreadableDocument(message),
            PageCropError::ConversionFailure(_) => ServerError::ConversionFailed(message),
            PageCropError::Rasterize(_) => ServerError::RasterizeFailed(message),
            PageCropError::Serialization(_) => ServerError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagecrop_core::InvalidCrop;

    #[test]
    fn test_invalid_crop_keeps_page_index() {
        let err = ServerError::from(PageCropError::InvalidCrop {
            page: 2,
            source: InvalidCrop::ExceedsHeight {
                bottom: 300.0,
                height: 200.0,
            },
        });
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("page 2"));
        assert!(err.to_string().contains("bottom (300) exceeds page height (200)"));
    }

    #[test]
    fn test_conversion_failure_is_bad_gateway() {
        let err = ServerError::from(PageCropError::ConversionFailure("tool missing".into()));
        assert_eq!(err.status_and_code(), (StatusCode::BAD_GATEWAY, "CONVERSION_FAILURE"));
    }

    #[test]
    fn test_timeout_status() {
        assert_eq!(
            ServerError::Timeout(500).status_and_code().0,
            StatusCode::REQUEST_TIMEOUT
        );
    }
}
