//! 面向 HTTP 的错误类型及转换。

use axum::Json;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::storage::StorageError;
use crate::thumbnail::ThumbnailError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
    RangeNotSatisfiable(u64),
}

impl ApiError {
    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("{field} is required"))
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => error_body(StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            ApiError::RangeNotSatisfiable(size) => {
                let mut headers = HeaderMap::new();
                if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                    headers.insert(header::CONTENT_RANGE, value);
                }
                (
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    headers,
                    Json(json!({ "error": "range not satisfiable" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::BadRequest("invalid path".into()),
            StorageError::NotFound => ApiError::NotFound("file not found".into()),
            StorageError::CrossDevice => ApiError::Conflict(error.to_string()),
            StorageError::Unavailable(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<ThumbnailError> for ApiError {
    fn from(error: ThumbnailError) -> Self {
        match error {
            ThumbnailError::UnsupportedMediaType(_) => ApiError::BadRequest(error.to_string()),
            ThumbnailError::Decode(_) => ApiError::Internal(error.to_string()),
            ThumbnailError::Storage(inner) => inner.into(),
        }
    }
}
