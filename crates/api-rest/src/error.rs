//! Mapping from store and extractor failures to JSON error responses.
//!
//! Every error leaves the server as `{success: false, message}`. Internal details (paths, I/O
//! errors) are logged here and never put in the message.

use api_shared::MessageRes;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use submit_store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
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

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageRes::error(self.message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidInput(msg) => Self::bad_request(msg),
            StoreError::InvalidId(e) => {
                tracing::error!("Invalid filename requested: {}", e);
                Self::bad_request("Invalid filename")
            }
            StoreError::NotFound(msg) => Self::not_found(msg),
            StoreError::InvalidFormat(e) => {
                tracing::error!("Error parsing metadata JSON: {}", e);
                Self::not_found("Invalid metadata format")
            }
            StoreError::PayloadTooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large")
            }
            StoreError::Io(e) => {
                tracing::error!("Storage I/O error: {:?}", e);
                Self::internal("Internal error")
            }
            StoreError::Serialization(e) => {
                tracing::error!("Metadata serialisation error: {:?}", e);
                Self::internal("Internal error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::error!("JSON parsing error: {}", rejection.body_text());
        match rejection {
            // Valid JSON, wrong shape
            JsonRejection::JsonDataError(_) => Self::bad_request("Invalid request body"),
            _ => Self::bad_request("Invalid JSON"),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        let status = e.status();
        tracing::error!("Multipart error ({}): {}", status, e.body_text());
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::new(status, "File too large")
        } else {
            Self::bad_request("Invalid multipart body")
        }
    }
}

/// `axum::Json` whose rejections become `{success:false, message:"Invalid JSON"}`.
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
