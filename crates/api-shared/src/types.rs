//! Request and response bodies.
//!
//! Every response carries `success`; `message` is omitted when there is nothing to say.
//! Metadata records are free-form JSON objects and are documented as `Object`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::{IntoParams, ToSchema};

/// Envelope with no payload: errors, health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MessageRes {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Body of `POST /submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitTextReq {
    /// Required; a missing field is reported like empty text
    #[serde(default)]
    pub text: Option<String>,
    /// Optional metadata; anything other than an object is ignored
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

/// Response of `POST /submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitTextRes {
    pub success: bool,
    pub message: String,
    pub filename: String,
}

/// Multipart form accepted by `POST /upload` (documentation only).
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// JSON object encoded as a string; invalid JSON is ignored
    pub metadata: Option<String>,
}

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRes {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub original_name: Option<String>,
    pub size: u64,
}

/// One entry of `GET /uploads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadEntry {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Map<String, Value>>,
}

/// Response of `GET /uploads`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListUploadsRes {
    pub success: bool,
    pub uploads: Vec<UploadEntry>,
}

/// Response of `GET /metadata/{id}` and `PUT /metadata/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetadataRes {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub filename: String,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

/// Query string of `GET /search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring to look for
    pub q: Option<String>,
    /// Restrict matching to this metadata key
    pub field: Option<String>,
}

/// One hit of `GET /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub filename: String,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

/// Response of `GET /search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchRes {
    pub success: bool,
    pub count: usize,
    pub results: Vec<SearchResult>,
}
