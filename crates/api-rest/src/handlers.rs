//! Request handlers.
//!
//! Each handler validates any caller-supplied identifier with [`SubmissionId::parse`] before the
//! store is touched, then translates the store's result into the JSON envelope.

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;
use api_shared::{
    HealthService, ListUploadsRes, MessageRes, MetadataRes, SearchQuery, SearchRes,
    SearchResult, SubmitTextReq, SubmitTextRes, UploadEntry, UploadForm, UploadRes,
};
use axum::extract::multipart::{Field, Multipart, MultipartRejection};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use infer::MatcherType;
use serde_json::Value;
use submit_store::metadata;
use submit_store::{PendingUpload, StoreError, StoredContent, SubmissionId};
use tokio_util::io::ReaderStream;

/// Leading bytes inspected when picking an inline `Content-Type`.
const SNIFF_BYTES: usize = 8 * 1024;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = MessageRes)
    )
)]
/// Liveness endpoint for monitoring.
pub async fn health() -> Json<MessageRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/submit",
    request_body = SubmitTextReq,
    responses(
        (status = 200, description = "Text stored", body = SubmitTextRes),
        (status = 400, description = "Empty text or invalid JSON", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Store a plain text submission.
///
/// Metadata is optional; when present it is stamped with `mimeType`, `size` and `uploadDate`
/// and written as the sidecar. Metadata that is not a JSON object is replaced with `{}`.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the body is not valid JSON, or
/// - `text` is missing, not a string, empty or whitespace-only.
#[axum::debug_handler]
pub async fn submit_text(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SubmitTextReq>,
) -> Result<Json<SubmitTextRes>, ApiError> {
    tracing::info!("Received text submission");

    let metadata = req.metadata.map(metadata::from_value_lenient);
    let text = req.text.unwrap_or_default();
    let receipt = state.store.submit_text(&text, metadata).await?;

    Ok(Json(SubmitTextRes {
        success: true,
        message: "Text submitted successfully".into(),
        filename: receipt.id.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadRes),
        (status = 400, description = "No file in the form", body = MessageRes),
        (status = 413, description = "File exceeds the upload limit", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Store an uploaded file.
///
/// The `file` field is streamed to disk as it arrives. Every upload gets a sidecar: the
/// `metadata` field (a JSON object encoded as text) if present and valid, otherwise `{}`,
/// stamped with `originalFilename`, `mimeType`, `size` and `uploadDate`.
///
/// # Errors
/// Returns `400 Bad Request` if the request is not multipart or has no `file` field, and
/// `413 Payload Too Large` if the file exceeds the configured limit.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadRes>, ApiError> {
    tracing::info!("Received file upload request");

    let Ok(mut multipart) = multipart else {
        tracing::info!("No file uploaded");
        return Err(ApiError::bad_request("No file uploaded"));
    };

    let mut pending: Option<(PendingUpload, Option<String>)> = None;
    let mut raw_metadata: Option<String> = None;

    // Any failure after the artifact is opened must remove the partial file.
    let read = read_upload_form(&state, &mut multipart, &mut pending, &mut raw_metadata).await;
    if let Err(e) = read {
        if let Some((upload, _)) = pending {
            upload.abort().await;
        }
        return Err(e);
    }

    let Some((upload, content_type)) = pending else {
        tracing::info!("No file uploaded");
        return Err(ApiError::bad_request("No file uploaded"));
    };

    let record = raw_metadata
        .as_deref()
        .map(metadata::parse_lenient)
        .unwrap_or_default();

    let receipt = state
        .store
        .finish_upload(upload, content_type.as_deref(), Some(record))
        .await?;

    Ok(Json(UploadRes {
        success: true,
        message: "File uploaded successfully".into(),
        filename: receipt.id.to_string(),
        original_name: receipt.original_name,
        size: receipt.size,
    }))
}

async fn read_upload_form(
    state: &AppState,
    multipart: &mut Multipart,
    pending: &mut Option<(PendingUpload, Option<String>)>,
    raw_metadata: &mut Option<String>,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") if pending.is_none() => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);

                let upload = state.store.begin_upload(file_name.as_deref()).await?;
                let upload = pending.insert((upload, content_type));
                stream_field(field, &mut upload.0).await?;
            }
            Some("metadata") => {
                *raw_metadata = Some(field.text().await?);
            }
            // Extra fields are drained by the next call to `next_field`.
            _ => {}
        }
    }
    Ok(())
}

async fn stream_field(mut field: Field<'_>, upload: &mut PendingUpload) -> Result<(), ApiError> {
    while let Some(chunk) = field.chunk().await? {
        upload.write_chunk(&chunk).await?;
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/uploads",
    responses(
        (status = 200, description = "Every stored upload", body = ListUploadsRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// List every upload with its metadata where readable.
///
/// Uploads whose sidecar is missing or corrupt are listed without `metadata`.
#[axum::debug_handler]
pub async fn list_uploads(State(state): State<AppState>) -> Result<Json<ListUploadsRes>, ApiError> {
    tracing::info!("Fetching uploads list");

    let listed = state.store.list().await.map_err(|e| {
        tracing::error!("Error reading uploads directory: {}", e);
        ApiError::internal("Failed to fetch uploads")
    })?;

    let uploads: Vec<UploadEntry> = listed
        .into_iter()
        .map(|entry| UploadEntry {
            filename: entry.id.to_string(),
            metadata: entry.metadata,
        })
        .collect();

    tracing::info!("Found {} uploads", uploads.len());
    Ok(Json(ListUploadsRes {
        success: true,
        uploads,
    }))
}

#[utoipa::path(
    get,
    path = "/uploads/{id}",
    params(("id" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Raw content"),
        (status = 400, description = "Unsafe filename", body = MessageRes),
        (status = 404, description = "No such upload", body = MessageRes)
    )
)]
/// Serve an upload's raw content inline.
pub async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    tracing::info!("Fetching upload: {}", id);
    let id = SubmissionId::parse(&id).map_err(StoreError::from)?;

    let mut content = state.store.open_content(&id).await.map_err(|e| {
        tracing::error!("Error sending file {}: {}", id, e);
        match e {
            StoreError::NotFound(_) => ApiError::not_found("File not found"),
            other => ApiError::from(other),
        }
    })?;

    let head = content.head(SNIFF_BYTES).await?;
    let content_type = inline_content_type(&id, &head);
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (header::CONTENT_LENGTH, content.size().to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_owned()),
        ],
        stream_body(content),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/metadata/{id}",
    params(("id" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Metadata record", body = MetadataRes),
        (status = 400, description = "Unsafe filename", body = MessageRes),
        (status = 404, description = "No metadata, or metadata is unreadable", body = MessageRes)
    )
)]
/// Fetch an upload's metadata record.
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MetadataRes>, ApiError> {
    tracing::info!("Fetching metadata for: {}", id);
    let id = SubmissionId::parse(&id).map_err(StoreError::from)?;

    let metadata = state.store.get_metadata(&id).await.map_err(|e| match e {
        StoreError::NotFound(_) => {
            tracing::error!("Metadata not found for: {}", id);
            ApiError::not_found("Metadata not found")
        }
        other => ApiError::from(other),
    })?;

    Ok(Json(MetadataRes {
        success: true,
        message: None,
        filename: id.to_string(),
        metadata,
    }))
}

#[utoipa::path(
    put,
    path = "/metadata/{id}",
    params(("id" = String, Path, description = "Stored filename")),
    request_body(content = Object, description = "Keys to merge into the record"),
    responses(
        (status = 200, description = "Merged metadata record", body = MetadataRes),
        (status = 400, description = "Unsafe filename or invalid body", body = MessageRes),
        (status = 404, description = "No such upload", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Merge keys into an upload's metadata.
///
/// Existing keys not named in the body are kept. `originalFilename` and `uploadDate` are never
/// changed once recorded, and `lastModified` is set to the current time.
#[axum::debug_handler]
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<Value>,
) -> Result<Json<MetadataRes>, ApiError> {
    tracing::info!("Updating metadata for: {}", id);
    let id = SubmissionId::parse(&id).map_err(StoreError::from)?;

    let metadata = state.store.update_metadata(&id, update).await.map_err(|e| {
        tracing::error!("Error updating metadata for {}: {}", id, e);
        match e {
            StoreError::NotFound(_) => ApiError::not_found("File not found"),
            other => ApiError::from(other),
        }
    })?;

    Ok(Json(MetadataRes {
        success: true,
        message: Some("Metadata updated successfully".into()),
        filename: id.to_string(),
        metadata,
    }))
}

#[utoipa::path(
    get,
    path = "/download/{id}",
    params(("id" = String, Path, description = "Stored filename")),
    responses(
        (status = 200, description = "Content as an attachment"),
        (status = 400, description = "Unsafe filename", body = MessageRes),
        (status = 404, description = "No such upload", body = MessageRes)
    )
)]
/// Serve an upload as an attachment named after its original filename.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    tracing::info!("Download requested: {}", id);
    let id = SubmissionId::parse(&id).map_err(StoreError::from)?;

    let download = state.store.download(&id).await.map_err(|e| {
        tracing::error!("Error downloading file {}: {}", id, e);
        match e {
            StoreError::NotFound(_) => ApiError::not_found("File not found"),
            other => ApiError::from(other),
        }
    })?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_owned(),
            ),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&download.filename),
            ),
            (header::CONTENT_LENGTH, download.content.size().to_string()),
        ],
        stream_body(download.content),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching metadata records", body = SearchRes),
        (status = 400, description = "Missing query", body = MessageRes),
        (status = 500, description = "Internal server error", body = MessageRes)
    )
)]
/// Case-insensitive substring search over metadata.
///
/// With `field`, only that key is compared; otherwise any value may match. Uploads without
/// metadata never match.
#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchRes>, ApiError> {
    let Some(q) = query.q.filter(|q| !q.trim().is_empty()) else {
        return Err(ApiError::bad_request("Search query is required"));
    };
    tracing::info!("Searching metadata for: {} (field: {:?})", q, query.field);

    let hits = state.store.search(&q, query.field.as_deref()).await?;

    let results: Vec<SearchResult> = hits
        .into_iter()
        .map(|hit| SearchResult {
            filename: hit.id.to_string(),
            metadata: hit.metadata,
        })
        .collect();

    Ok(Json(SearchRes {
        success: true,
        count: results.len(),
        results,
    }))
}

/// Fallback for unknown routes and unsupported methods.
pub async fn not_found() -> (StatusCode, Json<MessageRes>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageRes::error("Endpoint not found")),
    )
}

fn stream_body(content: StoredContent) -> Body {
    Body::from_stream(ReaderStream::new(content.into_file()))
}

/// Picks a `Content-Type` for inline serving: sniffed magic bytes first, then the extension.
///
/// Text-like sniff results (HTML, XML, scripts) are ignored so that uploaded markup is never
/// rendered by the browser on this origin.
fn inline_content_type(id: &SubmissionId, head: &[u8]) -> &'static str {
    if let Some(kind) = infer::get(head).filter(|kind| kind.matcher_type() != MatcherType::Text) {
        return kind.mime_type();
    }

    match id.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

/// Builds an `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}
