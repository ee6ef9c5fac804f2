//! # API REST
//!
//! REST API for the submission service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Multipart uploads streamed into the store
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON envelope, status codes, CORS, body limits)
//!
//! Uses `api-shared` for wire types and `submit-store` for everything that touches disk.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod state;

use api_shared::{
    ListUploadsRes, MessageRes, MetadataRes, SearchRes, SearchResult, SubmitTextReq,
    SubmitTextRes, UploadEntry, UploadForm, UploadRes,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;
pub use state::AppState;

/// Room for multipart boundaries and the `metadata` field on top of the file limit.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Landing page served at `/`, relative to the public directory.
const INDEX_FILE: &str = "index.html";

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::submit_text,
        handlers::upload,
        handlers::list_uploads,
        handlers::get_upload,
        handlers::get_metadata,
        handlers::update_metadata,
        handlers::download,
        handlers::search,
    ),
    components(schemas(
        MessageRes,
        SubmitTextReq,
        SubmitTextRes,
        UploadForm,
        UploadRes,
        UploadEntry,
        ListUploadsRes,
        MetadataRes,
        SearchResult,
        SearchRes,
    ))
)]
struct ApiDoc;

/// Builds the full application router.
///
/// Identifier routes use catch-all segments so that multi-segment paths such as
/// `/uploads/../../etc/passwd` reach the handler and are rejected as unsafe rather than
/// falling through to the 404 handler.
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(
        state
            .store
            .config()
            .max_upload_bytes()
            .saturating_add(MULTIPART_OVERHEAD_BYTES),
    )
    .unwrap_or(usize::MAX);

    let index = ServeFile::new(state.public_dir.join(INDEX_FILE));

    Router::new()
        .route_service("/", index)
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route(
            "/submit",
            post(handlers::submit_text).fallback(handlers::not_found),
        )
        .route("/upload", post(handlers::upload).fallback(handlers::not_found))
        .route(
            "/uploads",
            get(handlers::list_uploads).fallback(handlers::not_found),
        )
        .route(
            "/uploads/*id",
            get(handlers::get_upload).fallback(handlers::not_found),
        )
        .route(
            "/metadata/*id",
            get(handlers::get_metadata)
                .put(handlers::update_metadata)
                .fallback(handlers::not_found),
        )
        .route(
            "/download/*id",
            get(handlers::download).fallback(handlers::not_found),
        )
        .route("/search", get(handlers::search).fallback(handlers::not_found))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the API until the process is stopped.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
