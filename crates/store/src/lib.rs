//! Submission store
//!
//! Persists submitted files and text blobs under a storage root and keeps an optional JSON
//! metadata sidecar next to each one.
//!
//! ## Storage layout
//!
//! ```text
//! <storage_root>/
//! ├── uploads/
//! │   └── 2024-05-01T12-30-45-123Z-1a2b3c4d.png
//! └── metadata/
//!     └── 2024-05-01T12-30-45-123Z-1a2b3c4d.png.json
//! ```
//!
//! ## Sidecar model
//!
//! - Content and metadata are two independent files linked only by name.
//! - A missing sidecar is a valid state; a corrupt one is treated as missing everywhere except
//!   a direct metadata fetch.
//! - Metadata written alongside a new submission is best-effort: a failed sidecar write is
//!   logged and the submission still succeeds.
//! - Metadata updates are shallow merges; `originalFilename` and `uploadDate` always survive
//!   from the previous record.
//! - Nothing is locked. Concurrent updates to the same sidecar are last-writer-wins and may drop
//!   one side's changes.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use submit_store::{StoreConfig, SubmissionStore};
//!
//! # async fn run() -> Result<(), submit_store::StoreError> {
//! let config = StoreConfig::new("storage".into(), 100 * 1024 * 1024)?;
//! let store = SubmissionStore::new(Arc::new(config));
//! store.ensure_directories().await?;
//!
//! let receipt = store.submit_text("hello world", None).await?;
//! assert_eq!(store.get_content(&receipt.id).await?, b"hello world");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod metadata;
mod store;

pub use config::{max_upload_bytes_from_env_value, StoreConfig};
pub use metadata::MetadataRecord;
pub use store::{
    Download, ListedSubmission, PendingUpload, SearchHit, StoredContent, SubmissionReceipt,
    SubmissionStore,
};
pub use submit_ids::{IdError, SubmissionId};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Missing, empty or otherwise unusable input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller-supplied identifier failed the path-safety check
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// No artifact or sidecar exists for the identifier
    #[error("not found: {0}")]
    NotFound(String),

    /// A sidecar exists but is not a JSON object
    #[error("invalid metadata format: {0}")]
    InvalidFormat(String),

    /// Streamed content exceeded the configured upload limit
    #[error("upload exceeds the maximum size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata could not be serialised
    #[error("failed to serialise metadata: {0}")]
    Serialization(serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
