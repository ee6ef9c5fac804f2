//! Constants used throughout the store crate.

/// Default storage root when no explicit directory is configured.
pub const DEFAULT_STORAGE_DIR: &str = "storage";

/// Directory under the storage root holding submitted content.
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Directory under the storage root holding JSON sidecars.
pub const METADATA_DIR_NAME: &str = "metadata";

/// Suffix appended to an identifier to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".json";

/// Default upload limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Filename used only to give text submissions a `.txt` identifier.
pub const TEXT_SUBMISSION_NAME: &str = "submission.txt";

/// Media type recorded for text submissions.
pub const TEXT_MEDIA_TYPE: &str = "text/plain";

/// Media type recorded when the uploader did not send one.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";
