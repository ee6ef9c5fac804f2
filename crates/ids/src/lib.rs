//! Submission identifiers and the shared path-safety validator.
//!
//! Every stored artifact is addressed by a generated name that doubles as its filename under the
//! storage root. Generated names look like:
//!
//! ```text
//! 2024-05-01T12-30-45-123Z-1a2b3c4d.png
//! └──────── timestamp ───┘ └suffix┘└ext┘
//! ```
//!
//! - The timestamp is RFC 3339 UTC with millisecond precision, with every `:` and `.` replaced
//!   by `-` so the name is safe on every common filesystem.
//! - The suffix is the first 8 lowercase hex characters of a v4 UUID.
//! - The extension is carried over from the submitted filename when it is short and
//!   alphanumeric; anything else is dropped.
//!
//! Because the timestamp leads, generated names sort lexicographically by submission time
//! (to millisecond resolution).
//!
//! Identifiers supplied from outside the store (URL path segments, CLI arguments) must go
//! through [`SubmissionId::parse`] before they touch the filesystem.

mod service;

pub use service::{timestamp_string, SubmissionId};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// The identifier is empty
    #[error("Identifier cannot be empty")]
    Empty,

    /// The identifier could escape the storage root
    #[error("Unsafe identifier: {0}")]
    Unsafe(String),
}

/// Result type for identifier operations.
pub type IdResult<T> = Result<T, IdError>;
