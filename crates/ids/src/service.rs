//! Internal implementation of submission identifiers.

use crate::{IdError, IdResult};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Length of the random suffix appended after the timestamp.
const SUFFIX_LEN: usize = 8;

/// Longest file extension carried over from a submitted filename.
const MAX_EXTENSION_LEN: usize = 16;

/// Formats `at` the way every timestamp in the service is rendered.
///
/// RFC 3339, UTC, millisecond precision, `Z` suffix: `2024-05-01T12:30:45.123Z`.
pub fn timestamp_string(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A validated, filesystem-safe submission identifier.
///
/// Once constructed, the contained name is guaranteed to be a single path component that
/// cannot escape the directory it is joined onto.
///
/// # Construction
/// - [`SubmissionId::generate`] allocates a fresh identifier for a new submission.
/// - [`SubmissionId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(String);

impl SubmissionId {
    /// Generates a new identifier stamped with the current time.
    ///
    /// If `suggested_name` carries a usable extension it is preserved, so `photo.PNG` yields an
    /// identifier ending in `.PNG`.
    pub fn generate(suggested_name: Option<&str>) -> Self {
        Self::generate_at(Utc::now(), suggested_name)
    }

    /// Generates a new identifier stamped with `at`.
    pub fn generate_at(at: DateTime<Utc>, suggested_name: Option<&str>) -> Self {
        let timestamp = timestamp_string(at).replace([':', '.'], "-");
        let suffix = Uuid::new_v4().simple().to_string();
        let extension = suggested_name.and_then(safe_extension).unwrap_or_default();

        Self(format!("{}-{}{}", timestamp, &suffix[..SUFFIX_LEN], extension))
    }

    /// Validates an identifier supplied by a caller.
    ///
    /// Rejects anything that could be interpreted as more than one path component: parent
    /// directory sequences (`..`), either path separator, and NUL bytes.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for an empty string and [`IdError::Unsafe`] for anything that
    /// fails the path-safety check.
    pub fn parse(input: &str) -> IdResult<Self> {
        if input.is_empty() {
            return Err(IdError::Empty);
        }

        if input.contains("..") || input.contains(['/', '\\', '\0']) {
            return Err(IdError::Unsafe(input.to_owned()));
        }

        Ok(Self(input.to_owned()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the extension of this identifier without the dot, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.0).extension().and_then(|ext| ext.to_str())
    }
}

/// Extracts `.ext` from a submitted filename if it is short and purely ASCII alphanumeric.
fn safe_extension(name: &str) -> Option<String> {
    // Browsers on Windows may send a full path; only the last component matters.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let ext = Path::new(base).extension()?.to_str()?;

    let ok = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric());

    ok.then(|| format!(".{}", ext))
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = IdError;

    /// Equivalent to [`SubmissionId::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionId::parse(s)
    }
}

impl AsRef<str> for SubmissionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for SubmissionId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SubmissionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SubmissionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SubmissionId::parse(&s).map_err(serde::de::Error::custom)
    }
}
