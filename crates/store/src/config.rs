//! Store configuration.
//!
//! Configuration is resolved once at process startup and passed into the store, so request
//! handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, METADATA_DIR_NAME, UPLOADS_DIR_NAME};
use crate::{StoreError, StoreResult};
use std::path::{Path, PathBuf};

/// Store configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    storage_root: PathBuf,
    max_upload_bytes: u64,
}

impl StoreConfig {
    /// Create a new `StoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` if `max_upload_bytes` is zero.
    pub fn new(storage_root: PathBuf, max_upload_bytes: u64) -> StoreResult<Self> {
        if max_upload_bytes == 0 {
            return Err(StoreError::InvalidInput(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            storage_root,
            max_upload_bytes,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.storage_root.join(UPLOADS_DIR_NAME)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.storage_root.join(METADATA_DIR_NAME)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }
}

/// Parse the upload limit from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_UPLOAD_BYTES`].
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> StoreResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(value) = value else {
        return Ok(DEFAULT_MAX_UPLOAD_BYTES);
    };

    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(StoreError::InvalidInput(format!(
            "upload limit must be a positive number of bytes, got: '{}'",
            value
        ))),
        Ok(bytes) => Ok(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_directories() {
        let cfg = StoreConfig::new(PathBuf::from("/srv/submit"), 1024).unwrap();

        assert_eq!(cfg.storage_root(), Path::new("/srv/submit"));
        assert_eq!(cfg.uploads_dir(), PathBuf::from("/srv/submit/uploads"));
        assert_eq!(cfg.metadata_dir(), PathBuf::from("/srv/submit/metadata"));
        assert_eq!(cfg.max_upload_bytes(), 1024);
    }

    #[test]
    fn test_config_rejects_zero_limit() {
        let result = StoreConfig::new(PathBuf::from("storage"), 0);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn test_limit_defaults_when_unset() {
        assert_eq!(
            max_upload_bytes_from_env_value(None).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            max_upload_bytes_from_env_value(Some("   ".into())).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
    }

    #[test]
    fn test_limit_parses_bytes() {
        assert_eq!(
            max_upload_bytes_from_env_value(Some(" 2048 ".into())).unwrap(),
            2048
        );
    }

    #[test]
    fn test_limit_rejects_garbage() {
        assert!(max_upload_bytes_from_env_value(Some("lots".into())).is_err());
        assert!(max_upload_bytes_from_env_value(Some("0".into())).is_err());
        assert!(max_upload_bytes_from_env_value(Some("-5".into())).is_err());
    }
}
