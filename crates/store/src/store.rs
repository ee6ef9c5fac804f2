//! Disk-backed submission store implementation
//!
//! [`SubmissionStore`] owns no mutable state. Every operation is a handful of independent
//! filesystem calls against the configured storage root, so one instance can be cloned into
//! every request handler.
//!
//! Content and sidecar writes are not coordinated: a submission that persisted its content
//! but failed to persist its sidecar is still a successful submission.

use crate::config::StoreConfig;
use crate::constants::{
    DEFAULT_MEDIA_TYPE, SIDECAR_SUFFIX, TEXT_MEDIA_TYPE, TEXT_SUBMISSION_NAME,
};
use crate::metadata::{self, MetadataRecord};
use crate::{StoreError, StoreResult};
use chrono::Utc;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use submit_ids::SubmissionId;
use submit_types::NonEmptyText;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Generated identifier, also the stored filename
    pub id: SubmissionId,

    /// Filename the content was submitted under, if any
    pub original_name: Option<String>,

    /// Number of content bytes written
    pub size: u64,
}

/// One entry of [`SubmissionStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListedSubmission {
    pub id: SubmissionId,

    /// `None` when the sidecar is missing or unreadable
    pub metadata: Option<MetadataRecord>,
}

/// One hit of [`SubmissionStore::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: SubmissionId,
    pub metadata: MetadataRecord,
}

/// An artifact opened for reading, to be streamed rather than loaded whole.
#[derive(Debug)]
pub struct StoredContent {
    file: fs::File,
    size: u64,
}

impl StoredContent {
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads up to `max` leading bytes and rewinds, so the whole artifact is still streamed.
    pub async fn head(&mut self, max: usize) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(max.min(self.size as usize));
        (&mut self.file).take(max as u64).read_to_end(&mut buf).await?;
        self.file.seek(std::io::SeekFrom::Start(0)).await?;
        Ok(buf)
    }

    pub fn into_file(self) -> fs::File {
        self.file
    }
}

/// Content plus the filename a client should save it as.
#[derive(Debug)]
pub struct Download {
    pub content: StoredContent,
    pub filename: String,
}

/// Content being streamed to disk for a submission that has not been finished yet.
///
/// Obtain one from [`SubmissionStore::begin_upload`], feed it with
/// [`PendingUpload::write_chunk`], then hand it back to [`SubmissionStore::finish_upload`].
/// Call [`PendingUpload::abort`] to discard the partial file instead. An upload that is
/// dropped before it is finished (for example when the client disconnects mid-stream) removes
/// its partial file as well.
#[derive(Debug)]
pub struct PendingUpload {
    id: SubmissionId,
    path: PathBuf,
    file: fs::File,
    original_name: Option<String>,
    written: u64,
    limit: u64,
    /// Set once the file is either finished or already removed
    settled: bool,
}

impl PendingUpload {
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Appends `chunk` to the artifact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::PayloadTooLarge` once the running total passes the configured
    /// limit, or `StoreError::Io` if the write fails. In both cases the partial file has
    /// already been removed and the upload must not be used again.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> StoreResult<()> {
        let next = self.written.saturating_add(chunk.len() as u64);
        if next > self.limit {
            tracing::warn!(
                "Upload {} rejected after {} bytes (limit {})",
                self.id,
                next,
                self.limit
            );
            remove_partial(&self.path).await;
            self.settled = true;
            return Err(StoreError::PayloadTooLarge { limit: self.limit });
        }

        if let Err(e) = self.file.write_all(chunk).await {
            tracing::error!("Error writing upload {}: {}", self.id, e);
            remove_partial(&self.path).await;
            self.settled = true;
            return Err(StoreError::Io(e));
        }

        self.written = next;
        Ok(())
    }

    /// Discards the upload and removes whatever was written so far.
    pub async fn abort(mut self) {
        remove_partial(&self.path).await;
        self.settled = true;
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!("Upload {} dropped before completion, removing partial file", self.id);
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::error!(
                    "Failed to remove partial upload {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

async fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::error!("Failed to remove partial upload {}: {}", path.display(), e);
        }
    }
}

/// Submission store rooted at a configured directory.
#[derive(Clone, Debug)]
pub struct SubmissionStore {
    cfg: Arc<StoreConfig>,
}

impl SubmissionStore {
    pub fn new(cfg: Arc<StoreConfig>) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// Creates the uploads and metadata directories if they are missing.
    pub async fn ensure_directories(&self) -> StoreResult<()> {
        for dir in [self.cfg.uploads_dir(), self.cfg.metadata_dir()] {
            if fs::metadata(&dir).await.is_ok_and(|m| m.is_dir()) {
                continue;
            }
            fs::create_dir_all(&dir).await?;
            tracing::info!("Created directory {}", dir.display());
        }
        Ok(())
    }

    /// Allocates an identifier and opens its artifact for streaming.
    ///
    /// The extension of `suggested_name` is carried into the identifier, and the name itself is
    /// recorded as `originalFilename` if metadata is written on finish.
    pub async fn begin_upload(&self, suggested_name: Option<&str>) -> StoreResult<PendingUpload> {
        let original_name = suggested_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);

        self.open_artifact(
            SubmissionId::generate(original_name.as_deref()),
            original_name,
        )
        .await
    }

    async fn open_artifact(
        &self,
        id: SubmissionId,
        original_name: Option<String>,
    ) -> StoreResult<PendingUpload> {
        let path = self.artifact_path(&id);
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                tracing::error!("Error creating artifact {}: {}", path.display(), e);
                StoreError::Io(e)
            })?;

        Ok(PendingUpload {
            id,
            path,
            file,
            original_name,
            written: 0,
            limit: self.cfg.max_upload_bytes(),
            settled: false,
        })
    }

    /// Completes a streamed upload and writes its sidecar when `metadata` is given.
    ///
    /// The sidecar write is best-effort; see [`SubmissionStore::submit_content`].
    pub async fn finish_upload(
        &self,
        mut pending: PendingUpload,
        content_type: Option<&str>,
        metadata: Option<MetadataRecord>,
    ) -> StoreResult<SubmissionReceipt> {
        if let Err(e) = pending.file.flush().await {
            tracing::error!("Error flushing upload {}: {}", pending.id, e);
            remove_partial(&pending.path).await;
            pending.settled = true;
            return Err(StoreError::Io(e));
        }
        pending.settled = true;

        let id = pending.id.clone();
        let original_name = pending.original_name.take();
        let written = pending.written;
        drop(pending);

        if let Some(mut record) = metadata {
            let mime_type = content_type
                .map(str::trim)
                .filter(|ct| !ct.is_empty())
                .unwrap_or(DEFAULT_MEDIA_TYPE);
            metadata::apply_derived_fields(
                &mut record,
                original_name.as_deref(),
                mime_type,
                written,
                Utc::now(),
            );
            self.write_sidecar_best_effort(&id, &record).await;
        }

        tracing::info!("File uploaded: {} ({} bytes)", id, written);

        Ok(SubmissionReceipt {
            id,
            original_name,
            size: written,
        })
    }

    /// Stores `content` under a fresh identifier.
    ///
    /// If `metadata` is given it is stamped with `originalFilename` (when `suggested_name` is
    /// set), `mimeType`, `size` and `uploadDate`, and written as the sidecar.
    ///
    /// # Errors
    ///
    /// Fails only if the content cannot be written or exceeds the upload limit. A failed
    /// sidecar write is logged and otherwise ignored.
    pub async fn submit_content(
        &self,
        content: &[u8],
        suggested_name: Option<&str>,
        content_type: Option<&str>,
        metadata: Option<MetadataRecord>,
    ) -> StoreResult<SubmissionReceipt> {
        let mut pending = self.begin_upload(suggested_name).await?;
        pending.write_chunk(content).await?;
        self.finish_upload(pending, content_type, metadata).await
    }

    /// Stores a plain text submission under a fresh `.txt` identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidInput` for empty or whitespace-only text.
    pub async fn submit_text(
        &self,
        text: &str,
        metadata: Option<MetadataRecord>,
    ) -> StoreResult<SubmissionReceipt> {
        let text = NonEmptyText::new(text)
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;

        let mut pending = self
            .open_artifact(SubmissionId::generate(Some(TEXT_SUBMISSION_NAME)), None)
            .await?;
        pending.write_chunk(text.as_str().as_bytes()).await?;
        self.finish_upload(pending, Some(TEXT_MEDIA_TYPE), metadata)
            .await
    }

    /// Lists every stored artifact with its metadata where readable.
    ///
    /// Order follows directory enumeration and is not guaranteed.
    pub async fn list(&self) -> StoreResult<Vec<ListedSubmission>> {
        let mut uploads = Vec::new();

        let mut entries = match fs::read_dir(self.cfg.uploads_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(uploads),
            Err(e) => return Err(StoreError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
                continue;
            }
            let Some(id) = entry
                .file_name()
                .to_str()
                .and_then(|name| SubmissionId::parse(name).ok())
            else {
                continue;
            };

            let metadata = self.read_sidecar(&id).await.ok();
            uploads.push(ListedSubmission { id, metadata });
        }

        Ok(uploads)
    }

    /// Reads the sidecar for `id`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no sidecar exists, `StoreError::InvalidFormat` if it is not a
    /// JSON object.
    pub async fn get_metadata(&self, id: &SubmissionId) -> StoreResult<MetadataRecord> {
        self.read_sidecar(id).await
    }

    /// Merges `update` into the sidecar for `id` and returns the merged record.
    ///
    /// A missing or corrupt sidecar is treated as `{}`. See [`metadata::merge`] for the merge
    /// rules. There is no locking: two concurrent updates may lose one side's keys.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if the artifact does not exist, `StoreError::InvalidInput` if
    /// `update` is not a JSON object, `StoreError::Io` if the sidecar cannot be written.
    pub async fn update_metadata(
        &self,
        id: &SubmissionId,
        update: Value,
    ) -> StoreResult<MetadataRecord> {
        if !self.artifact_exists(id).await? {
            return Err(StoreError::NotFound(format!("File not found: {}", id)));
        }

        let Value::Object(update) = update else {
            return Err(StoreError::InvalidInput(
                "metadata must be a JSON object".into(),
            ));
        };

        let prior = match self.read_sidecar(id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => MetadataRecord::new(),
            Err(StoreError::InvalidFormat(e)) => {
                tracing::warn!("Replacing unreadable metadata for {}: {}", id, e);
                MetadataRecord::new()
            }
            Err(e) => return Err(e),
        };

        let merged = metadata::merge(prior, update, Utc::now());
        self.write_sidecar(id, &merged).await?;
        tracing::info!("Metadata updated for: {}", id);

        Ok(merged)
    }

    /// Reads the artifact for `id`.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no artifact exists.
    pub async fn get_content(&self, id: &SubmissionId) -> StoreResult<Vec<u8>> {
        if !self.artifact_exists(id).await? {
            return Err(StoreError::NotFound(format!("File not found: {}", id)));
        }
        Ok(fs::read(self.artifact_path(id)).await?)
    }

    /// Opens the artifact for `id` for streaming.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` if no artifact exists.
    pub async fn open_content(&self, id: &SubmissionId) -> StoreResult<StoredContent> {
        if !self.artifact_exists(id).await? {
            return Err(StoreError::NotFound(format!("File not found: {}", id)));
        }
        let file = fs::File::open(self.artifact_path(id)).await?;
        let size = file.metadata().await?.len();
        Ok(StoredContent { file, size })
    }

    /// Opens the artifact for `id` along with the filename it should be saved as.
    ///
    /// The filename is the recorded `originalFilename` when there is one, else the identifier.
    pub async fn download(&self, id: &SubmissionId) -> StoreResult<Download> {
        let content = self.open_content(id).await?;

        let filename = match self.read_sidecar(id).await {
            Ok(record) => metadata::original_filename(&record).map(str::to_owned),
            Err(StoreError::InvalidFormat(e)) => {
                tracing::warn!("Error parsing metadata for download {}: {}", id, e);
                None
            }
            Err(_) => None,
        }
        .unwrap_or_else(|| id.to_string());

        Ok(Download { content, filename })
    }

    /// Case-insensitive substring search over every sidecar.
    ///
    /// With `field`, only that key's value is compared; otherwise any value may match.
    /// Sidecars whose artifact is gone and sidecars that fail to parse are skipped.
    ///
    /// # Errors
    ///
    /// `StoreError::InvalidInput` for an empty or whitespace-only query.
    pub async fn search(&self, query: &str, field: Option<&str>) -> StoreResult<Vec<SearchHit>> {
        let query = NonEmptyText::new(query)
            .map_err(|_| StoreError::InvalidInput("search query is required".into()))?;
        let needle = query.as_str().to_lowercase();
        let field = field.map(str::trim).filter(|f| !f.is_empty());

        let mut hits = Vec::new();

        let mut entries = match fs::read_dir(self.cfg.metadata_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(hits),
            Err(e) => return Err(StoreError::Io(e)),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(id) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(SIDECAR_SUFFIX))
                .and_then(|stem| SubmissionId::parse(stem).ok())
            else {
                continue;
            };

            if !self.artifact_exists(&id).await.unwrap_or(false) {
                continue;
            }

            let record = match self.read_sidecar(&id).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping metadata for {} during search: {}", id, e);
                    continue;
                }
            };

            if metadata::matches(&record, &needle, field) {
                hits.push(SearchHit {
                    id,
                    metadata: record,
                });
            }
        }

        tracing::info!("Search for '{}' matched {} records", query.as_str(), hits.len());
        Ok(hits)
    }

    async fn artifact_exists(&self, id: &SubmissionId) -> StoreResult<bool> {
        match fs::metadata(self.artifact_path(id)).await {
            Ok(m) => Ok(m.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn read_sidecar(&self, id: &SubmissionId) -> StoreResult<MetadataRecord> {
        let data = match fs::read_to_string(self.sidecar_path(id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("Metadata not found: {}", id)));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(record)) => Ok(record),
            Ok(_) => Err(StoreError::InvalidFormat(
                "metadata is not a JSON object".into(),
            )),
            Err(e) => Err(StoreError::InvalidFormat(e.to_string())),
        }
    }

    async fn write_sidecar(&self, id: &SubmissionId, record: &MetadataRecord) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(record).map_err(StoreError::Serialization)?;
        fs::write(self.sidecar_path(id), json).await?;
        Ok(())
    }

    /// Writes a sidecar as a side effect of a submission: failures are logged, never returned.
    async fn write_sidecar_best_effort(&self, id: &SubmissionId, record: &MetadataRecord) {
        if let Err(e) = self.write_sidecar(id, record).await {
            tracing::error!("Error saving metadata for {}: {}", id, e);
        }
    }

    fn artifact_path(&self, id: &SubmissionId) -> PathBuf {
        self.cfg.uploads_dir().join(id.as_str())
    }

    fn sidecar_path(&self, id: &SubmissionId) -> PathBuf {
        self.cfg
            .metadata_dir()
            .join(format!("{}{}", id, SIDECAR_SUFFIX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{LAST_MODIFIED, MIME_TYPE, ORIGINAL_FILENAME, SIZE, UPLOAD_DATE};
    use serde_json::json;
    use std::fs as std_fs;
    use tempfile::TempDir;

    /// Helper to create a store rooted in a fresh temporary directory
    async fn create_test_store(limit: u64) -> (TempDir, SubmissionStore) {
        let temp = TempDir::new().unwrap();
        let cfg = StoreConfig::new(temp.path().to_path_buf(), limit).unwrap();
        let store = SubmissionStore::new(Arc::new(cfg));
        store.ensure_directories().await.unwrap();
        (temp, store)
    }

    fn record(value: Value) -> MetadataRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    async fn read_all(content: StoredContent) -> Vec<u8> {
        let mut buf = Vec::new();
        content.into_file().read_to_end(&mut buf).await.unwrap();
        buf
    }

    fn sidecar_file(temp: &TempDir, id: &SubmissionId) -> PathBuf {
        temp.path()
            .join("metadata")
            .join(format!("{}.json", id))
    }

    #[tokio::test]
    async fn test_ensure_directories_creates_layout() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("root");
        let store = SubmissionStore::new(Arc::new(StoreConfig::new(root.clone(), 10).unwrap()));

        store.ensure_directories().await.unwrap();
        assert!(root.join("uploads").is_dir());
        assert!(root.join("metadata").is_dir());

        // Idempotent
        store.ensure_directories().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_text_round_trip() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store.submit_text("hello world", None).await.unwrap();

        assert!(receipt.id.as_str().ends_with(".txt"));
        assert_eq!(receipt.size, 11);
        assert_eq!(receipt.original_name, None);
        assert_eq!(store.get_content(&receipt.id).await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_submit_text_keeps_whitespace() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store.submit_text("  indented\n", None).await.unwrap();
        assert_eq!(store.get_content(&receipt.id).await.unwrap(), b"  indented\n");
    }

    #[tokio::test]
    async fn test_submit_text_rejects_blank() {
        let (temp, store) = create_test_store(1024).await;

        for blank in ["", "   ", "\n\t"] {
            let result = store.submit_text(blank, None).await;
            assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        }
        assert_eq!(std_fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_submit_text_with_metadata() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_text("note", Some(record(json!({"owner": "bob"}))))
            .await
            .unwrap();
        let meta = store.get_metadata(&receipt.id).await.unwrap();

        assert_eq!(meta.get("owner"), Some(&json!("bob")));
        assert_eq!(meta.get(MIME_TYPE), Some(&json!("text/plain")));
        assert_eq!(meta.get(SIZE), Some(&json!(4)));
        assert!(meta.contains_key(UPLOAD_DATE));
        assert!(!meta.contains_key(ORIGINAL_FILENAME));
    }

    #[tokio::test]
    async fn test_submit_content_without_metadata_has_no_sidecar() {
        let (temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_content(b"\x89PNG", Some("cat.png"), Some("image/png"), None)
            .await
            .unwrap();

        assert!(receipt.id.as_str().ends_with(".png"));
        assert_eq!(receipt.original_name.as_deref(), Some("cat.png"));
        assert!(!sidecar_file(&temp, &receipt.id).exists());
        assert!(matches!(
            store.get_metadata(&receipt.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_content_with_metadata_writes_derived_fields() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_content(
                b"a,b\n1,2\n",
                Some("data.csv"),
                Some("text/csv"),
                Some(record(json!({"owner": "bob", "size": 1}))),
            )
            .await
            .unwrap();
        let meta = store.get_metadata(&receipt.id).await.unwrap();

        assert_eq!(meta.get(ORIGINAL_FILENAME), Some(&json!("data.csv")));
        assert_eq!(meta.get(MIME_TYPE), Some(&json!("text/csv")));
        assert_eq!(meta.get(SIZE), Some(&json!(8)));
        assert_eq!(meta.get("owner"), Some(&json!("bob")));
    }

    #[tokio::test]
    async fn test_submit_content_defaults_media_type() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_content(b"blob", None, None, Some(MetadataRecord::new()))
            .await
            .unwrap();
        let meta = store.get_metadata(&receipt.id).await.unwrap();

        assert_eq!(meta.get(MIME_TYPE), Some(&json!("application/octet-stream")));
        assert_eq!(receipt.id.extension(), None);
    }

    #[tokio::test]
    async fn test_submit_content_survives_sidecar_write_failure() {
        let (temp, store) = create_test_store(1024).await;
        std_fs::remove_dir(temp.path().join("metadata")).unwrap();

        let receipt = store
            .submit_content(b"kept", Some("a.txt"), None, Some(MetadataRecord::new()))
            .await
            .unwrap();

        assert_eq!(store.get_content(&receipt.id).await.unwrap(), b"kept");
        assert!(store.get_metadata(&receipt.id).await.is_err());
    }

    #[tokio::test]
    async fn test_streamed_upload_rejects_oversized_content() {
        let (temp, store) = create_test_store(8).await;

        let mut pending = store.begin_upload(Some("big.bin")).await.unwrap();
        pending.write_chunk(b"12345").await.unwrap();
        assert_eq!(pending.bytes_written(), 5);

        let result = pending.write_chunk(b"6789").await;
        assert!(matches!(
            result,
            Err(StoreError::PayloadTooLarge { limit: 8 })
        ));
        assert_eq!(std_fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_streamed_upload_in_chunks() {
        let (_temp, store) = create_test_store(64).await;

        let mut pending = store.begin_upload(Some("parts.txt")).await.unwrap();
        let chunks: [&[u8]; 3] = [b"one ", b"two ", b"three"];
        for chunk in chunks {
            pending.write_chunk(chunk).await.unwrap();
        }
        let receipt = store
            .finish_upload(pending, Some("text/plain"), None)
            .await
            .unwrap();

        assert_eq!(receipt.size, 13);
        assert_eq!(
            store.get_content(&receipt.id).await.unwrap(),
            b"one two three"
        );
    }

    #[tokio::test]
    async fn test_dropped_upload_is_removed() {
        let (temp, store) = create_test_store(64).await;

        let mut pending = store.begin_upload(Some("half.txt")).await.unwrap();
        pending.write_chunk(b"half").await.unwrap();
        drop(pending);

        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(std_fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_finished_upload_survives_drop() {
        let (_temp, store) = create_test_store(64).await;

        let receipt = store.submit_content(b"kept", None, None, None).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, receipt.id);
    }

    #[tokio::test]
    async fn test_open_content_head_then_stream() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store.submit_text("hello world", None).await.unwrap();
        let mut content = store.open_content(&receipt.id).await.unwrap();

        assert_eq!(content.size(), 11);
        assert_eq!(content.head(5).await.unwrap(), b"hello");
        assert_eq!(content.head(64).await.unwrap(), b"hello world");
        assert_eq!(read_all(content).await, b"hello world");
    }

    #[tokio::test]
    async fn test_open_content_not_found() {
        let (_temp, store) = create_test_store(1024).await;
        let id = SubmissionId::parse("missing.bin").unwrap();

        assert!(matches!(
            store.open_content(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_aborted_upload_leaves_nothing() {
        let (temp, store) = create_test_store(64).await;

        let mut pending = store.begin_upload(Some("x.txt")).await.unwrap();
        pending.write_chunk(b"partial").await.unwrap();
        pending.abort().await;

        assert_eq!(std_fs::read_dir(temp.path().join("uploads")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_list_reports_metadata_best_effort() {
        let (temp, store) = create_test_store(1024).await;

        let plain = store.submit_text("no metadata", None).await.unwrap();
        let tagged = store
            .submit_text("tagged", Some(record(json!({"tag": "a"}))))
            .await
            .unwrap();
        let corrupt = store
            .submit_text("corrupt", Some(MetadataRecord::new()))
            .await
            .unwrap();
        std_fs::write(sidecar_file(&temp, &corrupt.id), "{broken").unwrap();

        let mut listed = store.list().await.unwrap();
        listed.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(listed.len(), 3);
        let find = |id: &SubmissionId| listed.iter().find(|l| &l.id == id).unwrap();
        assert!(find(&plain.id).metadata.is_none());
        assert!(find(&corrupt.id).metadata.is_none());
        assert_eq!(
            find(&tagged.id).metadata.as_ref().unwrap().get("tag"),
            Some(&json!("a"))
        );
    }

    #[tokio::test]
    async fn test_list_without_uploads_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = SubmissionStore::new(Arc::new(
            StoreConfig::new(temp.path().join("missing"), 10).unwrap(),
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_metadata_invalid_format() {
        let (temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_text("x", Some(MetadataRecord::new()))
            .await
            .unwrap();
        std_fs::write(sidecar_file(&temp, &receipt.id), "[1,2,3]").unwrap();

        assert!(matches!(
            store.get_metadata(&receipt.id).await,
            Err(StoreError::InvalidFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_update_metadata_merges() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store.submit_text("x", None).await.unwrap();
        store
            .update_metadata(&receipt.id, json!({"tag": "a", "owner": "bob"}))
            .await
            .unwrap();

        let merged = store
            .update_metadata(&receipt.id, json!({"tag": "x"}))
            .await
            .unwrap();

        assert_eq!(merged.get("tag"), Some(&json!("x")));
        assert_eq!(merged.get("owner"), Some(&json!("bob")));
        assert!(merged.get(LAST_MODIFIED).is_some_and(Value::is_string));
        assert_eq!(merged.len(), 3);
        assert_eq!(store.get_metadata(&receipt.id).await.unwrap(), merged);
    }

    #[tokio::test]
    async fn test_update_metadata_preserves_system_fields() {
        let (_temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_content(b"pdf", Some("cv.pdf"), None, Some(MetadataRecord::new()))
            .await
            .unwrap();
        let before = store.get_metadata(&receipt.id).await.unwrap();

        let merged = store
            .update_metadata(
                &receipt.id,
                json!({"originalFilename": "other.exe", "uploadDate": "yesterday"}),
            )
            .await
            .unwrap();

        assert_eq!(merged.get(ORIGINAL_FILENAME), Some(&json!("cv.pdf")));
        assert_eq!(merged.get(UPLOAD_DATE), before.get(UPLOAD_DATE));
    }

    #[tokio::test]
    async fn test_update_metadata_replaces_corrupt_sidecar() {
        let (temp, store) = create_test_store(1024).await;

        let receipt = store
            .submit_text("x", Some(MetadataRecord::new()))
            .await
            .unwrap();
        std_fs::write(sidecar_file(&temp, &receipt.id), "not json").unwrap();

        let merged = store
            .update_metadata(&receipt.id, json!({"tag": "fresh"}))
            .await
            .unwrap();
        assert_eq!(merged.get("tag"), Some(&json!("fresh")));
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_update_metadata_requires_artifact() {
        let (_temp, store) = create_test_store(1024).await;
        let id = SubmissionId::parse("2024-01-01T00-00-00-000Z-deadbeef.txt").unwrap();

        let result = store.update_metadata(&id, json!({"tag": "x"})).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_metadata_rejects_non_object() {
        let (_temp, store) = create_test_store(1024).await;
        let receipt = store.submit_text("x", None).await.unwrap();

        let result = store.update_metadata(&receipt.id, json!(["tag"])).await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_content_not_found() {
        let (_temp, store) = create_test_store(1024).await;
        let id = SubmissionId::parse("missing.txt").unwrap();

        assert!(matches!(
            store.get_content(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_uses_original_filename() {
        let (_temp, store) = create_test_store(1024).await;

        let named = store
            .submit_content(b"doc", Some("Report Q1.docx"), None, Some(MetadataRecord::new()))
            .await
            .unwrap();
        let anonymous = store.submit_text("plain", None).await.unwrap();

        let download = store.download(&named.id).await.unwrap();
        assert_eq!(download.filename, "Report Q1.docx");
        assert_eq!(download.content.size(), 3);
        assert_eq!(read_all(download.content).await, b"doc");

        let download = store.download(&anonymous.id).await.unwrap();
        assert_eq!(download.filename, anonymous.id.to_string());
    }

    #[tokio::test]
    async fn test_search_any_field_and_single_field() {
        let (_temp, store) = create_test_store(1024).await;

        let bob = store
            .submit_text("1", Some(record(json!({"owner": "Bob", "note": "x"}))))
            .await
            .unwrap();
        let mention = store
            .submit_text("2", Some(record(json!({"owner": "alice", "note": "for BOB"}))))
            .await
            .unwrap();
        store
            .submit_text("3", Some(record(json!({"owner": "carol"}))))
            .await
            .unwrap();
        store.submit_text("bob but no metadata", None).await.unwrap();

        let mut any: Vec<_> = store
            .search("bob", None)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.id)
            .collect();
        any.sort();
        let mut expected = vec![bob.id.clone(), mention.id.clone()];
        expected.sort();
        assert_eq!(any, expected);

        let owner_only = store.search("bob", Some("owner")).await.unwrap();
        assert_eq!(owner_only.len(), 1);
        assert_eq!(owner_only[0].id, bob.id);
        assert_eq!(owner_only[0].metadata.get("owner"), Some(&json!("Bob")));
    }

    #[tokio::test]
    async fn test_search_skips_orphans_and_corrupt_sidecars() {
        let (temp, store) = create_test_store(1024).await;

        let orphan = store
            .submit_text("gone", Some(record(json!({"owner": "bob"}))))
            .await
            .unwrap();
        std_fs::remove_file(temp.path().join("uploads").join(orphan.id.as_str())).unwrap();

        let corrupt = store
            .submit_text("broken", Some(record(json!({"owner": "bob"}))))
            .await
            .unwrap();
        std_fs::write(sidecar_file(&temp, &corrupt.id), "{\"owner\": \"bob\"").unwrap();

        std_fs::write(temp.path().join("metadata").join("stray.txt"), "bob").unwrap();

        assert!(store.search("bob", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let (_temp, store) = create_test_store(1024).await;
        assert!(matches!(
            store.search("  ", None).await,
            Err(StoreError::InvalidInput(_))
        ));
    }
}
