//! Metadata records and the rules for building, merging and matching them.
//!
//! A record is an arbitrary JSON object. A handful of keys are owned by the store and written
//! on the caller's behalf:
//!
//! | Key                | Written by           | Survives updates          |
//! |--------------------|----------------------|---------------------------|
//! | `originalFilename` | file submissions     | yes, always re-asserted   |
//! | `mimeType`         | every submission     | no                        |
//! | `size`             | every submission     | no                        |
//! | `uploadDate`       | every submission     | yes, always re-asserted   |
//! | `lastModified`     | every update         | replaced on each update   |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use submit_ids::timestamp_string;

/// A metadata sidecar: string keys mapped to arbitrary JSON values.
pub type MetadataRecord = Map<String, Value>;

pub const ORIGINAL_FILENAME: &str = "originalFilename";
pub const MIME_TYPE: &str = "mimeType";
pub const SIZE: &str = "size";
pub const UPLOAD_DATE: &str = "uploadDate";
pub const LAST_MODIFIED: &str = "lastModified";

/// Keys whose prior value always wins over an update.
const REASSERTED_FIELDS: [&str; 2] = [ORIGINAL_FILENAME, UPLOAD_DATE];

/// Parses caller-supplied metadata text, falling back to an empty record.
///
/// Submissions never fail because of bad metadata: invalid JSON, or JSON that is not an
/// object, is logged and replaced with `{}`.
pub fn parse_lenient(raw: &str) -> MetadataRecord {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => from_value_lenient(value),
        Err(e) => {
            tracing::warn!("Error parsing metadata JSON: {}", e);
            MetadataRecord::new()
        }
    }
}

/// Same as [`parse_lenient`] for an already-decoded JSON value.
pub fn from_value_lenient(value: Value) -> MetadataRecord {
    match value {
        Value::Object(map) => map,
        other => {
            tracing::warn!("Ignoring metadata that is not a JSON object: {}", other);
            MetadataRecord::new()
        }
    }
}

/// Stamps the store-owned fields onto a fresh submission's record.
pub fn apply_derived_fields(
    record: &mut MetadataRecord,
    original_filename: Option<&str>,
    mime_type: &str,
    size: u64,
    at: DateTime<Utc>,
) {
    if let Some(name) = original_filename {
        record.insert(ORIGINAL_FILENAME.into(), Value::from(name));
    }
    record.insert(MIME_TYPE.into(), Value::from(mime_type));
    record.insert(SIZE.into(), Value::from(size));
    record.insert(UPLOAD_DATE.into(), Value::from(timestamp_string(at)));
}

/// Shallow-merges `update` over `prior`.
///
/// Keys in `update` overwrite keys in `prior`, except `originalFilename` and `uploadDate`,
/// which keep their prior value whenever `prior` had one. `lastModified` is set to `at`.
pub fn merge(prior: MetadataRecord, update: MetadataRecord, at: DateTime<Utc>) -> MetadataRecord {
    let preserved: Vec<(&str, Value)> = REASSERTED_FIELDS
        .iter()
        .filter_map(|key| prior.get(*key).map(|v| (*key, v.clone())))
        .collect();

    let mut merged = prior;
    merged.extend(update);

    for (key, value) in preserved {
        merged.insert(key.into(), value);
    }
    merged.insert(LAST_MODIFIED.into(), Value::from(timestamp_string(at)));

    merged
}

/// Returns the recorded original filename, if it is a non-empty string.
pub fn original_filename(record: &MetadataRecord) -> Option<&str> {
    record
        .get(ORIGINAL_FILENAME)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

/// Case-insensitive substring match against one field, or any field when `field` is `None`.
///
/// `needle` must already be lowercased.
pub fn matches(record: &MetadataRecord, needle: &str, field: Option<&str>) -> bool {
    match field {
        Some(key) => record
            .get(key)
            .is_some_and(|value| value_contains(value, needle)),
        None => record.values().any(|value| value_contains(value, needle)),
    }
}

fn value_contains(value: &Value, needle: &str) -> bool {
    let text = match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    text.contains(needle)
}
