use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::summary::Summary;

/// Identity an upload and its history are scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque handle to a raw file held by a blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One retained upload: raw file reference plus the summary computed at
/// admission time. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: Uuid,
    pub owner: OwnerId,
    pub file_reference: BlobRef,
    /// Filename supplied by the uploader, used in reports
    pub dataset_filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub summary: Summary,
}

impl UploadRecord {
    pub fn entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            file_reference: self.file_reference.clone(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// History listing item. Deliberately carries no summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub file_reference: BlobRef,
    pub uploaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_entry_json_has_no_summary() {
        let record = UploadRecord {
            id: Uuid::new_v4(),
            owner: OwnerId::from("alice"),
            file_reference: BlobRef::new("datasets/alice/x.csv"),
            dataset_filename: "x.csv".to_string(),
            uploaded_at: Utc::now(),
            summary: Summary::empty(),
        };

        let value = serde_json::to_value(record.entry()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(value["file_reference"], "datasets/alice/x.csv");
        assert!(value.get("summary").is_none());
    }
}
