// ============================================================
// UPLOAD HISTORY STORE
// ============================================================
// Bounded per-owner retention of upload records

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};
use crate::domain::summary::Summary;
use crate::domain::upload::{BlobRef, HistoryEntry, OwnerId, UploadRecord};
use crate::infrastructure::db::HistoryRepository;
use crate::infrastructure::storage::BlobStore;

/// Keeps at most `max_history` upload records per owner, evicting the
/// oldest (and its raw file) to make room for a new one.
pub struct HistoryStore {
    repository: Arc<dyn HistoryRepository>,
    blobs: Arc<dyn BlobStore>,
    max_history: usize,
}

impl HistoryStore {
    pub fn new(
        repository: Arc<dyn HistoryRepository>,
        blobs: Arc<dyn BlobStore>,
        max_history: usize,
    ) -> Result<Self> {
        if max_history == 0 {
            return Err(AppError::ConfigError(
                "max_history must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            repository,
            blobs,
            max_history,
        })
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Admit a new record, evicting the oldest ones first if the owner is
    /// at capacity. `requested_at` is bumped past the newest retained
    /// record when it would not be strictly later.
    pub fn admit(
        &self,
        owner: &OwnerId,
        file_reference: BlobRef,
        dataset_filename: &str,
        summary: Summary,
        requested_at: DateTime<Utc>,
    ) -> Result<UploadRecord> {
        let existing = self.repository.list_by_owner(owner)?;

        let uploaded_at = match existing.last() {
            Some(newest) if requested_at <= newest.uploaded_at => {
                newest.uploaded_at + Duration::milliseconds(1)
            }
            _ => requested_at,
        };

        if existing.len() >= self.max_history {
            let excess = existing.len() - self.max_history + 1;
            self.evict_oldest(owner, excess)?;
        }

        let record = UploadRecord {
            id: Uuid::new_v4(),
            owner: owner.clone(),
            file_reference,
            dataset_filename: dataset_filename.to_string(),
            uploaded_at,
            summary,
        };
        self.repository.insert(&record)?;

        info!(
            owner = %owner,
            record_id = %record.id,
            file_reference = %record.file_reference,
            total_equipment = record.summary.total_count,
            "Admitted upload"
        );

        Ok(record)
    }

    /// Owner's history, newest first, without summaries.
    pub fn list(&self, owner: &OwnerId) -> Result<Vec<HistoryEntry>> {
        let records = self.repository.list_by_owner(owner)?;
        Ok(records.iter().rev().map(UploadRecord::entry).collect())
    }

    /// Most recent record for `owner`, or `NotFound` when there is none.
    pub fn latest(&self, owner: &OwnerId) -> Result<UploadRecord> {
        self.repository
            .list_by_owner(owner)?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("No uploads found for owner {}", owner)))
    }

    pub fn get(&self, id: Uuid) -> Result<UploadRecord> {
        self.repository.get(id)
    }

    /// Remove the `n` oldest records of `owner`, returning their ids.
    pub fn evict_oldest(&self, owner: &OwnerId, n: usize) -> Result<Vec<Uuid>> {
        let records = self.repository.list_by_owner(owner)?;
        let mut evicted = Vec::with_capacity(n.min(records.len()));

        for record in records.into_iter().take(n) {
            self.release_then_remove(&record)?;
            info!(
                owner = %owner,
                record_id = %record.id,
                uploaded_at = %record.uploaded_at,
                "Evicted upload from history"
            );
            evicted.push(record.id);
        }

        Ok(evicted)
    }

    /// Delete one record and its raw file.
    pub fn delete(&self, record: &UploadRecord) -> Result<()> {
        self.release_then_remove(record)
    }

    fn release_then_remove(&self, record: &UploadRecord) -> Result<()> {
        if let Err(e) = self.blobs.delete(&record.file_reference) {
            warn!(
                error = %e,
                record_id = %record.id,
                file_reference = %record.file_reference,
                "Failed to delete dataset file; removing history record anyway"
            );
        }
        self.repository.remove(record.id)
    }
}
