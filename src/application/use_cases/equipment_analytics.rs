// ============================================================
// EQUIPMENT ANALYTICS USE CASE
// ============================================================
// Orchestrate staging, validation, aggregation, retention, and reporting

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::history_store::HistoryStore;
use super::statistics::aggregate;
use crate::domain::error::{AppError, Result};
use crate::domain::summary::{CategoryCount, Summary};
use crate::domain::upload::{BlobRef, HistoryEntry, OwnerId, UploadRecord};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::csv::DatasetLoader;
use crate::infrastructure::db::{HistoryRepository, SqliteHistoryRepository};
use crate::infrastructure::report::ReportRenderer;
use crate::infrastructure::storage::{BlobStore, FsBlobStore};

const ALLOWED_EXTENSION: &str = "csv";

/// Validate → aggregate → retain → render pipeline.
///
/// Every call is synchronous. Uploads for different owners may run
/// concurrently; uploads for the same owner are not coordinated.
pub struct EquipmentAnalytics {
    config: AppConfig,
    loader: DatasetLoader,
    history: HistoryStore,
    blobs: Arc<dyn BlobStore>,
    renderer: ReportRenderer,
}

impl EquipmentAnalytics {
    pub fn new(
        config: AppConfig,
        repository: Arc<dyn HistoryRepository>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        config.validate()?;
        let history = HistoryStore::new(repository, blobs.clone(), config.max_history)?;

        Ok(Self {
            config,
            loader: DatasetLoader::new(),
            history,
            blobs,
            renderer: ReportRenderer::new(),
        })
    }

    /// Filesystem-backed pipeline rooted at `config.data_dir`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let blobs = FsBlobStore::new(&config.data_dir)?;
        let repository = SqliteHistoryRepository::open(blobs.layout().history_db_path())?;
        info!(
            data_dir = %config.data_dir.display(),
            max_history = config.max_history,
            "Equipment analytics initialized"
        );
        Self::new(config, Arc::new(repository), Arc::new(blobs))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    /// Upload a dataset stamped with the current time.
    pub fn upload(&self, owner: &OwnerId, filename: &str, bytes: &[u8]) -> Result<UploadRecord> {
        self.upload_at(owner, filename, bytes, Utc::now())
    }

    /// Stage, validate, aggregate, and admit one dataset.
    ///
    /// Any failure after staging deletes the staged file before the error
    /// is returned; no record is admitted.
    pub fn upload_at(
        &self,
        owner: &OwnerId,
        filename: &str,
        bytes: &[u8],
        requested_at: DateTime<Utc>,
    ) -> Result<UploadRecord> {
        let start = Instant::now();
        self.check_admission(filename, bytes)?;

        let staged = self.blobs.put(owner, filename, bytes)?;

        match self.process_staged(owner, filename, &staged, requested_at) {
            Ok(record) => {
                info!(
                    owner = %owner,
                    record_id = %record.id,
                    rows = record.summary.total_count,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Dataset upload completed"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&staged) {
                    warn!(
                        error = %cleanup,
                        file_reference = %staged,
                        "Failed to delete staged dataset"
                    );
                }
                error!(error = %e, owner = %owner, filename, "Dataset upload rejected");
                Err(e)
            }
        }
    }

    fn check_admission(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let is_csv = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(ALLOWED_EXTENSION))
            .unwrap_or(false);
        if !is_csv {
            return Err(AppError::ValidationError(format!(
                "Only CSV files are allowed: {}",
                filename
            )));
        }

        if bytes.len() as u64 > self.config.max_upload_bytes {
            return Err(AppError::ValidationError(format!(
                "File size {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.config.max_upload_bytes
            )));
        }

        Ok(())
    }

    fn process_staged(
        &self,
        owner: &OwnerId,
        filename: &str,
        staged: &BlobRef,
        requested_at: DateTime<Utc>,
    ) -> Result<UploadRecord> {
        let raw = self.blobs.read(staged)?;
        let dataset = self.loader.validate(&raw)?;
        let summary = aggregate(&dataset);
        self.history
            .admit(owner, staged.clone(), filename, summary, requested_at)
    }

    /// Validate and aggregate without staging or retaining anything.
    pub fn analyze(&self, bytes: &[u8]) -> Result<Summary> {
        let dataset = self.loader.validate(bytes)?;
        Ok(aggregate(&dataset))
    }

    /// Summary of the owner's most recent upload.
    pub fn latest_summary(&self, owner: &OwnerId) -> Result<Summary> {
        Ok(self.history.latest(owner)?.summary)
    }

    pub fn latest_distribution(&self, owner: &OwnerId) -> Result<Vec<CategoryCount>> {
        Ok(self.history.latest(owner)?.summary.distribution)
    }

    /// Newest-first history listing.
    pub fn history(&self, owner: &OwnerId) -> Result<Vec<HistoryEntry>> {
        self.history.list(owner)
    }

    /// PDF report for the owner's most recent upload.
    pub fn report(&self, owner: &OwnerId) -> Result<Vec<u8>> {
        let record = self.history.latest(owner)?;
        self.render_record(&record, Utc::now())
    }

    /// PDF report with an explicit render time.
    pub fn report_at(&self, owner: &OwnerId, rendered_at: DateTime<Utc>) -> Result<Vec<u8>> {
        let record = self.history.latest(owner)?;
        self.render_record(&record, rendered_at)
    }

    fn render_record(&self, record: &UploadRecord, rendered_at: DateTime<Utc>) -> Result<Vec<u8>> {
        self.renderer.render_at(
            &record.dataset_filename,
            &record.uploaded_at.to_rfc3339(),
            &record.summary,
            &record.summary.distribution,
            rendered_at,
        )
    }

    /// Delete one of the owner's uploads together with its raw file.
    pub fn delete_upload(&self, owner: &OwnerId, id: Uuid) -> Result<()> {
        let record = self.history.get(id)?;
        if &record.owner != owner {
            return Err(AppError::NotFound(format!("Upload record not found: {}", id)));
        }
        self.history.delete(&record)?;
        info!(owner = %owner, record_id = %id, "Deleted upload");
        Ok(())
    }
}
