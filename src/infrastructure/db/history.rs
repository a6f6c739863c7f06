use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::DateTime;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::FromRow;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::error::{AppError, Result};
use crate::domain::summary::{CategoryCount, Summary};
use crate::domain::upload::{BlobRef, OwnerId, UploadRecord};

/// Persistence for upload records.
///
/// `list_by_owner` returns records oldest-first by `uploaded_at`.
pub trait HistoryRepository: Send + Sync {
    fn insert(&self, record: &UploadRecord) -> Result<()>;

    fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UploadRecord>>;

    fn get(&self, id: Uuid) -> Result<UploadRecord>;

    /// Remove a record. Removing an unknown id is a no-op.
    fn remove(&self, id: Uuid) -> Result<()>;
}

fn lock_poisoned() -> AppError {
    AppError::StorageError("History lock poisoned".to_string())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Upload record not found: {}", id))
}

fn owned_oldest_first(records: &[UploadRecord], owner: &OwnerId) -> Vec<UploadRecord> {
    let mut owned: Vec<UploadRecord> = records
        .iter()
        .filter(|record| &record.owner == owner)
        .cloned()
        .collect();
    owned.sort_by_key(|record| record.uploaded_at);
    owned
}

// ============================================================
// IN-MEMORY REPOSITORY
// ============================================================

#[derive(Default)]
pub struct MemoryHistoryRepository {
    records: Mutex<Vec<UploadRecord>>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<UploadRecord>>> {
        self.records.lock().map_err(|_| lock_poisoned())
    }
}

impl HistoryRepository for MemoryHistoryRepository {
    fn insert(&self, record: &UploadRecord) -> Result<()> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UploadRecord>> {
        Ok(owned_oldest_first(&self.lock()?, owner))
    }

    fn get(&self, id: Uuid) -> Result<UploadRecord> {
        self.lock()?
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        self.lock()?.retain(|record| record.id != id);
        Ok(())
    }
}

// ============================================================
// SQLITE REPOSITORY
// ============================================================

const CREATE_UPLOADS_TABLE: &str = "CREATE TABLE IF NOT EXISTS uploads (
    id TEXT PRIMARY KEY NOT NULL,
    owner TEXT NOT NULL,
    file_reference TEXT NOT NULL,
    dataset_filename TEXT NOT NULL,
    uploaded_secs INTEGER NOT NULL,
    uploaded_nanos INTEGER NOT NULL,
    total_count INTEGER NOT NULL,
    average_flowrate REAL NOT NULL,
    average_pressure REAL NOT NULL,
    average_temperature REAL NOT NULL,
    distribution_json TEXT NOT NULL
)";

const CREATE_OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_uploads_owner
    ON uploads (owner, uploaded_secs, uploaded_nanos)";

const SELECT_COLUMNS: &str = "SELECT id, owner, file_reference, dataset_filename, uploaded_secs,
    uploaded_nanos, total_count, average_flowrate, average_pressure, average_temperature,
    distribution_json FROM uploads";

/// Repository keeping one SQLite row per upload record.
///
/// The API is synchronous; queries run on a private runtime. Call it from a
/// plain thread or from `spawn_blocking`, never directly inside an async task.
/// A row that no longer decodes is skipped when listing, so one bad record
/// never hides the rest of the history.
pub struct SqliteHistoryRepository {
    pool: SqlitePool,
    runtime: Option<Runtime>,
}

impl SqliteHistoryRepository {
    pub fn open(db_path: &Path) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("history-db")
            .enable_all()
            .build()
            .map_err(|e| AppError::StorageError(format!("Failed to start history runtime: {e}")))?;

        let db_url = db_path_to_url(db_path)?;
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| AppError::StorageError(format!("Failed to parse history DB URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = runtime.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Duration::from_secs(5))
                .connect_with(options)
                .await
                .map_err(|e| AppError::StorageError(format!("Failed to connect history DB: {e}")))?;

            for statement in [CREATE_UPLOADS_TABLE, CREATE_OWNER_INDEX] {
                sqlx::query(statement).execute(&pool).await.map_err(|e| {
                    AppError::StorageError(format!("Failed to prepare history schema: {e}"))
                })?;
            }
            Ok::<_, AppError>(pool)
        })?;

        debug!(path = %db_path.display(), "Opened history database");

        Ok(Self {
            pool,
            runtime: Some(runtime),
        })
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| AppError::Internal("History runtime already shut down".to_string()))?;
        Ok(runtime.block_on(future))
    }
}

impl Drop for SqliteHistoryRepository {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_err() {
                runtime.block_on(self.pool.close());
            }
            runtime.shutdown_background();
        }
    }
}

impl HistoryRepository for SqliteHistoryRepository {
    fn insert(&self, record: &UploadRecord) -> Result<()> {
        let distribution_json = serde_json::to_string(&record.summary.distribution)?;
        let total_count = i64::try_from(record.summary.total_count).map_err(|_| {
            AppError::StorageError(format!(
                "Row count out of range: {}",
                record.summary.total_count
            ))
        })?;

        self.block_on(
            sqlx::query(
                "INSERT INTO uploads (id, owner, file_reference, dataset_filename, uploaded_secs,
                 uploaded_nanos, total_count, average_flowrate, average_pressure,
                 average_temperature, distribution_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(record.id.to_string())
            .bind(record.owner.as_str())
            .bind(record.file_reference.as_str())
            .bind(&record.dataset_filename)
            .bind(record.uploaded_at.timestamp())
            .bind(i64::from(record.uploaded_at.timestamp_subsec_nanos()))
            .bind(total_count)
            .bind(record.summary.average_flowrate)
            .bind(record.summary.average_pressure)
            .bind(record.summary.average_temperature)
            .bind(distribution_json)
            .execute(&self.pool),
        )?
        .map_err(|e| AppError::StorageError(format!("Failed to insert upload record: {e}")))?;

        Ok(())
    }

    fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<UploadRecord>> {
        let rows = self
            .block_on(
                sqlx::query(&format!(
                    "{SELECT_COLUMNS} WHERE owner = ? ORDER BY uploaded_secs, uploaded_nanos"
                ))
                .bind(owner.as_str())
                .fetch_all(&self.pool),
            )?
            .map_err(|e| AppError::StorageError(format!("Failed to list upload records: {e}")))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match decode_row(&row) {
                Ok(record) => records.push(record),
                Err(e) => warn!(owner = %owner, error = %e, "Skipping unreadable upload record"),
            }
        }
        Ok(records)
    }

    fn get(&self, id: Uuid) -> Result<UploadRecord> {
        let row = self
            .block_on(
                sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
                    .bind(id.to_string())
                    .fetch_optional(&self.pool),
            )?
            .map_err(|e| AppError::StorageError(format!("Failed to fetch upload record: {e}")))?;

        match row {
            Some(row) => decode_row(&row),
            None => Err(not_found(id)),
        }
    }

    fn remove(&self, id: Uuid) -> Result<()> {
        self.block_on(
            sqlx::query("DELETE FROM uploads WHERE id = ?")
                .bind(id.to_string())
                .execute(&self.pool),
        )?
        .map_err(|e| AppError::StorageError(format!("Failed to delete upload record: {e}")))?;

        Ok(())
    }
}

fn db_path_to_url(db_path: &Path) -> Result<String> {
    let db_path_str = db_path.to_str().ok_or_else(|| {
        AppError::StorageError("History database path is not valid UTF-8".to_string())
    })?;
    Ok(format!("sqlite://{}", db_path_str.replace('\\', "/")))
}

#[derive(sqlx::FromRow)]
struct UploadRecordEntity {
    id: String,
    owner: String,
    file_reference: String,
    dataset_filename: String,
    uploaded_secs: i64,
    uploaded_nanos: i64,
    total_count: i64,
    average_flowrate: f64,
    average_pressure: f64,
    average_temperature: f64,
    distribution_json: String,
}

fn decode_row(row: &SqliteRow) -> Result<UploadRecord> {
    let entity = UploadRecordEntity::from_row(row)
        .map_err(|e| AppError::StorageError(format!("Failed to read upload record: {e}")))?;
    UploadRecord::try_from(entity)
}

impl TryFrom<UploadRecordEntity> for UploadRecord {
    type Error = AppError;

    fn try_from(entity: UploadRecordEntity) -> Result<Self> {
        let corrupt = |what: &str| {
            AppError::StorageError(format!("Upload record {} has invalid {what}", entity.id))
        };

        let id = Uuid::parse_str(&entity.id).map_err(|_| corrupt("id"))?;
        let nanos = u32::try_from(entity.uploaded_nanos).map_err(|_| corrupt("timestamp"))?;
        let uploaded_at =
            DateTime::from_timestamp(entity.uploaded_secs, nanos).ok_or_else(|| corrupt("timestamp"))?;
        let total_count = u64::try_from(entity.total_count).map_err(|_| corrupt("row count"))?;
        let distribution: Vec<CategoryCount> =
            serde_json::from_str(&entity.distribution_json).map_err(|_| corrupt("distribution"))?;

        Ok(Self {
            id,
            owner: OwnerId::new(entity.owner),
            file_reference: BlobRef::new(entity.file_reference),
            dataset_filename: entity.dataset_filename,
            uploaded_at,
            summary: Summary {
                total_count,
                average_flowrate: entity.average_flowrate,
                average_pressure: entity.average_pressure,
                average_temperature: entity.average_temperature,
                distribution,
            },
        })
    }
}
