//! Equipment dataset analytics: CSV validation, summary statistics,
//! bounded per-owner upload history, and PDF reporting.

pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use app::{start, start_with};
pub use application::{aggregate, EquipmentAnalytics, HistoryStore, UploadTask};
pub use domain::csv::{Dataset, EquipmentRow, NumericColumn, REQUIRED_COLUMNS};
pub use domain::error::{AppError, ErrorKind, Result};
pub use domain::summary::{CategoryCount, Summary};
pub use domain::upload::{BlobRef, HistoryEntry, OwnerId, UploadRecord};
pub use infrastructure::config::AppConfig;
pub use infrastructure::csv::DatasetLoader;
pub use infrastructure::db::{HistoryRepository, MemoryHistoryRepository, SqliteHistoryRepository};
pub use infrastructure::logging::init_tracing;
pub use infrastructure::report::{format_upload_timestamp, ReportRenderer, ReportStyles};
pub use infrastructure::storage::{BlobStore, FsBlobStore, MemoryBlobStore};
