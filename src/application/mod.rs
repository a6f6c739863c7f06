pub mod use_cases;

pub use use_cases::equipment_analytics::EquipmentAnalytics;
pub use use_cases::history_store::HistoryStore;
pub use use_cases::statistics::aggregate;
pub use use_cases::upload_task::UploadTask;
