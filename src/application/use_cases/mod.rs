pub mod equipment_analytics;
pub mod history_store;
pub mod statistics;
pub mod upload_task;
