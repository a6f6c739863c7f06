pub mod artifact_store;
pub mod config;
pub mod csv;
pub mod db;
pub mod logging;
pub mod report;
pub mod storage;
