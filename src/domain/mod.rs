pub mod csv;
pub mod error;
pub mod summary;
pub mod upload;
