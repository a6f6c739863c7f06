use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::csv::REQUIRED_COLUMNS;

/// Machine-checkable category of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Schema,
    Type,
    EmptyInput,
    Parse,
    NotFound,
    Storage,
    Validation,
    Config,
    Internal,
}

#[derive(Debug, Error, Serialize, Deserialize)]
pub enum AppError {
    #[error(
        "Schema error: missing required columns: {}. Required columns are: {}",
        .missing.join(", "),
        REQUIRED_COLUMNS.join(", ")
    )]
    SchemaError { missing: Vec<String> },

    #[error("Type error: column '{column}' must contain only numeric values. Found invalid values: {samples:?}")]
    TypeError { column: String, samples: Vec<String> },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::SchemaError { .. } => ErrorKind::Schema,
            AppError::TypeError { .. } => ErrorKind::Type,
            AppError::EmptyInput(_) => ErrorKind::EmptyInput,
            AppError::ParseError(_) => ErrorKind::Parse,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::StorageError(_) => ErrorKind::Storage,
            AppError::ValidationError(_) => ErrorKind::Validation,
            AppError::ConfigError(_) => ErrorKind::Config,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable detail, identical to the `Display` output.
    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StorageError(format!("Failed to (de)serialize history: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_missing_and_required() {
        let err = AppError::SchemaError {
            missing: vec!["Pressure".to_string(), "Temperature".to_string()],
        };
        let detail = err.detail();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(detail.contains("missing required columns: Pressure, Temperature."));
        assert!(detail.contains(
            "Required columns are: Equipment Name, Type, Flowrate, Pressure, Temperature"
        ));
    }

    #[test]
    fn test_type_error_detail_includes_samples() {
        let err = AppError::TypeError {
            column: "Flowrate".to_string(),
            samples: vec!["abc".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.detail().contains("'Flowrate'"));
        assert!(err.detail().contains("\"abc\""));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(AppError::NotFound("x".to_string()).is_not_found());
    }
}
