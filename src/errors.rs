// src/errors.rs
// DOCUMENTATION: Custom error types for the storage layer
// PURPOSE: Centralized error handling for both storage backends

use thiserror::Error;

/// Storage-specific error types
/// DOCUMENTATION: Driver errors are wrapped, never translated, so callers
/// can still match on the underlying sqlx error
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No active session: reload() must be called first")]
    NoSession,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<validator::ValidationErrors> for StorageError {
    fn from(errors: validator::ValidationErrors) -> Self {
        StorageError::Validation(errors.to_string())
    }
}

impl StorageError {
    /// True for failures raised by the database driver itself
    /// (connectivity, integrity, syntax)
    pub fn is_database(&self) -> bool {
        matches!(self, StorageError::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StorageError::NoSession.to_string(),
            "No active session: reload() must be called first"
        );
        assert_eq!(
            StorageError::Config("HBNB_MYSQL_USER is required".into()).to_string(),
            "Configuration error: HBNB_MYSQL_USER is required"
        );
    }

    #[test]
    fn test_database_errors_are_wrapped() {
        let err: StorageError = sqlx::Error::RowNotFound.into();
        assert!(err.is_database());
        assert!(matches!(err, StorageError::Database(sqlx::Error::RowNotFound)));
        assert!(!StorageError::NoSession.is_database());
    }
}
