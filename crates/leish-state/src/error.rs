//! Error types for leish-state

use thiserror::Error;

/// Errors raised while opening or preparing a store
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}

/// Errors raised by a single repository operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend refused or failed the operation
    #[error("storage backend error: {0}")]
    Backend(String),

    /// No row stored under the key
    #[error("sample not found: {key}")]
    NotFound { key: String },

    /// A stored row could not be converted to or from the domain model
    #[error("stored sample is malformed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_serialization_failures() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(StorageError::from(err), StorageError::Serialization(_)));
    }

    #[test]
    fn not_found_names_the_key() {
        let err = StorageError::NotFound {
            key: "abc#3".to_string(),
        };
        assert_eq!(err.to_string(), "sample not found: abc#3");
    }
}
