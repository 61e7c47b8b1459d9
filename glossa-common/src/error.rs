//! Common error types for glossa

use thiserror::Error;

/// Common result type for glossa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the glossa crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying SQLite error is lock contention that
    /// may succeed on a later attempt.
    pub fn is_database_locked(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_locks() {
        assert!(!Error::Internal("database is locked".to_string()).is_database_locked());
        assert!(!Error::Config("missing".to_string()).is_database_locked());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("empty word list".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty word list");
    }
}
