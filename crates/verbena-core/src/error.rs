//! Error types for Verbena

use thiserror::Error;

/// Main error type for Verbena operations
#[derive(Error, Debug)]
pub enum VerbenaError {
    /// An image failed to load and is now in the permanent-failure set
    #[error("Image failed to load: {name}")]
    ImageLoad { name: String },

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Image bytes could not be decoded
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An external submission sink failed or returned non-2xx
    #[error("Sink error: {0}")]
    Sink(String),

    /// A background rotation step could not resolve a display reference
    #[error("Rotation error: {0}")]
    Rotation(String),

    /// RSVP name was empty after trimming
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using VerbenaError
pub type VerbenaResult<T> = Result<T, VerbenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VerbenaError::ImageLoad {
            name: "shrek.jpg".to_string(),
        };
        assert_eq!(format!("{}", err), "Image failed to load: shrek.jpg");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: VerbenaError = io_err.into();
        assert!(matches!(err, VerbenaError::Io(_)));
    }
}
