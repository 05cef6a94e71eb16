//! Error types and result types for bookshelf storage operations.
//!
//! Every adapter operation returns [`StorageResult<T>`]. Driver errors are folded into
//! [`StorageError`] by the `From` implementations below so adapters can use `?` freely.

use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind};
use sqlx::error::{Error as SqlxError, ErrorKind as SqlxErrorKind};
use thiserror::Error;

/// Represents all possible errors raised while reading or writing a bookshelf.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The file, user row or document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Serialized data is malformed or misses required elements.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The storage backend could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Schema provisioning failed, e.g. a table already exists.
    #[error("Schema error: {0}")]
    Schema(String),
    /// A key or foreign-key constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),
    /// A keyed destination was asked to store a bookshelf whose user has no identifier.
    #[error("Bookshelf user has no identifier; required by {0} storage")]
    MissingUserId(&'static str),
    /// Local file system failure other than a missing file.
    #[error("I/O error: {0}")]
    Io(String),
    /// Any other failure reported by a storage driver.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for bookshelf storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<IoError> for StorageError {
    fn from(err: IoError) -> Self {
        match err.kind() {
            IoErrorKind::NotFound => StorageError::NotFound(err.to_string()),
            _ => StorageError::Io(err.to_string()),
        }
    }
}

impl From<SqlxError> for StorageError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => StorageError::NotFound(err.to_string()),
            SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::Configuration(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed => StorageError::Connection(err.to_string()),
            SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
                StorageError::Parse(err.to_string())
            }
            SqlxError::Database(db) => match db.kind() {
                SqlxErrorKind::UniqueViolation
                | SqlxErrorKind::ForeignKeyViolation
                | SqlxErrorKind::NotNullViolation
                | SqlxErrorKind::CheckViolation => StorageError::Constraint(err.to_string()),
                _ => StorageError::Backend(err.to_string()),
            },
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

impl From<MongoError> for StorageError {
    fn from(err: MongoError) -> Self {
        match err.kind.as_ref() {
            MongoErrorKind::ServerSelection { .. }
            | MongoErrorKind::DnsResolve { .. }
            | MongoErrorKind::Io(_) => StorageError::Connection(err.to_string()),
            MongoErrorKind::BsonDeserialization(_) => StorageError::Parse(err.to_string()),
            _ => StorageError::Backend(err.to_string()),
        }
    }
}

impl From<bson::error::Error> for StorageError {
    fn from(err: bson::error::Error) -> Self {
        StorageError::Parse(err.to_string())
    }
}
