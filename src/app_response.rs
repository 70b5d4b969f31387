//! Response and error types shared by the storage layer and the FFI surface.
//!
//! Internal code works with [`StoreError`]; everything that crosses the FFI
//! boundary is flattened into a JSON-serialized [`AppResponse`].

use std::fmt::{Display, Formatter};

use redb::{CommitError, DatabaseError, Error as RedbError, StorageError, TableError, TransactionError};
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

/// JSON envelope returned by every FFI function.
#[derive(Debug, Serialize, Deserialize)]
pub enum AppResponse {
    DatabaseError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }
}

/// Failure raised by [`LocalStore`](crate::local_store::LocalStore) operations.
///
/// Store unavailability is an expected condition for the bridge layer, which
/// degrades to defaults instead of surfacing it; the variants exist so the
/// degradation paths can log something useful.
#[derive(Debug)]
pub enum StoreError {
    Database(String),
    Serialization(String),
    /// The store was closed or never opened; reads fall back, writes no-op.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<RedbError> for StoreError {
    fn from(err: RedbError) -> Self {
        match err {
            RedbError::TableDoesNotExist(name) => {
                StoreError::Database(format!("Table '{}' not found", name))
            }
            RedbError::Corrupted(msg) => {
                StoreError::Database(format!("Database is corrupted: {}", msg))
            }
            RedbError::Io(io_err) => StoreError::Database(format!("IO error: {}", io_err)),
            _ => StoreError::Database(format!("Database error: {:?}", err)),
        }
    }
}

impl From<SerdeError> for StoreError {
    fn from(err: SerdeError) -> Self {
        StoreError::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        StoreError::Database(format!("Database open error: {}", err))
    }
}

impl From<TransactionError> for StoreError {
    fn from(err: TransactionError) -> Self {
        StoreError::Database(format!("Transaction error: {:?}", err))
    }
}

impl From<TableError> for StoreError {
    fn from(err: TableError) -> Self {
        StoreError::Database(format!("Table operation error: {:?}", err))
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        StoreError::Database(format!("Storage error: {:?}", err))
    }
}

impl From<CommitError> for StoreError {
    fn from(err: CommitError) -> Self {
        StoreError::Database(format!("Commit error: {:?}", err))
    }
}

impl From<StoreError> for AppResponse {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(msg) => AppResponse::DatabaseError(msg),
            StoreError::Serialization(msg) => AppResponse::SerializationError(msg),
            StoreError::Unavailable(msg) => AppResponse::DatabaseError(msg),
        }
    }
}
