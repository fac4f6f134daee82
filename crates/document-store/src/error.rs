use common::{DocumentFamily, DocumentId, LineId};
use thiserror::Error;

/// Errors that can occur when interacting with the document or sequence stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The line does not exist.
    #[error("Line not found: {0}")]
    LineNotFound(LineId),

    /// A document or line with this id was already inserted.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// Another document of the same family and entity already holds this reference.
    #[error("Duplicate reference {reference} in family {family}")]
    DuplicateReference {
        family: DocumentFamily,
        reference: String,
    },

    /// The document changed since it was read.
    #[error(
        "Concurrency conflict for document {document_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for failures of the storage backend itself, as opposed to
    /// missing or conflicting records.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_)
                | StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
