//! Reconciliation error types.

use common::DocumentId;
use document_store::StoreError;
use thiserror::Error;

use crate::catalog::CatalogError;

/// Errors that abort a reconciliation.
///
/// Per-line problems are not errors; they are reported as
/// [`LineAnomaly`](crate::LineAnomaly) values on the affected line.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order does not exist or has been removed.
    #[error("Order not found: {0}")]
    NotFound(DocumentId),

    /// An error occurred in the document store.
    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    /// The product catalog could not be queried.
    #[error("Product catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
