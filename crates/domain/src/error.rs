//! Domain error types.

use common::{DocumentFamily, DocumentId, DocumentKind, DocumentStatus, FulfillmentStep, LineId};
use document_store::StoreError;
use fulfillment::FulfillmentError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during document lifecycle operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The document or line does not exist, or has been removed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A counter, document store or catalog could not be reached. Nothing
    /// was written.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A reference collided with an existing one in its family and entity.
    #[error("Duplicate reference {reference} in family {family}")]
    DuplicateReference {
        family: DocumentFamily,
        reference: String,
    },

    /// A record with the same id already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The parent order cannot take this document.
    #[error("Invalid parent order {parent}: {reason}")]
    InvalidParent {
        parent: DocumentId,
        reason: &'static str,
    },

    /// A save tried to change a document's subtype.
    #[error("Document subtype cannot change from {expected} to {found}")]
    SubtypeChanged {
        expected: DocumentKind,
        found: DocumentKind,
    },

    /// Another save landed between reading the document and writing it back.
    #[error("Document {document_id} changed concurrently: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    /// A save tried to rewrite or drop existing history entries.
    #[error("History of document {0} is append-only")]
    HistoryRewritten(DocumentId),

    /// The status does not belong to the document's status family.
    #[error("Status {status} is not valid for {kind}")]
    StatusNotAllowed {
        status: DocumentStatus,
        kind: DocumentKind,
    },

    /// The transition policy refused the transition.
    #[error("Transition from {from} to {to} rejected")]
    TransitionRejected {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    /// The document's subtype has no such handling step.
    #[error("Step {step} does not apply to {kind}")]
    StepNotApplicable {
        step: FulfillmentStep,
        kind: DocumentKind,
    },

    /// The step was already recorded on the document.
    #[error("Step {step} already recorded")]
    StepAlreadyRecorded { step: FulfillmentStep },

    /// The new ordered quantity is below what has already been delivered.
    #[error("Line {line_id}: ordered {ordered} is below delivered {delivered}")]
    OrderedBelowDelivered {
        line_id: LineId,
        ordered: Decimal,
        delivered: Decimal,
    },

    /// Quantities cannot be negative.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    /// A child delivery was requested against an order that has no reference.
    #[error("Parent order {0} has no reference")]
    ParentWithoutReference(DocumentId),

    /// Lines can only be edited on live orders and quotations.
    #[error("Lines of document {document_id} cannot be edited: {reason}")]
    LineNotEditable {
        document_id: DocumentId,
        reason: &'static str,
    },
}

impl DomainError {
    /// Data-integrity failures that abort the operation, as opposed to
    /// rejected requests.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DomainError::StoreUnavailable(_))
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DocumentNotFound(id) => DomainError::NotFound(id.to_string()),
            StoreError::LineNotFound(id) => DomainError::NotFound(id.to_string()),
            StoreError::AlreadyExists(id) => DomainError::AlreadyExists(id),
            StoreError::DuplicateReference { family, reference } => {
                DomainError::DuplicateReference { family, reference }
            }
            StoreError::ConcurrencyConflict {
                document_id,
                expected,
                actual,
            } => DomainError::ConcurrencyConflict {
                document_id,
                expected,
                actual,
            },
            other => DomainError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<FulfillmentError> for DomainError {
    fn from(e: FulfillmentError) -> Self {
        match e {
            FulfillmentError::NotFound(id) => DomainError::NotFound(id.to_string()),
            FulfillmentError::Store(e) => e.into(),
            FulfillmentError::Catalog(e) => DomainError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let id = DocumentId::new();
        assert!(matches!(
            DomainError::from(StoreError::DocumentNotFound(id)),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Unavailable("down".into())),
            DomainError::StoreUnavailable(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::DuplicateReference {
                family: DocumentFamily::Order,
                reference: "CO1".into()
            }),
            DomainError::DuplicateReference { .. }
        ));
        assert!(matches!(
            DomainError::from(StoreError::ConcurrencyConflict {
                document_id: id,
                expected: 2,
                actual: 3
            }),
            DomainError::ConcurrencyConflict {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn fulfillment_errors_map_to_taxonomy() {
        let id = DocumentId::new();
        assert!(matches!(
            DomainError::from(FulfillmentError::NotFound(id)),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            DomainError::from(FulfillmentError::Store(StoreError::Unavailable("x".into()))),
            DomainError::StoreUnavailable(_)
        ));
        assert!(
            DomainError::from(FulfillmentError::Catalog(
                fulfillment::CatalogError::Unavailable("x".into())
            ))
            .is_unavailable()
        );
    }
}
