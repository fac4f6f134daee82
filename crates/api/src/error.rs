//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, EntityLookupError};
use fulfillment::CatalogError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// A reference data backend (catalog, entity directory) is down.
    Unavailable(String),
    /// Document lifecycle error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => {
                tracing::error!(error = %msg, "reference data unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::DuplicateReference { .. }
        | DomainError::AlreadyExists(_)
        | DomainError::ConcurrencyConflict { .. }
        | DomainError::TransitionRejected { .. }
        | DomainError::StepAlreadyRecorded { .. } => StatusCode::CONFLICT,
        DomainError::StoreUnavailable(_) => {
            tracing::error!(error = %err, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::InvalidParent { .. }
        | DomainError::SubtypeChanged { .. }
        | DomainError::HistoryRewritten(_)
        | DomainError::StatusNotAllowed { .. }
        | DomainError::StepNotApplicable { .. }
        | DomainError::OrderedBelowDelivered { .. }
        | DomainError::InvalidQuantity(_)
        | DomainError::ParentWithoutReference(_)
        | DomainError::LineNotEditable { .. } => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<EntityLookupError> for ApiError {
    fn from(err: EntityLookupError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{DocumentFamily, DocumentId, DocumentStatus};

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_domain_status_codes() {
        assert_eq!(
            status_of(DomainError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(DomainError::DuplicateReference {
                family: DocumentFamily::Order,
                reference: "CO1".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::TransitionRejected {
                from: DocumentStatus::Closed,
                to: DocumentStatus::Draft
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::ConcurrencyConflict {
                document_id: DocumentId::new(),
                expected: 1,
                actual: 2
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::StoreUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(DomainError::ParentWithoutReference(DocumentId::new())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_reference_data_failures_are_503() {
        let err = ApiError::from(CatalogError::Unavailable("down".into()));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::from(EntityLookupError::Unavailable("down".into()));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
