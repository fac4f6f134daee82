//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use document_store::{DocumentStore, SequenceStore};
use domain::EntityDirectory;
use fulfillment::ProductCatalog;
use serde::Serialize;

use super::documents::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sequences: &'static str,
}

/// GET /health — reports whether the counter store answers.
pub async fn check<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    match state.documents.current_sequence("ORDER").await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                sequences: "up",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    sequences: "down",
                }),
            )
        }
    }
}
