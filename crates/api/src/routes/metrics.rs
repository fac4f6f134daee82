//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the metrics emitted by the document lifecycle.
pub fn describe() {
    describe_counter!("documents_created_total", "Documents created, by subtype");
    describe_counter!(
        "document_transitions_total",
        "Status transitions applied, by target status"
    );
    describe_counter!(
        "references_assigned_total",
        "References minted, by document family"
    );
    describe_counter!(
        "reference_entity_fallback_total",
        "Entity prefix lookups that fell back to no prefix"
    );
    describe_counter!(
        "reconciliation_negative_outstanding_total",
        "Lines found delivered beyond their ordered quantity"
    );
    describe_counter!(
        "reconciliation_unresolved_products_total",
        "Lines whose product is missing from the catalog"
    );
    describe_histogram!(
        "reconciliation_duration_seconds",
        "Time spent reconciling an order"
    );
}

/// GET /metrics — Prometheus text exposition.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
