//! HTTP API server for order-like documents.
//!
//! Exposes the document lifecycle over REST: creation with reference
//! assignment, reconciled reads, listings, status transitions, fulfillment
//! steps and line edits. Structured logging via tracing, Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use document_store::{DocumentStore, SequenceStore};
use domain::{DocumentService, EntityDirectory, LifecycleConfig};
use fulfillment::ProductCatalog;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::documents::{self, AppState};
use routes::reference_data;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, Q, E, C>(
    state: Arc<AppState<S, Q, E, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, Q, E, C>))
        .route(
            "/documents",
            post(documents::create::<S, Q, E, C>).get(documents::list::<S, Q, E, C>),
        )
        .route(
            "/documents/{key}",
            get(documents::get::<S, Q, E, C>).delete(documents::remove::<S, Q, E, C>),
        )
        .route(
            "/documents/{key}/status",
            post(documents::transition::<S, Q, E, C>),
        )
        .route(
            "/documents/{key}/fulfillment",
            post(documents::fulfillment::<S, Q, E, C>),
        )
        .route(
            "/documents/{key}/delivery-date",
            put(documents::delivery_date::<S, Q, E, C>),
        )
        .route(
            "/documents/{key}/lines",
            post(documents::add_line::<S, Q, E, C>),
        )
        .route(
            "/lines/{id}",
            patch(documents::update_line::<S, Q, E, C>).delete(documents::remove_line::<S, Q, E, C>),
        )
        .route("/sequences/{scope}", get(documents::sequence::<S, Q, E, C>))
        .route("/products/{id}", put(reference_data::put_product::<S, Q, E, C>))
        .route("/entities/{id}", put(reference_data::put_entity::<S, Q, E, C>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given stores.
///
/// The entity directory and product catalog are shared between the lifecycle
/// service and the `/entities` and `/products` registration endpoints.
pub fn create_state<S, Q, E, C>(
    store: S,
    sequences: Q,
    entities: E,
    catalog: C,
    config: LifecycleConfig,
) -> Arc<AppState<S, Q, E, C>>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let documents = DocumentService::new(
        store,
        sequences,
        entities.clone(),
        catalog.clone(),
        config,
    );

    Arc::new(AppState {
        documents,
        entities,
        catalog,
    })
}
