//! Document, line and sequence endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{
    Actor, Direction, Document, DocumentId, DocumentKind, DocumentPayload, DocumentStatus,
    EntityId, FulfillmentStep, HistoryMode, Line, LineId, OrderRow, ProductId, UserId,
};
use document_store::{DocumentQuery, DocumentStore, Listing, ListingRequest, SequenceStore};
use domain::{
    AddLine, CreateDocument, DocumentService, EditLine, EntityDirectory, ParentLink,
    RecordFulfillment, TransitionStatus,
};
use fulfillment::{ProductCatalog, ReconciledOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, Q, E, C>
where
    S: DocumentStore + Clone,
    Q: SequenceStore,
    E: EntityDirectory,
    C: ProductCatalog,
{
    pub documents: DocumentService<S, Q, E, C>,
    pub entities: E,
    pub catalog: C,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateDocumentRequest {
    pub kind: DocumentKind,
    pub direction: Option<Direction>,
    pub entity: Option<String>,
    #[serde(default)]
    pub parent: ParentLink,
    pub reference: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_rows: Vec<OrderRow>,
    pub payload: Option<DocumentPayload>,
    pub author: Option<Actor>,
}

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub max: Option<i64>,
    /// One id or a comma-separated list.
    pub id: Option<String>,
    pub sort: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub entity: Option<String>,
    pub parent: Option<String>,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: DocumentStatus,
    pub author: Option<Actor>,
    pub mode: Option<HistoryMode>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct FulfillmentRequest {
    pub step: FulfillmentStep,
    pub by: Option<UserId>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct DeliveryDateRequest {
    pub delivery_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: Option<ProductId>,
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_cost: Decimal,
    pub sequence: Option<i32>,
    pub description: Option<String>,
    pub ref_supplier_product: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: Option<Decimal>,
    pub sequence: Option<i32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct SequenceResponse {
    pub scope: String,
    pub value: u64,
}

// -- Handlers --

/// POST /documents — create a document, minting its reference.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let cmd = CreateDocument {
        document_id: DocumentId::new(),
        kind: req.kind,
        direction: req.direction,
        entity: req.entity.map(EntityId::new),
        parent: req.parent,
        reference: req.reference,
        delivery_date: req.delivery_date,
        order_rows: req.order_rows,
        payload: req.payload,
        author: req.author,
    };

    let document = state.documents.create(cmd).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /documents — paged listing.
#[tracing::instrument(skip(state, params))]
pub async fn list<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Listing<Document>>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let request = listing_request(params)?;
    let listing = state.documents.list(&request).await?;
    Ok(Json(listing))
}

/// GET /documents/{key} — a document with the reconciled lines of its order.
#[tracing::instrument(skip(state))]
pub async fn get<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(key): Path<String>,
) -> Result<Json<ReconciledOrder>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let order = state.documents.read_order(&key).await?;
    Ok(Json(order))
}

/// DELETE /documents/{key} — soft remove.
#[tracing::instrument(skip(state))]
pub async fn remove<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    state.documents.remove(parse_document_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /documents/{key}/status — status transition.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Document>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let cmd = TransitionStatus {
        document_id: parse_document_id(&id)?,
        status: req.status,
        author: req.author,
        mode: req.mode.unwrap_or_default(),
        message: req.message,
    };
    Ok(Json(state.documents.transition(cmd).await?))
}

/// POST /documents/{key}/fulfillment — record a handling step.
#[tracing::instrument(skip(state, req))]
pub async fn fulfillment<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<FulfillmentRequest>,
) -> Result<Json<Document>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let cmd = RecordFulfillment {
        document_id: parse_document_id(&id)?,
        step: req.step,
        by: req.by,
        at: req.at,
    };
    Ok(Json(state.documents.record_fulfillment(cmd).await?))
}

/// PUT /documents/{key}/delivery-date — set or clear the delivery date.
#[tracing::instrument(skip(state, req))]
pub async fn delivery_date<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<DeliveryDateRequest>,
) -> Result<Json<Document>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let document = state
        .documents
        .set_delivery_date(parse_document_id(&id)?, req.delivery_date)
        .await?;
    Ok(Json(document))
}

/// POST /documents/{key}/lines — add a line.
#[tracing::instrument(skip(state, req))]
pub async fn add_line<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<Line>), ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let cmd = AddLine {
        order_id: parse_document_id(&id)?,
        product_id: req.product_id,
        quantity: req.quantity,
        unit_cost: req.unit_cost,
        sequence: req.sequence,
        description: req.description,
        ref_supplier_product: req.ref_supplier_product,
    };
    let line = state.documents.add_line(cmd).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// PATCH /lines/{id} — change quantity and/or position.
#[tracing::instrument(skip(state, req))]
pub async fn update_line<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<Line>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let cmd = EditLine {
        line_id: parse_line_id(&id)?,
        quantity: req.quantity,
        sequence: req.sequence,
    };
    if cmd.is_empty() {
        return Err(ApiError::BadRequest(
            "Expected quantity or sequence".to_string(),
        ));
    }

    Ok(Json(state.documents.edit_line(cmd).await?))
}

/// DELETE /lines/{id} — soft delete a line.
#[tracing::instrument(skip(state))]
pub async fn remove_line<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
) -> Result<Json<Line>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let line = state.documents.remove_line(parse_line_id(&id)?).await?;
    Ok(Json(line))
}

/// GET /sequences/{scope} — current counter value.
#[tracing::instrument(skip(state))]
pub async fn sequence<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(scope): Path<String>,
) -> Result<Json<SequenceResponse>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let value = state.documents.current_sequence(&scope).await?;
    Ok(Json(SequenceResponse { scope, value }))
}

// -- Helpers --

fn parse_document_id(id: &str) -> Result<DocumentId, ApiError> {
    DocumentId::parse_str(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid id: {id}")))
}

fn parse_line_id(id: &str) -> Result<LineId, ApiError> {
    LineId::parse_str(id).ok_or_else(|| ApiError::BadRequest(format!("Invalid line id: {id}")))
}

fn listing_request(params: ListParams) -> Result<ListingRequest, ApiError> {
    let mut filters = DocumentQuery::new();
    if let Some(ref kind) = params.kind {
        let kind = DocumentKind::parse(kind)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown kind: {kind}")))?;
        filters = filters.kinds(&[kind]);
    }
    if let Some(ref status) = params.status {
        let status = DocumentStatus::parse(status)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {status}")))?;
        filters = filters.statuses(&[status]);
    }
    if let Some(entity) = params.entity {
        filters = filters.entity(EntityId::new(entity));
    }
    if let Some(ref parent) = params.parent {
        filters = filters.parent_order(parse_document_id(parent)?);
    }

    let ids = match params.id {
        Some(ref ids) => ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(parse_document_id)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(ListingRequest {
        search: params.search,
        page: params.page,
        max: params.max,
        ids,
        sort: params.sort,
        filters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_request_from_params() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        let params = ListParams {
            id: Some(format!("{a}, {b}")),
            kind: Some("goodsoutnote".to_string()),
            status: Some("validated".to_string()),
            sort: Some("-createdAt".to_string()),
            ..ListParams::default()
        };

        let request = listing_request(params).unwrap();
        assert_eq!(request.ids, vec![a, b]);
        assert_eq!(request.filters.kinds, Some(vec![DocumentKind::GoodsOutNote]));
        assert_eq!(
            request.filters.statuses,
            Some(vec![DocumentStatus::Validated])
        );
        assert_eq!(request.sort.as_deref(), Some("-createdAt"));
    }

    #[test]
    fn test_listing_request_rejects_bad_values() {
        let params = ListParams {
            kind: Some("invoice".to_string()),
            ..ListParams::default()
        };
        assert!(matches!(
            listing_request(params),
            Err(ApiError::BadRequest(_))
        ));

        let params = ListParams {
            id: Some("not-a-uuid".to_string()),
            ..ListParams::default()
        };
        assert!(matches!(
            listing_request(params),
            Err(ApiError::BadRequest(_))
        ));
    }
}
