//! Registration of the products and accounting entities documents refer to.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{EntityId, ProductId};
use document_store::{DocumentStore, SequenceStore};
use domain::EntityDirectory;
use fulfillment::{ProductCatalog, ProductInfo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::documents::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ProductRequest {
    pub sku: String,
    /// Defaults to a stocked product.
    pub inventory: Option<bool>,
    #[serde(default)]
    pub direct_cost: Decimal,
}

#[derive(Deserialize)]
pub struct EntityRequest {
    pub accounting_prefix: Option<String>,
}

#[derive(Serialize)]
pub struct EntityResponse {
    pub id: EntityId,
    pub accounting_prefix: Option<String>,
}

/// PUT /products/{id} — register or replace a product.
#[tracing::instrument(skip(state, req))]
pub async fn put_product<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<ProductRequest>,
) -> Result<Json<ProductInfo>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    let id = ProductId::parse_str(&id)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid product id: {id}")))?;
    if req.sku.trim().is_empty() {
        return Err(ApiError::BadRequest("Product sku is required".to_string()));
    }
    if req.direct_cost.is_sign_negative() {
        return Err(ApiError::BadRequest(format!(
            "Invalid direct cost: {}",
            req.direct_cost
        )));
    }

    let product = ProductInfo {
        id,
        sku: req.sku,
        inventory: req.inventory.unwrap_or(true),
        direct_cost: req.direct_cost,
    };
    state.catalog.register_product(product.clone()).await?;
    Ok(Json(product))
}

/// PUT /entities/{id} — register an accounting entity and its prefix.
#[tracing::instrument(skip(state, req))]
pub async fn put_entity<S, Q, E, C>(
    State(state): State<Arc<AppState<S, Q, E, C>>>,
    Path(id): Path<String>,
    Json(req): Json<EntityRequest>,
) -> Result<Json<EntityResponse>, ApiError>
where
    S: DocumentStore + Clone + 'static,
    Q: SequenceStore + 'static,
    E: EntityDirectory + Clone + 'static,
    C: ProductCatalog + Clone + 'static,
{
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("Entity id is required".to_string()));
    }

    let entity = EntityId::new(id);
    let prefix = req
        .accounting_prefix
        .map(|prefix| prefix.trim().to_string())
        .filter(|prefix| !prefix.is_empty());
    state.entities.register_entity(&entity, prefix.clone()).await?;

    Ok(Json(EntityResponse {
        id: entity,
        accounting_prefix: prefix,
    }))
}
