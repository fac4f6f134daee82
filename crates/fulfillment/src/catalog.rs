//! Product catalog trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by a product catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog could not be reached.
    #[error("Product catalog unavailable: {0}")]
    Unavailable(String),
}

/// What reconciliation needs to know about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub sku: String,
    /// Whether the product's type tracks stock. Services and other
    /// non-inventory products are not reconciled.
    pub inventory: bool,
    pub direct_cost: Decimal,
}

impl ProductInfo {
    pub fn stocked(id: ProductId, sku: impl Into<String>, direct_cost: Decimal) -> Self {
        Self {
            id,
            sku: sku.into(),
            inventory: true,
            direct_cost,
        }
    }

    pub fn service(id: ProductId, sku: impl Into<String>) -> Self {
        Self {
            id,
            sku: sku.into(),
            inventory: false,
            direct_cost: Decimal::ZERO,
        }
    }
}

/// Trait for product lookups.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a batch of products. Unknown ids are simply absent from the
    /// returned map.
    async fn find_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductInfo>, CatalogError>;

    /// Adds a product, or replaces the one with the same id.
    async fn register_product(&self, product: ProductInfo) -> Result<(), CatalogError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, ProductInfo>,
    fail_on_lookup: bool,
}

/// In-memory product catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, product: ProductInfo) {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
    }

    pub async fn remove(&self, id: ProductId) {
        self.state.write().await.products.remove(&id);
    }

    /// Configures the catalog to fail every lookup.
    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductInfo>, CatalogError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(CatalogError::Unavailable(
                "catalog lookup failed".to_string(),
            ));
        }

        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn register_product(&self, product: ProductInfo) -> Result<(), CatalogError> {
        self.insert(product).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn unknown_products_are_absent() {
        let catalog = InMemoryProductCatalog::new();
        let known = ProductId::new();
        catalog
            .insert(ProductInfo::stocked(known, "SKU-1", dec!(3.20)))
            .await;

        let found = catalog
            .find_products(&[known, ProductId::new()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&known].direct_cost, dec!(3.20));
    }

    #[tokio::test]
    async fn removed_product_is_no_longer_found() {
        let catalog = InMemoryProductCatalog::new();
        let id = ProductId::new();
        catalog.insert(ProductInfo::service(id, "SVC-1")).await;
        catalog.remove(id).await;

        assert!(catalog.find_products(&[id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn registered_product_replaces_previous() {
        let catalog = InMemoryProductCatalog::new();
        let id = ProductId::new();
        catalog
            .register_product(ProductInfo::stocked(id, "SKU-1", dec!(1)))
            .await
            .unwrap();
        catalog
            .register_product(ProductInfo::service(id, "SVC-1"))
            .await
            .unwrap();

        let found = catalog.find_products(&[id]).await.unwrap();
        assert!(!found[&id].inventory);
        assert_eq!(found[&id].sku, "SVC-1");
    }

    #[tokio::test]
    async fn fail_on_lookup() {
        let catalog = InMemoryProductCatalog::new();
        catalog.set_fail_on_lookup(true).await;

        let result = catalog.find_products(&[ProductId::new()]).await;
        assert!(matches!(result, Err(CatalogError::Unavailable(_))));
    }
}
