//! PostgreSQL-backed product catalog.

use std::collections::HashMap;

use async_trait::async_trait;
use common::ProductId;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::catalog::{CatalogError, ProductCatalog, ProductInfo};

/// Product catalog reading the `products` table.
#[derive(Clone)]
pub struct PostgresProductCatalog {
    pool: PgPool,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_product(row: PgRow) -> Result<ProductInfo, sqlx::Error> {
        Ok(ProductInfo {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            sku: row.try_get("sku")?,
            inventory: row.try_get("inventory")?,
            direct_cost: row.try_get::<Decimal, _>("direct_cost")?,
        })
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::Unavailable(e.to_string())
    }
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductInfo>, CatalogError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(
            "SELECT id, sku, inventory, direct_cost FROM products WHERE id = ANY($1)",
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let product = Self::row_to_product(row)?;
                Ok((product.id, product))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, product), fields(product_id = %product.id, sku = %product.sku))]
    async fn register_product(&self, product: ProductInfo) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, inventory, direct_cost)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET sku = EXCLUDED.sku,
                inventory = EXCLUDED.inventory,
                direct_cost = EXCLUDED.direct_cost
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.sku)
        .bind(product.inventory)
        .bind(product.direct_cost)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Product registered");
        Ok(())
    }
}
