//! PostgreSQL product catalog tests
//!
//! Run with:
//!
//! ```bash
//! cargo test -p fulfillment --test postgres_catalog
//! ```

use std::sync::Arc;

use common::ProductId;
use fulfillment::{CatalogError, PostgresProductCatalog, ProductCatalog, ProductInfo};
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/002_create_reference_data_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_catalog() -> (PostgresProductCatalog, PgPool) {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();

    sqlx::query("TRUNCATE TABLE products")
        .execute(&pool)
        .await
        .unwrap();

    (PostgresProductCatalog::new(pool.clone()), pool)
}

#[tokio::test]
#[serial]
async fn registered_products_are_found() {
    let (catalog, _) = get_test_catalog().await;
    let bolt = ProductId::new();
    let fitting = ProductId::new();
    catalog
        .register_product(ProductInfo::stocked(bolt, "BOLT-8", dec!(0.35)))
        .await
        .unwrap();
    catalog
        .register_product(ProductInfo::service(fitting, "FIT-1"))
        .await
        .unwrap();

    let found = catalog
        .find_products(&[bolt, fitting, ProductId::new()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[&bolt].direct_cost, dec!(0.35));
    assert!(found[&bolt].inventory);
    assert!(!found[&fitting].inventory);
}

#[tokio::test]
#[serial]
async fn registering_again_replaces_product() {
    let (catalog, _) = get_test_catalog().await;
    let id = ProductId::new();
    catalog
        .register_product(ProductInfo::stocked(id, "OLD", dec!(1)))
        .await
        .unwrap();
    catalog
        .register_product(ProductInfo::stocked(id, "NEW", dec!(2.5)))
        .await
        .unwrap();

    let found = catalog.find_products(&[id]).await.unwrap();
    assert_eq!(found[&id].sku, "NEW");
    assert_eq!(found[&id].direct_cost, dec!(2.5));
}

#[tokio::test]
#[serial]
async fn empty_lookup_skips_the_database() {
    let (catalog, pool) = get_test_catalog().await;
    pool.close().await;

    assert!(catalog.find_products(&[]).await.unwrap().is_empty());
    let result = catalog.find_products(&[ProductId::new()]).await;
    assert!(matches!(result, Err(CatalogError::Unavailable(_))));
}
