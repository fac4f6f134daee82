//! Fulfillment reconciliation.
//!
//! For every line of an order this crate computes how much has been shipped
//! or received across the order's linked delivery documents:
//! - [`ReconciliationEngine`] loads an order graph and runs the pipeline
//! - [`pipeline`] holds the pure stages (classify, exclude self, sum, merge)
//! - [`ProductCatalog`] is the seam to product data (inventory flag, cost),
//!   backed by memory or by the `products` table
//! - [`ReconciledOrder`] is the annotated result

pub mod catalog;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod postgres;
pub mod view;

pub use catalog::{CatalogError, InMemoryProductCatalog, ProductCatalog, ProductInfo};
pub use engine::ReconciliationEngine;
pub use error::{FulfillmentError, Result};
pub use postgres::PostgresProductCatalog;
pub use view::{
    DeliveryRecord, LineAnomaly, LineFulfillment, ReconciledLine, ReconciledOrder, RowOverrides,
};
