//! Reconciliation engine: loads an order's lines and linked deliveries from
//! one store snapshot and runs the pipeline over them.

use std::time::Instant;

use common::{DELIVERY_KINDS, Document, DocumentId, ProductId};
use document_store::{DocumentQuery, DocumentStore};

use crate::catalog::ProductCatalog;
use crate::pipeline;
use crate::view::{LineAnomaly, ReconciledOrder};
use crate::{FulfillmentError, Result};

/// Computes ordered, delivered and outstanding quantities per order line.
pub struct ReconciliationEngine<S: DocumentStore, C: ProductCatalog> {
    store: S,
    catalog: C,
}

impl<S: DocumentStore, C: ProductCatalog> ReconciliationEngine<S, C> {
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Reconciles the lines of `document`'s root order.
    ///
    /// When `document` is itself a delivery against that order, its own rows
    /// are left out of the delivered totals.
    #[tracing::instrument(skip(self, document), fields(document_id = %document.id))]
    pub async fn reconcile(&self, document: &Document) -> Result<ReconciledOrder> {
        let started = Instant::now();

        if document.is_removed {
            return Err(FulfillmentError::NotFound(document.id));
        }

        let root = document.root_id();
        if root != document.id {
            match self.store.find_by_id(root).await? {
                Some(parent) if !parent.is_removed => {}
                _ => return Err(FulfillmentError::NotFound(root)),
            }
        }

        let linked = DocumentQuery::linked_to(root).kinds(&DELIVERY_KINDS);
        let graph = self.store.load_order_graph(root, linked).await?;

        let mut product_ids: Vec<ProductId> =
            graph.lines.iter().filter_map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let products = self.catalog.find_products(&product_ids).await?;

        let result = pipeline::assemble(document, graph.lines, &graph.linked, &products);
        self.report_anomalies(&result);

        metrics::histogram!("reconciliation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::debug!(
            lines = result.lines.len(),
            deliveries = graph.linked.len(),
            "Order reconciled"
        );

        Ok(result)
    }

    /// Loads a document by id and reconciles it.
    pub async fn reconcile_by_id(&self, id: DocumentId) -> Result<ReconciledOrder> {
        let document = self
            .store
            .find_by_id(id)
            .await?
            .filter(|doc| !doc.is_removed)
            .ok_or(FulfillmentError::NotFound(id))?;

        self.reconcile(&document).await
    }

    fn report_anomalies(&self, order: &ReconciledOrder) {
        for line in &order.lines {
            let Some(ref fulfillment) = line.fulfillment else {
                continue;
            };
            for anomaly in &fulfillment.anomalies {
                match anomaly {
                    LineAnomaly::NegativeOutstanding { excess } => {
                        tracing::warn!(
                            order_id = %order.document.root_id(),
                            line_id = %line.line.id,
                            ordered = %fulfillment.ordered_qty,
                            delivered = %fulfillment.delivered_qty,
                            %excess,
                            "Line delivered beyond ordered quantity"
                        );
                        metrics::counter!("reconciliation_negative_outstanding_total")
                            .increment(1);
                    }
                    LineAnomaly::ProductUnresolved => {
                        tracing::warn!(
                            order_id = %order.document.root_id(),
                            line_id = %line.line.id,
                            product_id = ?line.line.product_id,
                            "Line references a product missing from the catalog"
                        );
                        metrics::counter!("reconciliation_unresolved_products_total")
                            .increment(1);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, InMemoryProductCatalog, ProductInfo};
    use common::{DocumentKind, Line, OrderRow};
    use document_store::{InMemoryDocumentStore, StoreError};
    use rust_decimal_macros::dec;

    async fn setup() -> (
        ReconciliationEngine<InMemoryDocumentStore, InMemoryProductCatalog>,
        InMemoryDocumentStore,
        InMemoryProductCatalog,
    ) {
        let store = InMemoryDocumentStore::new();
        let catalog = InMemoryProductCatalog::new();
        let engine = ReconciliationEngine::new(store.clone(), catalog.clone());
        (engine, store, catalog)
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let (engine, _, _) = setup().await;
        let result = engine.reconcile_by_id(DocumentId::new()).await;
        assert!(matches!(result, Err(FulfillmentError::NotFound(_))));
    }

    #[tokio::test]
    async fn removed_parent_is_not_found() {
        let (engine, store, _) = setup().await;
        let mut order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        order.is_removed = true;
        store.insert(order.clone()).await.unwrap();

        let mut delivery = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        delivery.parent_order = Some(order.id);
        store.insert(delivery.clone()).await.unwrap();

        let result = engine.reconcile(&delivery).await;
        assert!(matches!(result, Err(FulfillmentError::NotFound(id)) if id == order.id));
    }

    #[tokio::test]
    async fn delivery_view_excludes_itself() {
        let (engine, store, catalog) = setup().await;
        let product = ProductInfo::stocked(common::ProductId::new(), "SKU", dec!(1));
        catalog.insert(product.clone()).await;

        let order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        store.insert(order.clone()).await.unwrap();
        let line = Line::new(order.id, Some(product.id), dec!(10), dec!(1), 1);
        store.insert_line(line.clone()).await.unwrap();

        let mut first = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        first.parent_order = Some(order.id);
        first.order_rows.push(OrderRow::new(line.id, dec!(4)));
        store.insert(first.clone()).await.unwrap();

        let mut second = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        second.parent_order = Some(order.id);
        second.order_rows.push(OrderRow::new(line.id, dec!(5)));
        store.insert(second.clone()).await.unwrap();

        let from_order = engine.reconcile(&order).await.unwrap();
        assert_eq!(from_order.lines[0].delivered_qty(), dec!(9));

        let from_second = engine.reconcile(&second).await.unwrap();
        let fulfillment = from_second.lines[0].fulfillment.as_ref().unwrap();
        assert_eq!(fulfillment.delivered_qty, dec!(4));
        assert_eq!(fulfillment.outstanding_qty, dec!(6));
        assert_eq!(from_second.lines[0].overrides.as_ref().unwrap().quantity, dec!(5));
    }

    #[tokio::test]
    async fn store_failure_aborts() {
        let (engine, store, _) = setup().await;
        let order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        store.insert(order.clone()).await.unwrap();
        store.set_unavailable(true);

        let result = engine.reconcile(&order).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn catalog_failure_aborts() {
        let (engine, store, catalog) = setup().await;
        let order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        store.insert(order.clone()).await.unwrap();
        catalog.set_fail_on_lookup(true).await;

        let result = engine.reconcile(&order).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::Catalog(CatalogError::Unavailable(_)))
        ));
    }
}
