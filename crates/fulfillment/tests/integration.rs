//! Integration tests: documents and lines in the in-memory store →
//! ReconciliationEngine → reconciled order view.

use common::{
    Document, DocumentId, DocumentKind, DocumentStatus, FulfillmentStep, Line, LineId, OrderRow,
    ProductId, StepMark,
};
use document_store::{DocumentStore, InMemoryDocumentStore};
use fulfillment::{
    FulfillmentError, InMemoryProductCatalog, LineAnomaly, ProductInfo, ReconciliationEngine,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

struct Fixture {
    engine: ReconciliationEngine<InMemoryDocumentStore, InMemoryProductCatalog>,
    store: InMemoryDocumentStore,
    catalog: InMemoryProductCatalog,
}

impl Fixture {
    fn new() -> Self {
        let store = InMemoryDocumentStore::new();
        let catalog = InMemoryProductCatalog::new();
        Self {
            engine: ReconciliationEngine::new(store.clone(), catalog.clone()),
            store,
            catalog,
        }
    }

    async fn stocked_product(&self) -> ProductId {
        let id = ProductId::new();
        self.catalog
            .insert(ProductInfo::stocked(id, "SKU-001", dec!(2.40)))
            .await;
        id
    }

    async fn order(&self) -> Document {
        let mut order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        order.reference = Some("CO1023".to_string());
        self.store.insert(order.clone()).await.unwrap();
        order
    }

    async fn line(&self, order: &Document, product: Option<ProductId>, qty: Decimal, seq: i32) -> Line {
        let line = Line::new(order.id, product, qty, dec!(1), seq);
        self.store.insert_line(line.clone()).await.unwrap();
        line
    }

    async fn deliver(&self, order: &Document, line: LineId, qty: Decimal) -> Document {
        let mut doc = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        doc.parent_order = Some(order.id);
        doc.order_rows.push(OrderRow::new(line, qty));
        self.store.insert(doc.clone()).await.unwrap();
        doc
    }
}

#[tokio::test]
async fn no_deliveries_leaves_everything_outstanding() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    fx.line(&order, Some(product), dec!(10), 1).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let f = result.lines[0].fulfillment.as_ref().unwrap();
    assert_eq!(f.ordered_qty, dec!(10));
    assert_eq!(f.delivered_qty, dec!(0));
    assert_eq!(f.outstanding_qty, dec!(10));
    assert!(f.deliveries.is_empty());
    assert_eq!(f.product_cost, Some(dec!(2.40)));
}

#[tokio::test]
async fn single_delivery_reduces_outstanding() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let line = fx.line(&order, Some(product), dec!(10), 1).await;
    let delivery = fx.deliver(&order, line.id, dec!(4)).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let f = result.lines[0].fulfillment.as_ref().unwrap();
    assert_eq!(f.delivered_qty, dec!(4));
    assert_eq!(f.outstanding_qty, dec!(6));
    assert_eq!(f.deliveries.len(), 1);
    assert_eq!(f.deliveries[0].document_id, delivery.id);
    assert_eq!(f.deliveries[0].quantity, dec!(4));
}

#[tokio::test]
async fn exact_delivery_is_fully_fulfilled() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let line = fx.line(&order, Some(product), dec!(10), 1).await;
    fx.deliver(&order, line.id, dec!(3)).await;
    fx.deliver(&order, line.id, dec!(7)).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let f = result.lines[0].fulfillment.as_ref().unwrap();
    assert_eq!(f.outstanding_qty, dec!(0));
    assert!(f.is_fully_fulfilled());
    assert!(!f.is_over_delivered());
    assert!(f.anomalies.is_empty());
    assert_eq!(f.deliveries.len(), 2);
}

#[tokio::test]
async fn over_delivery_is_flagged() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let line = fx.line(&order, Some(product), dec!(10), 1).await;
    fx.deliver(&order, line.id, dec!(3)).await;
    fx.deliver(&order, line.id, dec!(7)).await;
    fx.deliver(&order, line.id, dec!(2)).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let f = result.lines[0].fulfillment.as_ref().unwrap();
    assert_eq!(f.delivered_qty, dec!(12));
    assert_eq!(f.outstanding_qty, dec!(-2));
    assert_eq!(
        f.anomalies,
        vec![LineAnomaly::NegativeOutstanding { excess: dec!(2) }]
    );
    assert!(result.has_anomalies());
}

#[tokio::test]
async fn outstanding_equals_ordered_minus_counted_deliveries() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let a = fx.line(&order, Some(product), dec!(8.5), 1).await;
    let b = fx.line(&order, Some(product), dec!(3), 2).await;

    fx.deliver(&order, a.id, dec!(1.25)).await;
    fx.deliver(&order, b.id, dec!(3)).await;
    let mut removed = fx.deliver(&order, a.id, dec!(100)).await;
    removed.is_removed = true;
    fx.store.update(removed, 0).await.unwrap();

    // Goods-in notes count too
    let mut inbound = Document::new(DocumentId::new(), DocumentKind::GoodsInNote);
    inbound.parent_order = Some(order.id);
    inbound.order_rows.push(OrderRow::new(a.id, dec!(0.25)));
    fx.store.insert(inbound).await.unwrap();

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    for line in &result.lines {
        let f = line.fulfillment.as_ref().unwrap();
        let counted: Decimal = f.deliveries.iter().map(|d| d.quantity).sum();
        assert_eq!(f.outstanding_qty, f.ordered_qty - counted);
    }
    assert_eq!(result.line(a.id).unwrap().delivered_qty(), dec!(1.50));
    assert_eq!(result.line(b.id).unwrap().delivered_qty(), dec!(3));
}

#[tokio::test]
async fn soft_deleted_lines_are_not_reconciled() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let kept = fx.line(&order, Some(product), dec!(1), 1).await;
    let mut dropped = fx.line(&order, Some(product), dec!(1), 2).await;
    dropped.is_deleted = true;
    fx.store.update_line(dropped.clone()).await.unwrap();

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    assert_eq!(result.lines.len(), 1);
    assert_eq!(result.lines[0].line.id, kept.id);
    assert!(result.line(dropped.id).is_none());
}

#[tokio::test]
async fn lines_sorted_by_sequence_ties_in_insertion_order() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let a = fx.line(&order, Some(product), dec!(1), 5).await;
    let b = fx.line(&order, Some(product), dec!(1), 1).await;
    let c = fx.line(&order, Some(product), dec!(1), 5).await;
    let d = fx.line(&order, Some(product), dec!(1), 5).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let ids: Vec<_> = result.lines.iter().map(|l| l.line.id).collect();
    assert_eq!(ids, vec![b.id, a.id, c.id, d.id]);
}

#[tokio::test]
async fn non_inventory_and_free_text_lines_pass_through() {
    let fx = Fixture::new();
    let service = ProductId::new();
    fx.catalog
        .insert(ProductInfo::service(service, "SVC-INSTALL"))
        .await;
    let order = fx.order().await;
    let svc = fx.line(&order, Some(service), dec!(1), 1).await;
    let note = fx.line(&order, None, dec!(0), 2).await;
    fx.deliver(&order, svc.id, dec!(1)).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    assert_eq!(result.lines.len(), 2);
    assert!(result.line(svc.id).unwrap().fulfillment.is_none());
    assert!(result.line(note.id).unwrap().fulfillment.is_none());
}

#[tokio::test]
async fn unresolved_product_does_not_block_other_lines() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let ghost = fx.line(&order, Some(ProductId::new()), dec!(5), 1).await;
    let real = fx.line(&order, Some(product), dec!(5), 2).await;
    fx.deliver(&order, ghost.id, dec!(2)).await;
    fx.deliver(&order, real.id, dec!(2)).await;

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();

    let ghost_f = result.line(ghost.id).unwrap().fulfillment.as_ref().unwrap();
    assert_eq!(ghost_f.anomalies, vec![LineAnomaly::ProductUnresolved]);
    assert_eq!(ghost_f.delivered_qty, dec!(0));
    assert_eq!(ghost_f.outstanding_qty, dec!(5));

    let real_f = result.line(real.id).unwrap().fulfillment.as_ref().unwrap();
    assert_eq!(real_f.outstanding_qty, dec!(3));
}

#[tokio::test]
async fn delivery_records_carry_status_and_stage() {
    let fx = Fixture::new();
    let product = fx.stocked_product().await;
    let order = fx.order().await;
    let line = fx.line(&order, Some(product), dec!(2), 1).await;

    let mut shipped = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
    shipped.parent_order = Some(order.id);
    shipped.reference = Some("BL1023/1".to_string());
    shipped.status = DocumentStatus::Shipping;
    shipped.order_rows.push(OrderRow::new(line.id, dec!(2)));
    let mark = StepMark {
        at: chrono::Utc::now(),
        by: None,
    };
    let progress = shipped.payload.progress_mut().unwrap();
    progress.record(FulfillmentStep::Printed, mark);
    progress.record(FulfillmentStep::Shipped, mark);
    fx.store.insert(shipped).await.unwrap();

    let result = fx.engine.reconcile_by_id(order.id).await.unwrap();
    let record = &result.lines[0].fulfillment.as_ref().unwrap().deliveries[0];
    assert_eq!(record.reference.as_deref(), Some("BL1023/1"));
    assert_eq!(record.status, DocumentStatus::Shipping);
    assert_eq!(record.stage, Some(FulfillmentStep::Shipped));
}

#[tokio::test]
async fn removed_order_is_not_found() {
    let fx = Fixture::new();
    let mut order = fx.order().await;
    order.is_removed = true;
    fx.store.update(order.clone(), 0).await.unwrap();

    let result = fx.engine.reconcile_by_id(order.id).await;
    assert!(matches!(result, Err(FulfillmentError::NotFound(_))));
}
