use common::{Document, DocumentId, DocumentKind, Line, OrderRow, ProductId};
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{DocumentStore, InMemoryDocumentStore};
use fulfillment::{InMemoryProductCatalog, ProductInfo, ReconciliationEngine};
use rust_decimal::Decimal;

/// Populate a store with one order of `lines` lines and `deliveries` goods-out
/// notes, each delivering one unit on every line.
async fn populate_order(
    store: &InMemoryDocumentStore,
    catalog: &InMemoryProductCatalog,
    lines: usize,
    deliveries: usize,
) -> DocumentId {
    let order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
    let order_id = order.id;
    store.insert(order).await.unwrap();

    let mut line_ids = Vec::with_capacity(lines);
    for n in 0..lines {
        let product = ProductId::new();
        catalog
            .insert(ProductInfo::stocked(
                product,
                format!("SKU-{n:04}"),
                Decimal::new(250, 2),
            ))
            .await;
        let line = Line::new(
            order_id,
            Some(product),
            Decimal::from(deliveries as u64 + 1),
            Decimal::ONE,
            (n % 7) as i32,
        );
        line_ids.push(line.id);
        store.insert_line(line).await.unwrap();
    }

    for _ in 0..deliveries {
        let mut doc = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        doc.parent_order = Some(order_id);
        doc.order_rows = line_ids
            .iter()
            .map(|id| OrderRow::new(*id, Decimal::ONE))
            .collect();
        store.insert(doc).await.unwrap();
    }

    order_id
}

fn bench_reconcile(c: &mut Criterion, name: &str, lines: usize, deliveries: usize) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let catalog = InMemoryProductCatalog::new();
    let order_id = rt.block_on(populate_order(&store, &catalog, lines, deliveries));
    let engine = ReconciliationEngine::new(store, catalog);

    c.bench_function(name, |b| {
        b.iter(|| {
            rt.block_on(async {
                engine.reconcile_by_id(order_id).await.unwrap();
            });
        });
    });
}

fn bench_reconcile_50_lines(c: &mut Criterion) {
    bench_reconcile(c, "reconciliation/50_lines_5_deliveries", 50, 5);
}

fn bench_reconcile_500_lines(c: &mut Criterion) {
    bench_reconcile(c, "reconciliation/500_lines_20_deliveries", 500, 20);
}

criterion_group!(benches, bench_reconcile_50_lines, bench_reconcile_500_lines);
criterion_main!(benches);
