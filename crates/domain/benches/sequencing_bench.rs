use common::{DocumentId, DocumentKind};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    CreateDocument, DocumentService, InMemoryEntityDirectory, LifecycleConfig, ReferenceFormat,
    ReferenceRule,
};
use document_store::{InMemoryDocumentStore, InMemorySequenceStore};
use fulfillment::InMemoryProductCatalog;

type Service = DocumentService<
    InMemoryDocumentStore,
    InMemorySequenceStore,
    InMemoryEntityDirectory,
    InMemoryProductCatalog,
>;

fn service(config: LifecycleConfig) -> Service {
    DocumentService::new(
        InMemoryDocumentStore::new(),
        InMemorySequenceStore::new(),
        InMemoryEntityDirectory::new(),
        InMemoryProductCatalog::new(),
        config,
    )
}

fn bench_format(c: &mut Criterion) {
    let format = ReferenceFormat::new(6, true);
    let root = ReferenceRule::Root { prefix: "CO" };
    let child = ReferenceRule::Child {
        prefix: "BL",
        parent_reference: "CO2403-001023",
    };
    let now = chrono::Utc::now();

    c.bench_function("sequencing/format_root", |b| {
        b.iter(|| format.format(&root, Some("AC"), 1023, now));
    });
    c.bench_function("sequencing/format_child", |b| {
        b.iter(|| format.format(&child, None, 2, now));
    });
    c.bench_function("sequencing/refresh_date_segment", |b| {
        b.iter(|| format.refresh_date_segment("BL2403-001023/2", now));
    });
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = service(LifecycleConfig::default());

    c.bench_function("sequencing/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create(CreateDocument::new(DocumentKind::OrderCustomer))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_child_deliveries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = service(LifecycleConfig::default());
    let order_id = DocumentId::new();
    rt.block_on(async {
        service
            .create(CreateDocument::new(DocumentKind::OrderCustomer).with_id(order_id))
            .await
            .unwrap();
    });

    c.bench_function("sequencing/create_child_delivery", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create(CreateDocument::delivery_for(
                        DocumentKind::GoodsOutNote,
                        order_id,
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_format,
    bench_create_order,
    bench_create_child_deliveries,
);
criterion_main!(benches);
