use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{Document, DocumentId, Line, LineId};
use tokio::sync::{Mutex, RwLock};

use crate::{
    DocumentQuery, Result, ScopeKey, StoreError,
    sequence::SequenceStore,
    store::{DocumentStore, OrderGraph},
};

/// Entity part of the uniqueness key. A missing entity and an empty one are
/// the same key, as in the PostgreSQL index.
fn entity_key(doc: &Document) -> &str {
    doc.entity.as_ref().map_or("", |entity| entity.as_str())
}

#[derive(Default)]
struct Tables {
    documents: HashMap<DocumentId, Document>,
    /// Kept in insertion order.
    lines: Vec<Line>,
}

impl Tables {
    fn reference_taken(&self, doc: &Document) -> bool {
        let Some(ref reference) = doc.reference else {
            return false;
        };
        let family = doc.kind().family();
        let entity = entity_key(doc);
        self.documents.values().any(|other| {
            other.id != doc.id
                && other.kind().family() == family
                && entity_key(other) == entity
                && other.reference.as_ref() == Some(reference)
        })
    }

    fn select(&self, query: &DocumentQuery) -> Vec<Document> {
        let mut docs: Vec<_> = self
            .documents
            .values()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        docs.sort_by(|a, b| query.compare(a, b));

        let offset = query.offset.unwrap_or(0);
        let docs = docs.into_iter().skip(offset);
        match query.limit {
            Some(limit) => docs.take(limit).collect(),
            None => docs.collect(),
        }
    }

    fn active_lines(&self, order_id: DocumentId) -> Vec<Line> {
        self.lines
            .iter()
            .filter(|line| line.order_id == order_id && !line.is_deleted)
            .cloned()
            .collect()
    }
}

/// In-memory document store implementation for testing.
///
/// Provides the same interface and uniqueness rules as the PostgreSQL
/// implementation. Documents and lines share one lock, so every read is a
/// consistent snapshot.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    tables: Arc<RwLock<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the total number of documents stored, removed ones included.
    pub async fn document_count(&self) -> usize {
        self.tables.read().await.documents.len()
    }

    /// Clears all documents and lines.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.documents.clear();
        tables.lines.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory document store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: Document) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if tables.documents.contains_key(&document.id) {
            return Err(StoreError::AlreadyExists(document.id.to_string()));
        }
        if tables.reference_taken(&document) {
            return Err(StoreError::DuplicateReference {
                family: document.kind().family(),
                reference: document.reference.clone().unwrap_or_default(),
            });
        }

        tables.documents.insert(document.id, document);
        Ok(())
    }

    async fn update(&self, mut document: Document, expected_version: u64) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        let actual = tables
            .documents
            .get(&document.id)
            .map(|stored| stored.version)
            .ok_or(StoreError::DocumentNotFound(document.id))?;
        if actual != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                document_id: document.id,
                expected: expected_version,
                actual,
            });
        }
        if tables.reference_taken(&document) {
            return Err(StoreError::DuplicateReference {
                family: document.kind().family(),
                reference: document.reference.clone().unwrap_or_default(),
            });
        }

        document.version = expected_version + 1;
        tables.documents.insert(document.id, document);
        Ok(())
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.documents.get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Document>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let found = tables
            .documents
            .values()
            .filter(|doc| !doc.is_removed && doc.reference.as_deref() == Some(reference))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned();
        Ok(found)
    }

    async fn find_many(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.select(&query))
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let count = tables
            .documents
            .values()
            .filter(|doc| query.matches(doc))
            .count();
        Ok(count as u64)
    }

    async fn insert_line(&self, line: Line) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if !tables.documents.contains_key(&line.order_id) {
            return Err(StoreError::DocumentNotFound(line.order_id));
        }
        if tables.lines.iter().any(|l| l.id == line.id) {
            return Err(StoreError::AlreadyExists(line.id.to_string()));
        }

        tables.lines.push(line);
        Ok(())
    }

    async fn update_line(&self, line: Line) -> Result<()> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        let slot = tables
            .lines
            .iter_mut()
            .find(|l| l.id == line.id)
            .ok_or(StoreError::LineNotFound(line.id))?;
        *slot = line;
        Ok(())
    }

    async fn find_line(&self, id: LineId) -> Result<Option<Line>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.lines.iter().find(|l| l.id == id).cloned())
    }

    async fn lines_for_order(&self, order_id: DocumentId) -> Result<Vec<Line>> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables.active_lines(order_id))
    }

    async fn load_order_graph(
        &self,
        root: DocumentId,
        linked: DocumentQuery,
    ) -> Result<OrderGraph> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(OrderGraph {
            lines: tables.active_lines(root),
            linked: tables.select(&linked),
        })
    }
}

/// In-memory sequence store.
///
/// A single mutex guards every counter, so increments are atomic.
#[derive(Clone, Default)]
pub struct InMemorySequenceStore {
    counters: Arc<Mutex<HashMap<ScopeKey, u64>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory sequence store is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn next_value(&self, scope: &ScopeKey) -> Result<u64> {
        self.check_available()?;
        let mut counters = self.counters.lock().await;
        let value = counters.entry(scope.clone()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn current_value(&self, scope: &ScopeKey) -> Result<u64> {
        self.check_available()?;
        let counters = self.counters.lock().await;
        Ok(counters.get(scope).copied().unwrap_or(0))
    }
}
