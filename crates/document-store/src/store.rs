use async_trait::async_trait;
use common::{Document, DocumentId, Line, LineId};

use crate::query::{DocumentQuery, Listing, ListingRequest};
use crate::Result;

/// Point-in-time view of an order's lines and of the documents linked to it.
#[derive(Debug, Clone, Default)]
pub struct OrderGraph {
    /// Non-deleted lines of the root order, in insertion order.
    pub lines: Vec<Line>,

    /// Documents matching the link query, in the query's sort order.
    pub linked: Vec<Document>,
}

/// Core trait for document storage.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document.
    ///
    /// Fails with `DuplicateReference` if another document of the same family
    /// and entity already holds the reference.
    async fn insert(&self, document: Document) -> Result<()>;

    /// Replaces a stored document if its stored version is still
    /// `expected_version`, and bumps the version.
    ///
    /// Fails with `ConcurrencyConflict` when another write got there first.
    async fn update(&self, document: Document, expected_version: u64) -> Result<()>;

    /// Retrieves a document by id, including removed ones.
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Retrieves a non-removed document by reference.
    async fn find_by_reference(&self, reference: &str) -> Result<Option<Document>>;

    /// Retrieves documents matching a query.
    async fn find_many(&self, query: DocumentQuery) -> Result<Vec<Document>>;

    /// Counts documents matching a query, ignoring limit and offset.
    async fn count(&self, query: DocumentQuery) -> Result<u64>;

    /// Inserts a new line.
    async fn insert_line(&self, line: Line) -> Result<()>;

    /// Replaces a stored line.
    async fn update_line(&self, line: Line) -> Result<()>;

    /// Retrieves a line by id, including deleted ones.
    async fn find_line(&self, id: LineId) -> Result<Option<Line>>;

    /// Retrieves the non-deleted lines of an order in insertion order.
    async fn lines_for_order(&self, order_id: DocumentId) -> Result<Vec<Line>>;

    /// Reads an order's lines and its linked documents from one consistent
    /// snapshot.
    async fn load_order_graph(&self, root: DocumentId, linked: DocumentQuery)
    -> Result<OrderGraph>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Retrieves a document by id, failing if it is missing.
    async fn get(&self, id: DocumentId) -> Result<Document> {
        self.find_by_id(id)
            .await?
            .ok_or(crate::StoreError::DocumentNotFound(id))
    }

    /// Resolves a key that is either a document id or a reference.
    async fn find_by_key(&self, key: &str) -> Result<Option<Document>> {
        match DocumentId::parse_str(key) {
            Some(id) => self.find_by_id(id).await,
            None => self.find_by_reference(key).await,
        }
    }

    /// Runs a paged listing.
    async fn list(&self, request: &ListingRequest) -> Result<Listing<Document>> {
        let count = self.count(request.count_query()).await?;
        let items = self.find_many(request.page_query()).await?;
        Ok(Listing::new(items, count, request))
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
