//! Document lifecycle controller.

use chrono::{DateTime, Utc};
use common::{
    Document, DocumentFamily, DocumentId, DocumentPayload, HistoryEntry, HistoryMode, Line,
    LineId, StepMark,
};
use document_store::{
    DocumentStore, DocumentStoreExt, Listing, ListingRequest, ScopeKey, SequenceStore, StoreError,
};
use fulfillment::{ProductCatalog, ReconciledOrder, ReconciliationEngine};
use rust_decimal::Decimal;

use crate::entity::EntityDirectory;
use crate::error::{DomainError, Result};
use crate::policy::LifecycleConfig;
use crate::sequencing::ReferenceAllocator;

use super::{
    AddLine, CreateDocument, EditLine, ParentLink, RecordFulfillment, ReorderLine,
    TransitionStatus, UpdateLineQuantity,
};

/// Creates, saves and transitions documents, and serves reconciled reads.
///
/// References are minted here on first save; every later save refreshes the
/// date segment of the reference. Status changes append to the history.
pub struct DocumentService<S, Q, E, C>
where
    S: DocumentStore + Clone,
    Q: SequenceStore,
    E: EntityDirectory,
    C: ProductCatalog,
{
    store: S,
    allocator: ReferenceAllocator<Q, E>,
    engine: ReconciliationEngine<S, C>,
    config: LifecycleConfig,
}

impl<S, Q, E, C> DocumentService<S, Q, E, C>
where
    S: DocumentStore + Clone,
    Q: SequenceStore,
    E: EntityDirectory,
    C: ProductCatalog,
{
    pub fn new(store: S, sequences: Q, entities: E, catalog: C, config: LifecycleConfig) -> Self {
        Self {
            allocator: ReferenceAllocator::new(
                sequences,
                entities,
                config.format,
                config.scope_per_entity,
            ),
            engine: ReconciliationEngine::new(store.clone(), catalog),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Creates and persists a new document.
    ///
    /// A reference is minted unless the command carries one. Nothing is
    /// written if minting fails.
    #[tracing::instrument(skip(self, cmd), fields(document_id = %cmd.document_id, kind = %cmd.kind))]
    pub async fn create(&self, cmd: CreateDocument) -> Result<Document> {
        let kind = cmd.kind;
        let payload = match cmd.payload {
            Some(payload) if payload.kind() != kind => {
                return Err(DomainError::SubtypeChanged {
                    expected: kind,
                    found: payload.kind(),
                });
            }
            Some(payload) => payload,
            None => DocumentPayload::default_for(kind),
        };

        let mut document = Document::new(cmd.document_id, kind);
        document.payload = payload;
        document.entity = cmd.entity;
        document.delivery_date = cmd.delivery_date;
        document.order_rows = cmd.order_rows;
        if let Some(direction) = cmd.direction {
            document.direction = direction;
        }

        let parent = self.resolve_parent(&mut document, cmd.parent).await?;

        match cmd.reference {
            Some(reference) => document.reference = Some(reference),
            None => {
                let assigned = self.allocator.assign(&document, parent.as_ref()).await?;
                document.reference = Some(assigned.reference);
                document.sequential_id = assigned.sequential_id;
            }
        }
        self.refresh_reference(&mut document);

        document.history.push(HistoryEntry {
            at: document.created_at,
            author: cmd.author,
            mode: HistoryMode::New,
            previous: document.status,
            status: document.status,
            message: None,
        });

        self.persist_new(&document).await?;

        metrics::counter!("documents_created_total", "kind" => kind.as_str()).increment(1);
        tracing::info!(reference = ?document.reference, "Document created");

        Ok(document)
    }

    /// Persists changes to an existing, non-removed document.
    ///
    /// The subtype is fixed and history may only grow. The date segment of
    /// the reference is refreshed from the current dates. The write only
    /// lands if nobody saved the document since `document.version` was read.
    #[tracing::instrument(skip(self, document), fields(document_id = %document.id, version = document.version))]
    pub async fn save(&self, mut document: Document) -> Result<Document> {
        let stored = self.load_active(document.id).await?;
        if stored.version != document.version {
            return Err(DomainError::ConcurrencyConflict {
                document_id: document.id,
                expected: document.version,
                actual: stored.version,
            });
        }

        if stored.kind() != document.kind() {
            return Err(DomainError::SubtypeChanged {
                expected: stored.kind(),
                found: document.kind(),
            });
        }
        if !document.history.starts_with(&stored.history) {
            return Err(DomainError::HistoryRewritten(document.id));
        }

        self.refresh_reference(&mut document);
        document.updated_at = Utc::now();
        let expected = document.version;
        self.store
            .update(document.clone(), expected)
            .await
            .inspect_err(|e| {
                if matches!(e, StoreError::ConcurrencyConflict { .. }) {
                    tracing::warn!(error = %e, "Concurrent save rejected");
                }
            })?;
        document.version = expected + 1;

        Ok(document)
    }

    /// Sets or clears the delivery date.
    #[tracing::instrument(skip(self))]
    pub async fn set_delivery_date(
        &self,
        id: DocumentId,
        date: Option<DateTime<Utc>>,
    ) -> Result<Document> {
        let mut document = self.load_active(id).await?;
        document.delivery_date = date;
        self.save(document).await
    }

    /// Moves a document to another status, appending one history entry.
    #[tracing::instrument(skip(self, cmd), fields(document_id = %cmd.document_id, status = %cmd.status))]
    pub async fn transition(&self, cmd: TransitionStatus) -> Result<Document> {
        let mut document = self.load_active(cmd.document_id).await?;
        let previous = document.status;

        self.config
            .transition_policy
            .check(document.kind(), previous, cmd.status)?;

        document.history.push(HistoryEntry {
            at: Utc::now(),
            author: cmd.author,
            mode: cmd.mode,
            previous,
            status: cmd.status,
            message: cmd.message,
        });
        document.status = cmd.status;

        let document = self.save(document).await?;

        metrics::counter!("document_transitions_total", "status" => cmd.status.as_str())
            .increment(1);
        tracing::info!(from = %previous, to = %cmd.status, "Status changed");

        Ok(document)
    }

    /// Timestamps a handling step. Each step is recorded at most once.
    #[tracing::instrument(skip(self, cmd), fields(document_id = %cmd.document_id, step = %cmd.step))]
    pub async fn record_fulfillment(&self, cmd: RecordFulfillment) -> Result<Document> {
        let mut document = self.load_active(cmd.document_id).await?;
        let kind = document.kind();
        let outbound = document.payload.is_outbound_handling();
        let not_applicable = DomainError::StepNotApplicable {
            step: cmd.step,
            kind,
        };

        let Some(progress) = document.payload.progress_mut() else {
            return Err(not_applicable);
        };
        if outbound != cmd.step.is_outbound() {
            return Err(not_applicable);
        }

        let mark = StepMark {
            at: cmd.at.unwrap_or_else(Utc::now),
            by: cmd.by,
        };
        if !progress.record(cmd.step, mark) {
            return Err(DomainError::StepAlreadyRecorded { step: cmd.step });
        }

        self.save(document).await
    }

    /// Soft-removes a document.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: DocumentId) -> Result<Document> {
        let mut document = self.load_active(id).await?;
        document.is_removed = true;
        let document = self.save(document).await?;

        tracing::info!(reference = ?document.reference, "Document removed");
        Ok(document)
    }

    /// Looks a document up by id or reference.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Document> {
        self.store
            .find_by_key(key)
            .await?
            .filter(|doc| !doc.is_removed)
            .ok_or_else(|| DomainError::NotFound(key.to_string()))
    }

    /// Reads a document together with the reconciled lines of its order.
    #[tracing::instrument(skip(self))]
    pub async fn read_order(&self, key: &str) -> Result<ReconciledOrder> {
        let document = self.get(key).await?;
        Ok(self.engine.reconcile(&document).await?)
    }

    /// Runs a paged listing.
    #[tracing::instrument(skip(self, request))]
    pub async fn list(&self, request: &ListingRequest) -> Result<Listing<Document>> {
        Ok(self.store.list(request).await?)
    }

    /// Adds a line to an order or quotation.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn add_line(&self, cmd: AddLine) -> Result<Line> {
        if cmd.quantity.is_sign_negative() {
            return Err(DomainError::InvalidQuantity(cmd.quantity));
        }
        let order = self.load_editable(cmd.order_id).await?;

        let sequence = match cmd.sequence {
            Some(sequence) => sequence,
            None => self
                .store
                .lines_for_order(order.id)
                .await?
                .iter()
                .map(|line| line.sequence)
                .max()
                .map_or(1, |max| max + 1),
        };

        let mut line = Line::new(
            order.id,
            cmd.product_id,
            cmd.quantity,
            cmd.unit_cost,
            sequence,
        );
        line.description = cmd.description;
        line.ref_supplier_product = cmd.ref_supplier_product;

        self.store.insert_line(line.clone()).await?;
        Ok(line)
    }

    /// Changes the ordered quantity of a line.
    ///
    /// Rejected when the new quantity is below what has already been
    /// delivered against the line.
    pub async fn update_line_quantity(&self, cmd: UpdateLineQuantity) -> Result<Line> {
        self.edit_line(cmd.into()).await
    }

    /// Moves a line to an explicit position.
    pub async fn reorder_line(&self, cmd: ReorderLine) -> Result<Line> {
        self.edit_line(cmd.into()).await
    }

    /// Applies a quantity change and a move in a single line write, after
    /// both have been checked.
    #[tracing::instrument(skip(self))]
    pub async fn edit_line(&self, cmd: EditLine) -> Result<Line> {
        if let Some(quantity) = cmd.quantity.filter(Decimal::is_sign_negative) {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        let (mut line, order) = self.load_editable_line(cmd.line_id).await?;
        if cmd.is_empty() {
            return Ok(line);
        }

        if let Some(quantity) = cmd.quantity {
            let reconciled = self.engine.reconcile(&order).await?;
            let delivered = reconciled
                .line(line.id)
                .map_or(Decimal::ZERO, |l| l.delivered_qty());
            if quantity < delivered {
                return Err(DomainError::OrderedBelowDelivered {
                    line_id: line.id,
                    ordered: quantity,
                    delivered,
                });
            }
            line.quantity = quantity;
        }
        if let Some(sequence) = cmd.sequence {
            line.sequence = sequence;
        }

        self.store.update_line(line.clone()).await?;
        Ok(line)
    }

    /// Soft-deletes a line.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, line_id: LineId) -> Result<Line> {
        let (mut line, _) = self.load_editable_line(line_id).await?;
        line.is_deleted = true;
        self.store.update_line(line.clone()).await?;
        Ok(line)
    }

    /// Last value handed out for a counter scope, for diagnostics.
    pub async fn current_sequence(&self, scope: &str) -> Result<u64> {
        Ok(self
            .allocator
            .sequences()
            .current_value(&ScopeKey::from_raw(scope))
            .await?)
    }

    async fn resolve_parent(
        &self,
        document: &mut Document,
        link: ParentLink,
    ) -> Result<Option<Document>> {
        let kind = document.kind();
        match link {
            ParentLink::Order(parent_id) => {
                if kind.is_root() {
                    return Err(DomainError::InvalidParent {
                        parent: parent_id,
                        reason: "orders and quotations cannot have a parent order",
                    });
                }
                let parent = self
                    .store
                    .find_by_id(parent_id)
                    .await?
                    .filter(|doc| !doc.is_removed)
                    .ok_or(DomainError::InvalidParent {
                        parent: parent_id,
                        reason: "parent order does not exist or was removed",
                    })?;
                if !parent.kind().is_root() {
                    return Err(DomainError::InvalidParent {
                        parent: parent_id,
                        reason: "parent is not an order or quotation",
                    });
                }
                document.parent_order = Some(parent_id);
                Ok(Some(parent))
            }
            ParentLink::Standalone => {
                document.parent_order = Some(document.id);
                Ok(None)
            }
            ParentLink::None => {
                if kind.is_delivery() {
                    document.parent_order = Some(document.id);
                }
                Ok(None)
            }
        }
    }

    async fn persist_new(&self, document: &Document) -> Result<()> {
        match self.store.insert(document.clone()).await {
            Ok(()) => Ok(()),
            Err(e @ StoreError::DuplicateReference { .. }) => {
                tracing::error!(
                    document_id = %document.id,
                    reference = ?document.reference,
                    error = %e,
                    "Reference collision on insert"
                );
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Quotations are dated by creation, everything else by delivery date.
    fn refresh_reference(&self, document: &mut Document) {
        let date = match document.kind().family() {
            DocumentFamily::Quotation => Some(document.created_at),
            _ => document.delivery_date,
        };
        if let Some(date) = date
            && let Some(ref reference) = document.reference
        {
            document.reference = Some(
                self.allocator
                    .format()
                    .refresh_date_segment(reference, date),
            );
        }
    }

    async fn load_active(&self, id: DocumentId) -> Result<Document> {
        self.store
            .find_by_id(id)
            .await?
            .filter(|doc| !doc.is_removed)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))
    }

    async fn load_editable(&self, id: DocumentId) -> Result<Document> {
        let document = self.load_active(id).await?;
        if !document.kind().is_root() {
            return Err(DomainError::LineNotEditable {
                document_id: id,
                reason: "only orders and quotations own lines",
            });
        }
        Ok(document)
    }

    async fn load_editable_line(&self, line_id: LineId) -> Result<(Line, Document)> {
        let line = self
            .store
            .find_line(line_id)
            .await?
            .filter(|line| !line.is_deleted)
            .ok_or_else(|| DomainError::NotFound(line_id.to_string()))?;
        let order = self.load_editable(line.order_id).await?;
        Ok((line, order))
    }
}
