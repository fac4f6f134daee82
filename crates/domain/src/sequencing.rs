//! Reference allocation: picks the counter scope and formatting rule for a
//! new document, draws the next number and builds the reference.

use common::{Document, DocumentFamily};
use document_store::{ScopeKey, SequenceStore};

use crate::entity::EntityDirectory;
use crate::error::{DomainError, Result};
use crate::reference::{ReferenceFormat, ReferenceRule};

/// A freshly minted reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedReference {
    pub reference: String,
    /// Value drawn from the shared `ORDER` counter, for documents that use it.
    pub sequential_id: Option<u64>,
    pub scope: ScopeKey,
}

/// Mints references from durable counters.
pub struct ReferenceAllocator<Q: SequenceStore, E: EntityDirectory> {
    sequences: Q,
    entities: E,
    format: ReferenceFormat,
    scope_per_entity: bool,
}

impl<Q: SequenceStore, E: EntityDirectory> ReferenceAllocator<Q, E> {
    pub fn new(sequences: Q, entities: E, format: ReferenceFormat, scope_per_entity: bool) -> Self {
        Self {
            sequences,
            entities,
            format,
            scope_per_entity,
        }
    }

    pub fn format(&self) -> &ReferenceFormat {
        &self.format
    }

    pub fn sequences(&self) -> &Q {
        &self.sequences
    }

    /// Mints a reference for `document`.
    ///
    /// `parent` is the order a delivery is raised against; `None` for roots
    /// and standalone documents. A failing counter aborts; a failing entity
    /// lookup only drops the entity prefix.
    #[tracing::instrument(skip(self, document, parent), fields(document_id = %document.id, kind = %document.kind()))]
    pub async fn assign(
        &self,
        document: &Document,
        parent: Option<&Document>,
    ) -> Result<AssignedReference> {
        let kind = document.kind();
        let family = kind.family();

        let parent = match parent {
            Some(parent) if family == DocumentFamily::Delivery => {
                let reference = parent
                    .reference
                    .as_deref()
                    .ok_or(DomainError::ParentWithoutReference(parent.id))?;
                Some((parent.id, reference))
            }
            _ => None,
        };
        let rule = ReferenceRule::select(kind, document.direction, parent.map(|(_, r)| r));

        let assigned = match rule {
            ReferenceRule::Counter { .. } => {
                let name = match family {
                    DocumentFamily::Transfer => ScopeKey::TRANSFER,
                    DocumentFamily::Return => ScopeKey::RETURN,
                    _ => ScopeKey::CORRECTION,
                };
                let scope = ScopeKey::family(name);
                let seq = self.sequences.next_value(&scope).await?;
                AssignedReference {
                    reference: self.format.format(&rule, None, seq, document.created_at),
                    sequential_id: None,
                    scope,
                }
            }
            ReferenceRule::Child { .. } => {
                let scope = ScopeKey::for_parent(parent.map_or(document.id, |(id, _)| id));
                let seq = self.sequences.next_value(&scope).await?;
                AssignedReference {
                    reference: self.format.format(&rule, None, seq, document.created_at),
                    sequential_id: None,
                    scope,
                }
            }
            ReferenceRule::Root { .. } => {
                let scope = match document.entity {
                    Some(ref entity) if self.scope_per_entity => {
                        ScopeKey::family_for_entity(ScopeKey::ORDER, entity)
                    }
                    _ => ScopeKey::family(ScopeKey::ORDER),
                };
                let seq = self.sequences.next_value(&scope).await?;
                let entity_prefix = self.entity_prefix(document).await;
                AssignedReference {
                    reference: self.format.format(
                        &rule,
                        entity_prefix.as_deref(),
                        seq,
                        document.created_at,
                    ),
                    sequential_id: Some(seq),
                    scope,
                }
            }
        };

        metrics::counter!("references_assigned_total", "family" => family.as_str())
            .increment(1);
        tracing::info!(reference = %assigned.reference, scope = %assigned.scope, "Reference assigned");

        Ok(assigned)
    }

    async fn entity_prefix(&self, document: &Document) -> Option<String> {
        let entity = document.entity.as_ref()?;
        match self.entities.accounting_prefix(entity).await {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::warn!(
                    entity = %entity,
                    error = %e,
                    "Entity lookup failed, using bare reference"
                );
                metrics::counter!("reference_entity_fallback_total").increment(1);
                None
            }
        }
    }
}
