//! Document lifecycle commands.

use chrono::{DateTime, Utc};
use common::{
    Actor, Direction, DocumentId, DocumentKind, DocumentPayload, DocumentStatus, EntityId,
    FulfillmentStep, HistoryMode, LineId, OrderRow, ProductId, UserId,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// How a new document is linked to an originating order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case", tag = "link", content = "order_id")]
pub enum ParentLink {
    /// No parent. Roots, transfers, returns and corrections.
    #[default]
    None,
    /// A delivery that is its own root.
    Standalone,
    /// A document raised against an existing root order.
    Order(DocumentId),
}

/// Command to create a new document.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub document_id: DocumentId,
    pub kind: DocumentKind,
    /// Defaults to the subtype's natural direction.
    pub direction: Option<Direction>,
    pub entity: Option<EntityId>,
    pub parent: ParentLink,
    /// A reference supplied by the caller. When set, none is minted.
    pub reference: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub order_rows: Vec<OrderRow>,
    /// Subtype details. Must match `kind` when set.
    pub payload: Option<DocumentPayload>,
    pub author: Option<Actor>,
}

impl CreateDocument {
    /// Creates a CreateDocument command with a generated id.
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            document_id: DocumentId::new(),
            kind,
            direction: None,
            entity: None,
            parent: ParentLink::None,
            reference: None,
            delivery_date: None,
            order_rows: Vec::new(),
            payload: None,
            author: None,
        }
    }

    /// A delivery-type document raised against `order_id`.
    pub fn delivery_for(kind: DocumentKind, order_id: DocumentId) -> Self {
        Self::new(kind).with_parent(ParentLink::Order(order_id))
    }

    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.document_id = id;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<EntityId>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_parent(mut self, parent: ParentLink) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_delivery_date(mut self, date: DateTime<Utc>) -> Self {
        self.delivery_date = Some(date);
        self
    }

    pub fn with_row(mut self, row: OrderRow) -> Self {
        self.order_rows.push(row);
        self
    }

    pub fn with_payload(mut self, payload: DocumentPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_author(mut self, author: Actor) -> Self {
        self.author = Some(author);
        self
    }
}

/// Command to move a document to another status.
#[derive(Debug, Clone)]
pub struct TransitionStatus {
    pub document_id: DocumentId,
    pub status: DocumentStatus,
    pub author: Option<Actor>,
    pub mode: HistoryMode,
    pub message: Option<String>,
}

impl TransitionStatus {
    pub fn new(document_id: DocumentId, status: DocumentStatus) -> Self {
        Self {
            document_id,
            status,
            author: None,
            mode: HistoryMode::Status,
            message: None,
        }
    }

    pub fn by(mut self, author: Actor) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_mode(mut self, mode: HistoryMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Command to timestamp a handling step on a delivery-type document.
#[derive(Debug, Clone)]
pub struct RecordFulfillment {
    pub document_id: DocumentId,
    pub step: FulfillmentStep,
    pub by: Option<UserId>,
    /// Defaults to now.
    pub at: Option<DateTime<Utc>>,
}

impl RecordFulfillment {
    pub fn new(document_id: DocumentId, step: FulfillmentStep) -> Self {
        Self {
            document_id,
            step,
            by: None,
            at: None,
        }
    }

    pub fn by(mut self, user: UserId) -> Self {
        self.by = Some(user);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }
}

/// Command to add a line to an order or quotation.
#[derive(Debug, Clone)]
pub struct AddLine {
    pub order_id: DocumentId,
    pub product_id: Option<ProductId>,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    /// Explicit position. Defaults to after the last line.
    pub sequence: Option<i32>,
    pub description: Option<String>,
    pub ref_supplier_product: Option<String>,
}

impl AddLine {
    pub fn new(order_id: DocumentId, quantity: Decimal, unit_cost: Decimal) -> Self {
        Self {
            order_id,
            product_id: None,
            quantity,
            unit_cost,
            sequence: None,
            description: None,
            ref_supplier_product: None,
        }
    }

    /// A line for a catalog product.
    pub fn product(
        order_id: DocumentId,
        product_id: ProductId,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::new(order_id, quantity, unit_cost)
        }
    }

    pub fn at_sequence(mut self, sequence: i32) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_supplier_ref(mut self, reference: impl Into<String>) -> Self {
        self.ref_supplier_product = Some(reference.into());
        self
    }
}

/// Command to change the ordered quantity of a line.
#[derive(Debug, Clone, Copy)]
pub struct UpdateLineQuantity {
    pub line_id: LineId,
    pub quantity: Decimal,
}

impl UpdateLineQuantity {
    pub fn new(line_id: LineId, quantity: Decimal) -> Self {
        Self { line_id, quantity }
    }
}

/// Command to move a line to an explicit position.
#[derive(Debug, Clone, Copy)]
pub struct ReorderLine {
    pub line_id: LineId,
    pub sequence: i32,
}

impl ReorderLine {
    pub fn new(line_id: LineId, sequence: i32) -> Self {
        Self { line_id, sequence }
    }
}

/// Command to change a line's quantity and position together. Nothing is
/// written unless every requested change is accepted.
#[derive(Debug, Clone, Copy)]
pub struct EditLine {
    pub line_id: LineId,
    pub quantity: Option<Decimal>,
    pub sequence: Option<i32>,
}

impl EditLine {
    pub fn new(line_id: LineId) -> Self {
        Self {
            line_id,
            quantity: None,
            sequence: None,
        }
    }

    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn sequence(mut self, sequence: i32) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.sequence.is_none()
    }
}

impl From<UpdateLineQuantity> for EditLine {
    fn from(cmd: UpdateLineQuantity) -> Self {
        EditLine::new(cmd.line_id).quantity(cmd.quantity)
    }
}

impl From<ReorderLine> for EditLine {
    fn from(cmd: ReorderLine) -> Self {
        EditLine::new(cmd.line_id).sequence(cmd.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_builder() {
        let parent = DocumentId::new();
        let cmd = CreateDocument::delivery_for(DocumentKind::GoodsOutNote, parent)
            .with_entity("acme")
            .with_row(OrderRow::new(LineId::new(), dec!(4)));

        assert_eq!(cmd.parent, ParentLink::Order(parent));
        assert_eq!(cmd.entity, Some(EntityId::from("acme")));
        assert_eq!(cmd.order_rows.len(), 1);
        assert!(cmd.reference.is_none());
    }

    #[test]
    fn parent_link_deserializes() {
        let id = DocumentId::new();
        let link: ParentLink =
            serde_json::from_value(serde_json::json!({ "link": "order", "order_id": id })).unwrap();
        assert_eq!(link, ParentLink::Order(id));

        let link: ParentLink =
            serde_json::from_value(serde_json::json!({ "link": "standalone" })).unwrap();
        assert_eq!(link, ParentLink::Standalone);
    }

    #[test]
    fn add_line_defaults_to_append() {
        let cmd = AddLine::new(DocumentId::new(), dec!(2), dec!(1.5)).with_description("Setup");
        assert!(cmd.sequence.is_none());
        assert!(cmd.product_id.is_none());
        assert_eq!(cmd.description.as_deref(), Some("Setup"));
    }
}
