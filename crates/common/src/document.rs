//! Document header, subtype payloads and cached row projections.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::status::{DocumentStatus, FulfillmentProgress, HistoryEntry, StatusFamily};
use crate::types::{DocumentId, EntityId, LineId, ProductId};

/// Whether a document sells to a customer or buys from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sell,
    Buy,
}

impl Direction {
    pub fn from_for_sales(for_sales: bool) -> Self {
        if for_sales {
            Direction::Sell
        } else {
            Direction::Buy
        }
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Direction::Sell)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sell => "sell",
            Direction::Buy => "buy",
        }
    }
}

/// The closed set of document subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    OrderCustomer,
    OrderSupplier,
    QuotationCustomer,
    QuotationSupplier,
    GoodsOutNote,
    GoodsInNote,
    StockTransaction,
    StockReturn,
    StockCorrection,
}

/// Subtypes whose rows count as deliveries against an order.
pub const DELIVERY_KINDS: [DocumentKind; 2] = [DocumentKind::GoodsOutNote, DocumentKind::GoodsInNote];

impl DocumentKind {
    pub const ALL: [DocumentKind; 9] = [
        DocumentKind::OrderCustomer,
        DocumentKind::OrderSupplier,
        DocumentKind::QuotationCustomer,
        DocumentKind::QuotationSupplier,
        DocumentKind::GoodsOutNote,
        DocumentKind::GoodsInNote,
        DocumentKind::StockTransaction,
        DocumentKind::StockReturn,
        DocumentKind::StockCorrection,
    ];

    pub fn family(&self) -> DocumentFamily {
        match self {
            DocumentKind::OrderCustomer | DocumentKind::OrderSupplier => DocumentFamily::Order,
            DocumentKind::QuotationCustomer | DocumentKind::QuotationSupplier => {
                DocumentFamily::Quotation
            }
            DocumentKind::GoodsOutNote | DocumentKind::GoodsInNote => DocumentFamily::Delivery,
            DocumentKind::StockTransaction => DocumentFamily::Transfer,
            DocumentKind::StockReturn => DocumentFamily::Return,
            DocumentKind::StockCorrection => DocumentFamily::Correction,
        }
    }

    /// Root commercial documents own lines; everything else hangs off one.
    pub fn is_root(&self) -> bool {
        matches!(
            self.family(),
            DocumentFamily::Order | DocumentFamily::Quotation
        )
    }

    pub fn is_delivery(&self) -> bool {
        matches!(self.family(), DocumentFamily::Delivery)
    }

    pub fn status_family(&self) -> StatusFamily {
        match self.family() {
            DocumentFamily::Quotation => StatusFamily::Quotation,
            _ => StatusFamily::Order,
        }
    }

    pub fn default_direction(&self) -> Direction {
        match self {
            DocumentKind::OrderSupplier
            | DocumentKind::QuotationSupplier
            | DocumentKind::GoodsInNote => Direction::Buy,
            _ => Direction::Sell,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::OrderCustomer => "OrderCustomer",
            DocumentKind::OrderSupplier => "OrderSupplier",
            DocumentKind::QuotationCustomer => "QuotationCustomer",
            DocumentKind::QuotationSupplier => "QuotationSupplier",
            DocumentKind::GoodsOutNote => "GoodsOutNote",
            DocumentKind::GoodsInNote => "GoodsInNote",
            DocumentKind::StockTransaction => "StockTransaction",
            DocumentKind::StockReturn => "StockReturn",
            DocumentKind::StockCorrection => "StockCorrection",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(input))
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Groups of subtypes that share a reference namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentFamily {
    Order,
    Quotation,
    Delivery,
    Transfer,
    Return,
    Correction,
}

impl DocumentFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFamily::Order => "ORDER",
            DocumentFamily::Quotation => "QUOTATION",
            DocumentFamily::Delivery => "DELIVERY",
            DocumentFamily::Transfer => "TRANSFER",
            DocumentFamily::Return => "RETURN",
            DocumentFamily::Correction => "CORRECTION",
        }
    }
}

impl std::fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Allocation progress codes carried on customer orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProgressCode {
    /// Not required.
    #[default]
    #[serde(rename = "NOR")]
    NotRequired,
    /// Nothing done yet.
    #[serde(rename = "NOT")]
    NotStarted,
    /// Partially done.
    #[serde(rename = "NOA")]
    Partial,
    /// Fully done.
    #[serde(rename = "ALL")]
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrderDetails {
    pub offer: Option<DocumentId>,
    pub allocate_status: ProgressCode,
    pub fulfill_status: ProgressCode,
    pub shipping_status: ProgressCode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierOrderDetails {
    pub offer: Option<DocumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationDetails {
    pub orders: Vec<DocumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsOutDetails {
    pub tracking: Option<String>,
    pub boxes: u32,
    pub archived: bool,
    pub progress: FulfillmentProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundDetails {
    pub description: Option<String>,
    pub boxes: u32,
    pub progress: FulfillmentProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub warehouse_to: Option<String>,
    pub boxes: u32,
    pub progress: FulfillmentProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDetails {
    pub description: Option<String>,
    pub boxes: u32,
    pub journal_entry_sources: Vec<String>,
    pub progress: FulfillmentProgress,
}

/// Subtype-specific data. The variant is the document's subtype and never
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum DocumentPayload {
    OrderCustomer(CustomerOrderDetails),
    OrderSupplier(SupplierOrderDetails),
    QuotationCustomer(QuotationDetails),
    QuotationSupplier(QuotationDetails),
    GoodsOutNote(GoodsOutDetails),
    GoodsInNote(InboundDetails),
    StockTransaction(TransferDetails),
    StockReturn(ReturnDetails),
    StockCorrection(InboundDetails),
}

impl DocumentPayload {
    /// Returns the default payload for a subtype.
    pub fn default_for(kind: DocumentKind) -> Self {
        let inbound = || InboundDetails {
            description: None,
            boxes: 1,
            progress: FulfillmentProgress::default(),
        };
        match kind {
            DocumentKind::OrderCustomer => {
                DocumentPayload::OrderCustomer(CustomerOrderDetails::default())
            }
            DocumentKind::OrderSupplier => {
                DocumentPayload::OrderSupplier(SupplierOrderDetails::default())
            }
            DocumentKind::QuotationCustomer => {
                DocumentPayload::QuotationCustomer(QuotationDetails::default())
            }
            DocumentKind::QuotationSupplier => {
                DocumentPayload::QuotationSupplier(QuotationDetails::default())
            }
            DocumentKind::GoodsOutNote => DocumentPayload::GoodsOutNote(GoodsOutDetails {
                tracking: None,
                boxes: 1,
                archived: false,
                progress: FulfillmentProgress::default(),
            }),
            DocumentKind::GoodsInNote => DocumentPayload::GoodsInNote(inbound()),
            DocumentKind::StockTransaction => DocumentPayload::StockTransaction(TransferDetails {
                warehouse_to: None,
                boxes: 1,
                progress: FulfillmentProgress::default(),
            }),
            DocumentKind::StockReturn => DocumentPayload::StockReturn(ReturnDetails {
                description: None,
                boxes: 1,
                journal_entry_sources: Vec::new(),
                progress: FulfillmentProgress::default(),
            }),
            DocumentKind::StockCorrection => DocumentPayload::StockCorrection(inbound()),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentPayload::OrderCustomer(_) => DocumentKind::OrderCustomer,
            DocumentPayload::OrderSupplier(_) => DocumentKind::OrderSupplier,
            DocumentPayload::QuotationCustomer(_) => DocumentKind::QuotationCustomer,
            DocumentPayload::QuotationSupplier(_) => DocumentKind::QuotationSupplier,
            DocumentPayload::GoodsOutNote(_) => DocumentKind::GoodsOutNote,
            DocumentPayload::GoodsInNote(_) => DocumentKind::GoodsInNote,
            DocumentPayload::StockTransaction(_) => DocumentKind::StockTransaction,
            DocumentPayload::StockReturn(_) => DocumentKind::StockReturn,
            DocumentPayload::StockCorrection(_) => DocumentKind::StockCorrection,
        }
    }

    /// Handling progress, for subtypes that are physically handled.
    pub fn progress(&self) -> Option<&FulfillmentProgress> {
        match self {
            DocumentPayload::GoodsOutNote(d) => Some(&d.progress),
            DocumentPayload::GoodsInNote(d) | DocumentPayload::StockCorrection(d) => {
                Some(&d.progress)
            }
            DocumentPayload::StockTransaction(d) => Some(&d.progress),
            DocumentPayload::StockReturn(d) => Some(&d.progress),
            _ => None,
        }
    }

    pub fn progress_mut(&mut self) -> Option<&mut FulfillmentProgress> {
        match self {
            DocumentPayload::GoodsOutNote(d) => Some(&mut d.progress),
            DocumentPayload::GoodsInNote(d) | DocumentPayload::StockCorrection(d) => {
                Some(&mut d.progress)
            }
            DocumentPayload::StockTransaction(d) => Some(&mut d.progress),
            DocumentPayload::StockReturn(d) => Some(&mut d.progress),
            _ => None,
        }
    }

    /// Whether the subtype is handled with outbound steps (printed → shipped)
    /// rather than a single received step.
    pub fn is_outbound_handling(&self) -> bool {
        matches!(
            self,
            DocumentPayload::GoodsOutNote(_) | DocumentPayload::StockTransaction(_)
        )
    }
}

/// Row cached on a document header, keyed by the originating order line.
///
/// On a root order this carries per-line overrides (cost, pick locations).
/// On a delivery-type document the rows are its delivery-lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_row_id: LineId,
    pub product_id: Option<ProductId>,
    pub quantity: Decimal,
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl OrderRow {
    pub fn new(order_row_id: LineId, quantity: Decimal) -> Self {
        Self {
            order_row_id,
            product_id: None,
            quantity,
            cost: None,
            locations: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn with_product(mut self, product_id: ProductId) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }
}

/// An order-like document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub sequential_id: Option<u64>,
    pub reference: Option<String>,
    pub direction: Direction,
    pub status: DocumentStatus,
    pub entity: Option<EntityId>,
    /// Originating order. `None` or the document's own id for a root.
    pub parent_order: Option<DocumentId>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_rows: Vec<OrderRow>,
    pub history: Vec<HistoryEntry>,
    pub is_removed: bool,
    pub payload: DocumentPayload,
    /// Number of updates applied since insertion. Stores reject a write
    /// made against a stale version.
    #[serde(default)]
    pub version: u64,
}

impl Document {
    /// Creates an unsaved document of the given subtype in its initial status.
    pub fn new(id: DocumentId, kind: DocumentKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            sequential_id: None,
            reference: None,
            direction: kind.default_direction(),
            status: kind.status_family().initial(),
            entity: None,
            parent_order: None,
            delivery_date: None,
            created_at: now,
            updated_at: now,
            order_rows: Vec::new(),
            history: Vec::new(),
            is_removed: false,
            payload: DocumentPayload::default_for(kind),
            version: 0,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        self.payload.kind()
    }

    /// Identity of the order whose lines this document refers to.
    pub fn root_id(&self) -> DocumentId {
        self.parent_order.unwrap_or(self.id)
    }

    /// True when the document is its own root (a root order or a
    /// standalone delivery).
    pub fn is_own_root(&self) -> bool {
        self.root_id() == self.id
    }

    /// Active cached rows, skipping soft-deleted ones.
    pub fn active_rows(&self) -> impl Iterator<Item = &OrderRow> {
        self.order_rows.iter().filter(|row| !row.is_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kind_families() {
        assert_eq!(DocumentKind::OrderCustomer.family(), DocumentFamily::Order);
        assert_eq!(
            DocumentKind::QuotationSupplier.family(),
            DocumentFamily::Quotation
        );
        assert_eq!(DocumentKind::GoodsInNote.family(), DocumentFamily::Delivery);
        assert!(DocumentKind::OrderSupplier.is_root());
        assert!(!DocumentKind::StockReturn.is_root());
        assert!(DocumentKind::GoodsOutNote.is_delivery());
        assert!(!DocumentKind::StockTransaction.is_delivery());
    }

    #[test]
    fn payload_kind_matches_default() {
        for kind in DocumentKind::ALL {
            assert_eq!(DocumentPayload::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn new_document_starts_in_family_initial_status() {
        let order = Document::new(DocumentId::new(), DocumentKind::OrderCustomer);
        assert_eq!(order.status, DocumentStatus::Draft);
        assert_eq!(order.direction, Direction::Sell);

        let quote = Document::new(DocumentId::new(), DocumentKind::QuotationSupplier);
        assert_eq!(quote.status, DocumentStatus::New);
        assert_eq!(quote.direction, Direction::Buy);
    }

    #[test]
    fn root_id_falls_back_to_own_id() {
        let mut doc = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        assert!(doc.is_own_root());

        let parent = DocumentId::new();
        doc.parent_order = Some(parent);
        assert_eq!(doc.root_id(), parent);
        assert!(!doc.is_own_root());
    }

    #[test]
    fn progress_only_on_handled_subtypes() {
        assert!(
            DocumentPayload::default_for(DocumentKind::OrderCustomer)
                .progress()
                .is_none()
        );
        assert!(
            DocumentPayload::default_for(DocumentKind::GoodsInNote)
                .progress()
                .is_some()
        );
        assert!(DocumentPayload::default_for(DocumentKind::StockTransaction).is_outbound_handling());
        assert!(!DocumentPayload::default_for(DocumentKind::StockReturn).is_outbound_handling());
    }

    #[test]
    fn payload_serialization_is_tagged() {
        let payload = DocumentPayload::default_for(DocumentKind::GoodsOutNote);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "GoodsOutNote");
        assert_eq!(json["details"]["boxes"], 1);
    }

    #[test]
    fn active_rows_skip_deleted() {
        let mut doc = Document::new(DocumentId::new(), DocumentKind::GoodsOutNote);
        let mut deleted = OrderRow::new(LineId::new(), dec!(2));
        deleted.is_deleted = true;
        doc.order_rows = vec![OrderRow::new(LineId::new(), dec!(1)), deleted];
        assert_eq!(doc.active_rows().count(), 1);
    }
}
