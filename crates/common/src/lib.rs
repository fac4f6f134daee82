//! Shared data model for order-like documents and their lines.

pub mod document;
pub mod line;
pub mod status;
pub mod types;

pub use document::{
    CustomerOrderDetails, DELIVERY_KINDS, Direction, Document, DocumentFamily, DocumentKind,
    DocumentPayload, GoodsOutDetails, InboundDetails, OrderRow, ProgressCode, QuotationDetails,
    ReturnDetails, SupplierOrderDetails, TransferDetails,
};
pub use line::Line;
pub use status::{
    Actor, DocumentStatus, FulfillmentProgress, FulfillmentStep, HistoryEntry, HistoryMode,
    StatusFamily, StepMark,
};
pub use types::{DocumentId, EntityId, LineId, ProductId, UserId};
