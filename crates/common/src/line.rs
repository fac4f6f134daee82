//! Order lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DocumentId, LineId, ProductId};

/// A product/quantity row owned by a root order or quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    pub order_id: DocumentId,
    /// `None` for free-text lines that reference no product.
    pub product_id: Option<ProductId>,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    /// Explicit ordering key; lines can be reordered independently of
    /// insertion order.
    pub sequence: i32,
    pub is_deleted: bool,
    pub ref_supplier_product: Option<String>,
    pub description: Option<String>,
}

impl Line {
    pub fn new(
        order_id: DocumentId,
        product_id: Option<ProductId>,
        quantity: Decimal,
        unit_cost: Decimal,
        sequence: i32,
    ) -> Self {
        Self {
            id: LineId::new(),
            order_id,
            product_id,
            quantity,
            unit_cost,
            sequence,
            is_deleted: false,
            ref_supplier_product: None,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_supplier_ref(mut self, reference: impl Into<String>) -> Self {
        self.ref_supplier_product = Some(reference.into());
        self
    }

    /// Quantity times unit cost.
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}
