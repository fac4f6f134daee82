//! Reconciled read model of an order: its lines annotated with what has
//! been delivered against them.

use chrono::{DateTime, Utc};
use common::{Document, DocumentId, DocumentStatus, FulfillmentStep, Line};
use rust_decimal::Decimal;
use serde::Serialize;

/// One delivery document contributing to a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub document_id: DocumentId,
    pub reference: Option<String>,
    /// Sum of the document's rows for the line.
    pub quantity: Decimal,
    pub delivery_date: Option<DateTime<Utc>>,
    pub status: DocumentStatus,
    /// Most advanced handling step recorded on the document.
    pub stage: Option<FulfillmentStep>,
}

/// A per-line problem found during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LineAnomaly {
    /// The line's product no longer exists in the catalog. Delivered and
    /// outstanding quantities are not computed from deliveries.
    ProductUnresolved,
    /// More has been delivered than ordered.
    NegativeOutstanding { excess: Decimal },
}

/// Delivered and outstanding quantities of an inventory-tracked line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFulfillment {
    pub ordered_qty: Decimal,
    pub delivered_qty: Decimal,
    /// `ordered_qty - delivered_qty`, never clamped.
    pub outstanding_qty: Decimal,
    pub deliveries: Vec<DeliveryRecord>,
    /// The product's direct cost.
    pub product_cost: Option<Decimal>,
    pub anomalies: Vec<LineAnomaly>,
}

impl LineFulfillment {
    pub fn is_fully_fulfilled(&self) -> bool {
        self.outstanding_qty.is_zero() && !self.is_product_unresolved()
    }

    pub fn is_over_delivered(&self) -> bool {
        self.outstanding_qty.is_sign_negative() && !self.outstanding_qty.is_zero()
    }

    pub fn is_product_unresolved(&self) -> bool {
        self.anomalies.contains(&LineAnomaly::ProductUnresolved)
    }
}

/// Per-line fields cached on the header of the document being read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowOverrides {
    pub cost: Option<Decimal>,
    pub locations: Vec<String>,
    /// Quantity cached on the header for this line. On a delivery document
    /// this is the quantity the document itself carries.
    pub quantity: Decimal,
}

/// A line of the reconciled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledLine {
    pub line: Line,
    /// `None` for lines that are not inventory-tracked or reference no
    /// product.
    pub fulfillment: Option<LineFulfillment>,
    pub overrides: Option<RowOverrides>,
}

impl ReconciledLine {
    pub fn delivered_qty(&self) -> Decimal {
        self.fulfillment
            .as_ref()
            .map(|f| f.delivered_qty)
            .unwrap_or(Decimal::ZERO)
    }

    /// Effective unit cost: the header override if any, otherwise the line's.
    pub fn effective_cost(&self) -> Decimal {
        self.overrides
            .as_ref()
            .and_then(|o| o.cost)
            .unwrap_or(self.line.unit_cost)
    }
}

/// A document together with the reconciled lines of its root order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledOrder {
    pub document: Document,
    /// Sorted by sequence, ties in insertion order.
    pub lines: Vec<ReconciledLine>,
}

impl ReconciledOrder {
    pub fn line(&self, id: common::LineId) -> Option<&ReconciledLine> {
        self.lines.iter().find(|l| l.line.id == id)
    }

    /// True when any line carries an anomaly.
    pub fn has_anomalies(&self) -> bool {
        self.lines
            .iter()
            .filter_map(|l| l.fulfillment.as_ref())
            .any(|f| !f.anomalies.is_empty())
    }
}
