//! Pure reconciliation stages.
//!
//! Each stage takes explicit input and builds new values; nothing loaded from
//! the store is mutated.

use std::collections::HashMap;

use common::{DELIVERY_KINDS, Document, DocumentId, Line, LineId, ProductId};
use rust_decimal::Decimal;

use crate::catalog::ProductInfo;
use crate::view::{
    DeliveryRecord, LineAnomaly, LineFulfillment, ReconciledLine, ReconciledOrder, RowOverrides,
};

/// How a line takes part in reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Inventory-tracked product: reconciled against deliveries.
    Tracked(&'a ProductInfo),
    /// Product id set but missing from the catalog.
    Unresolved,
    /// Free-text line or non-inventory product.
    PassThrough,
}

/// Classifies a line against the catalog lookup.
pub fn classify<'a>(line: &Line, products: &'a HashMap<ProductId, ProductInfo>) -> LineClass<'a> {
    match line.product_id {
        None => LineClass::PassThrough,
        Some(id) => match products.get(&id) {
            Some(product) if product.inventory => LineClass::Tracked(product),
            Some(_) => LineClass::PassThrough,
            None => LineClass::Unresolved,
        },
    }
}

/// Delivery documents that count towards the order, excluding the document
/// being read.
pub fn counted_deliveries(linked: &[Document], current: DocumentId) -> Vec<&Document> {
    linked
        .iter()
        .filter(|doc| doc.id != current)
        .filter(|doc| !doc.is_removed)
        .filter(|doc| DELIVERY_KINDS.contains(&doc.kind()))
        .collect()
}

/// One record per delivery document carrying active rows for the line,
/// in delivery document order.
pub fn deliveries_for_line(line_id: LineId, deliveries: &[&Document]) -> Vec<DeliveryRecord> {
    deliveries
        .iter()
        .filter_map(|doc| {
            let mut rows = doc.active_rows().filter(|row| row.order_row_id == line_id).peekable();
            rows.peek()?;
            let quantity: Decimal = rows.map(|row| row.quantity).sum();
            Some(DeliveryRecord {
                document_id: doc.id,
                reference: doc.reference.clone(),
                quantity,
                delivery_date: doc.delivery_date,
                status: doc.status,
                stage: doc.payload.progress().and_then(|p| p.stage()),
            })
        })
        .collect()
}

/// Computes delivered and outstanding quantities for a line.
pub fn annotate(line: &Line, class: LineClass<'_>, deliveries: &[&Document]) -> Option<LineFulfillment> {
    match class {
        LineClass::PassThrough => None,
        LineClass::Unresolved => Some(LineFulfillment {
            ordered_qty: line.quantity,
            delivered_qty: Decimal::ZERO,
            outstanding_qty: line.quantity,
            deliveries: Vec::new(),
            product_cost: None,
            anomalies: vec![LineAnomaly::ProductUnresolved],
        }),
        LineClass::Tracked(product) => {
            let records = deliveries_for_line(line.id, deliveries);
            let delivered_qty: Decimal = records.iter().map(|r| r.quantity).sum();
            let outstanding_qty = line.quantity - delivered_qty;

            let mut anomalies = Vec::new();
            if outstanding_qty < Decimal::ZERO {
                anomalies.push(LineAnomaly::NegativeOutstanding {
                    excess: -outstanding_qty,
                });
            }

            Some(LineFulfillment {
                ordered_qty: line.quantity,
                delivered_qty,
                outstanding_qty,
                deliveries: records,
                product_cost: Some(product.direct_cost),
                anomalies,
            })
        }
    }
}

/// Header-cached fields for a line, from the document being read.
pub fn overrides_for(line_id: LineId, current: &Document) -> Option<RowOverrides> {
    current
        .active_rows()
        .find(|row| row.order_row_id == line_id)
        .map(|row| RowOverrides {
            cost: row.cost,
            locations: row.locations.clone(),
            quantity: row.quantity,
        })
}

/// Runs every stage and assembles the reconciled order.
///
/// `lines` must be the root order's non-deleted lines in insertion order;
/// the sort by sequence is stable so ties keep that order.
pub fn assemble(
    current: &Document,
    lines: Vec<Line>,
    linked: &[Document],
    products: &HashMap<ProductId, ProductInfo>,
) -> ReconciledOrder {
    let deliveries = counted_deliveries(linked, current.id);

    let mut reconciled: Vec<ReconciledLine> = lines
        .into_iter()
        .filter(|line| !line.is_deleted)
        .map(|line| {
            let fulfillment = annotate(&line, classify(&line, products), &deliveries);
            let overrides = overrides_for(line.id, current);
            ReconciledLine {
                line,
                fulfillment,
                overrides,
            }
        })
        .collect();
    reconciled.sort_by_key(|l| l.line.sequence);

    ReconciledOrder {
        document: current.clone(),
        lines: reconciled,
    }
}
