//! Document statuses, status history and delivery fulfillment progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Which status set a document draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFamily {
    /// Orders and every downstream document.
    Order,
    /// Customer and supplier quotations.
    Quotation,
}

impl StatusFamily {
    /// Status a freshly created document starts in.
    pub fn initial(&self) -> DocumentStatus {
        match self {
            StatusFamily::Order => DocumentStatus::Draft,
            StatusFamily::Quotation => DocumentStatus::New,
        }
    }
}

/// The workflow status of a document.
///
/// Sales-order family:
/// ```text
/// DRAFT → VALIDATED → SEND → PROCESSING → SHIPPING → BILLING → BILLED → CLOSED
///                       (CANCELED and ERROR reachable from anywhere)
/// ```
/// Quotation family: `NEW → VALIDATED → SIGNED | NOTSIGNED | CANCELED`.
///
/// The ordering above is informational; transitions are driven by the
/// business layer and guarded by the lifecycle controller's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Draft,
    Validated,
    Send,
    Processing,
    Shipping,
    Billing,
    Billed,
    Closed,
    Canceled,
    Error,
    New,
    Signed,
    NotSigned,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 13] = [
        DocumentStatus::Draft,
        DocumentStatus::Validated,
        DocumentStatus::Send,
        DocumentStatus::Processing,
        DocumentStatus::Shipping,
        DocumentStatus::Billing,
        DocumentStatus::Billed,
        DocumentStatus::Closed,
        DocumentStatus::Canceled,
        DocumentStatus::Error,
        DocumentStatus::New,
        DocumentStatus::Signed,
        DocumentStatus::NotSigned,
    ];

    /// Returns true if the status is valid for documents of the given family.
    pub fn belongs_to(&self, family: StatusFamily) -> bool {
        match family {
            StatusFamily::Order => !matches!(
                self,
                DocumentStatus::New | DocumentStatus::Signed | DocumentStatus::NotSigned
            ),
            StatusFamily::Quotation => matches!(
                self,
                DocumentStatus::New
                    | DocumentStatus::Validated
                    | DocumentStatus::Signed
                    | DocumentStatus::NotSigned
                    | DocumentStatus::Canceled
            ),
        }
    }

    /// System-flagged statuses are final for reporting purposes.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Draft
                | DocumentStatus::Closed
                | DocumentStatus::Canceled
                | DocumentStatus::Billed
                | DocumentStatus::Signed
                | DocumentStatus::Error
        )
    }

    /// Terminal statuses of the commercial workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Closed | DocumentStatus::Canceled | DocumentStatus::Billed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Validated => "VALIDATED",
            DocumentStatus::Send => "SEND",
            DocumentStatus::Processing => "PROCESSING",
            DocumentStatus::Shipping => "SHIPPING",
            DocumentStatus::Billing => "BILLING",
            DocumentStatus::Billed => "BILLED",
            DocumentStatus::Closed => "CLOSED",
            DocumentStatus::Canceled => "CANCELED",
            DocumentStatus::Error => "ERROR",
            DocumentStatus::New => "NEW",
            DocumentStatus::Signed => "SIGNED",
            DocumentStatus::NotSigned => "NOTSIGNED",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(input))
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user responsible for a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub name: String,
}

impl Actor {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Channel through which a history entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    New,
    #[default]
    Status,
    Email,
    Alert,
}

/// One immutable entry of a document's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub author: Option<Actor>,
    pub mode: HistoryMode,
    pub previous: DocumentStatus,
    pub status: DocumentStatus,
    pub message: Option<String>,
}

/// A timestamped step in the physical handling of a delivery document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FulfillmentStep {
    Printed,
    Picked,
    Packed,
    Shipped,
    Received,
}

impl FulfillmentStep {
    /// Steps of outbound documents, in progression order.
    pub const OUTBOUND: [FulfillmentStep; 4] = [
        FulfillmentStep::Printed,
        FulfillmentStep::Picked,
        FulfillmentStep::Packed,
        FulfillmentStep::Shipped,
    ];

    pub fn is_outbound(&self) -> bool {
        !matches!(self, FulfillmentStep::Received)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStep::Printed => "printed",
            FulfillmentStep::Picked => "picked",
            FulfillmentStep::Packed => "packed",
            FulfillmentStep::Shipped => "shipped",
            FulfillmentStep::Received => "received",
        }
    }
}

impl std::fmt::Display for FulfillmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When a step happened and who did it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMark {
    pub at: DateTime<Utc>,
    pub by: Option<UserId>,
}

/// Physical handling progress of a delivery-type document.
///
/// Each step is recorded at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentProgress {
    pub printed: Option<StepMark>,
    pub picked: Option<StepMark>,
    pub packed: Option<StepMark>,
    pub shipped: Option<StepMark>,
    pub received: Option<StepMark>,
}

impl FulfillmentProgress {
    pub fn mark(&self, step: FulfillmentStep) -> Option<&StepMark> {
        match step {
            FulfillmentStep::Printed => self.printed.as_ref(),
            FulfillmentStep::Picked => self.picked.as_ref(),
            FulfillmentStep::Packed => self.packed.as_ref(),
            FulfillmentStep::Shipped => self.shipped.as_ref(),
            FulfillmentStep::Received => self.received.as_ref(),
        }
    }

    fn slot_mut(&mut self, step: FulfillmentStep) -> &mut Option<StepMark> {
        match step {
            FulfillmentStep::Printed => &mut self.printed,
            FulfillmentStep::Picked => &mut self.picked,
            FulfillmentStep::Packed => &mut self.packed,
            FulfillmentStep::Shipped => &mut self.shipped,
            FulfillmentStep::Received => &mut self.received,
        }
    }

    /// Records a step. Returns false, leaving the existing mark intact, if the
    /// step was already recorded.
    pub fn record(&mut self, step: FulfillmentStep, mark: StepMark) -> bool {
        let slot = self.slot_mut(step);
        if slot.is_some() {
            return false;
        }
        *slot = Some(mark);
        true
    }

    /// The most advanced step recorded so far.
    pub fn stage(&self) -> Option<FulfillmentStep> {
        if self.received.is_some() {
            return Some(FulfillmentStep::Received);
        }
        FulfillmentStep::OUTBOUND
            .into_iter()
            .rev()
            .find(|step| self.mark(*step).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_per_family() {
        assert_eq!(StatusFamily::Order.initial(), DocumentStatus::Draft);
        assert_eq!(StatusFamily::Quotation.initial(), DocumentStatus::New);
    }

    #[test]
    fn quotation_statuses_are_not_order_statuses() {
        assert!(DocumentStatus::Signed.belongs_to(StatusFamily::Quotation));
        assert!(!DocumentStatus::Signed.belongs_to(StatusFamily::Order));
        assert!(DocumentStatus::Shipping.belongs_to(StatusFamily::Order));
        assert!(!DocumentStatus::Shipping.belongs_to(StatusFamily::Quotation));
        assert!(DocumentStatus::Canceled.belongs_to(StatusFamily::Order));
        assert!(DocumentStatus::Canceled.belongs_to(StatusFamily::Quotation));
    }

    #[test]
    fn system_flags() {
        for status in [
            DocumentStatus::Closed,
            DocumentStatus::Canceled,
            DocumentStatus::Billed,
            DocumentStatus::Signed,
            DocumentStatus::Error,
            DocumentStatus::Draft,
        ] {
            assert!(status.is_system(), "{status} should be system-flagged");
        }
        assert!(!DocumentStatus::Validated.is_system());
        assert!(!DocumentStatus::Processing.is_system());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&DocumentStatus::NotSigned).unwrap(),
            "\"NOTSIGNED\""
        );
        let parsed: DocumentStatus = serde_json::from_str("\"VALIDATED\"").unwrap();
        assert_eq!(parsed, DocumentStatus::Validated);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(DocumentStatus::parse("closed"), Some(DocumentStatus::Closed));
        assert_eq!(DocumentStatus::parse("bogus"), None);
    }

    #[test]
    fn fulfillment_step_recorded_once() {
        let mut progress = FulfillmentProgress::default();
        let first = StepMark {
            at: Utc::now(),
            by: None,
        };
        let second = StepMark {
            at: Utc::now(),
            by: Some(UserId::new()),
        };

        assert!(progress.record(FulfillmentStep::Picked, first));
        assert!(!progress.record(FulfillmentStep::Picked, second));
        assert_eq!(progress.picked, Some(first));
    }

    #[test]
    fn stage_is_most_advanced_step() {
        let mut progress = FulfillmentProgress::default();
        assert_eq!(progress.stage(), None);

        let mark = StepMark {
            at: Utc::now(),
            by: None,
        };
        progress.record(FulfillmentStep::Printed, mark);
        progress.record(FulfillmentStep::Packed, mark);
        assert_eq!(progress.stage(), Some(FulfillmentStep::Packed));
    }
}
