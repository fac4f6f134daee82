//! Reference formatting.
//!
//! Every function here is pure: the same inputs always give the same string.
//!
//! | subtype                         | sell | buy | form                          |
//! |---------------------------------|------|-----|-------------------------------|
//! | order                           | CO   | CF  | prefix + entity + body        |
//! | quotation                       | PC   | DA  | prefix + entity + body        |
//! | standalone goods-out / goods-in | BL   | RE  | prefix + entity + body        |
//! | child goods-out / goods-in      | BL   | RE  | prefix + parent[2..] + "/" + n |
//! | stock transaction               | TX   | TX  | prefix + "-" + n              |
//! | stock return                    | RT   | RT  | prefix + "-" + n              |
//! | stock correction                | SC   | SC  | prefix + "-" + n              |
//!
//! `body` is the sequence number, zero-padded to the configured width, and
//! optionally preceded by a `YYMM-` date segment.

use chrono::{DateTime, Utc};
use common::{Direction, DocumentFamily, DocumentKind};
use serde::{Deserialize, Serialize};

/// Prefix letters for a subtype and direction.
pub fn prefix_for(kind: DocumentKind, direction: Direction) -> &'static str {
    match (kind.family(), direction) {
        (DocumentFamily::Order, Direction::Sell) => "CO",
        (DocumentFamily::Order, Direction::Buy) => "CF",
        (DocumentFamily::Quotation, Direction::Sell) => "PC",
        (DocumentFamily::Quotation, Direction::Buy) => "DA",
        (DocumentFamily::Delivery, Direction::Sell) => "BL",
        (DocumentFamily::Delivery, Direction::Buy) => "RE",
        (DocumentFamily::Transfer, _) => "TX",
        (DocumentFamily::Return, _) => "RT",
        (DocumentFamily::Correction, _) => "SC",
    }
}

/// Which formatting rule applies to a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceRule<'a> {
    /// Root commercial documents and standalone deliveries.
    Root { prefix: &'static str },
    /// Deliveries raised against an existing order.
    Child {
        prefix: &'static str,
        parent_reference: &'a str,
    },
    /// Transfers, returns and corrections.
    Counter { prefix: &'static str },
}

impl<'a> ReferenceRule<'a> {
    /// Selects the rule for a subtype. `parent_reference` is the reference
    /// of the order a delivery is raised against, if any.
    pub fn select(
        kind: DocumentKind,
        direction: Direction,
        parent_reference: Option<&'a str>,
    ) -> Self {
        let prefix = prefix_for(kind, direction);
        match kind.family() {
            DocumentFamily::Transfer | DocumentFamily::Return | DocumentFamily::Correction => {
                ReferenceRule::Counter { prefix }
            }
            DocumentFamily::Delivery => match parent_reference {
                Some(parent_reference) => ReferenceRule::Child {
                    prefix,
                    parent_reference,
                },
                None => ReferenceRule::Root { prefix },
            },
            DocumentFamily::Order | DocumentFamily::Quotation => ReferenceRule::Root { prefix },
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceRule::Root { prefix }
            | ReferenceRule::Child { prefix, .. }
            | ReferenceRule::Counter { prefix } => prefix,
        }
    }
}

/// Formatting policy shared by every reference of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReferenceFormat {
    /// Minimum digits of the sequence number; 0 disables padding.
    pub pad_width: usize,
    /// Embed a `YYMM-` segment before the sequence number.
    pub date_segment: bool,
}

impl ReferenceFormat {
    pub fn new(pad_width: usize, date_segment: bool) -> Self {
        Self {
            pad_width,
            date_segment,
        }
    }

    fn body(&self, seq: u64, date: DateTime<Utc>) -> String {
        let width = self.pad_width;
        if self.date_segment {
            format!("{}-{seq:0width$}", date.format("%y%m"))
        } else {
            format!("{seq:0width$}")
        }
    }

    /// Builds a reference.
    ///
    /// `entity_prefix` is only used by the root rule; `date` only when the
    /// date segment is enabled.
    pub fn format(
        &self,
        rule: &ReferenceRule<'_>,
        entity_prefix: Option<&str>,
        seq: u64,
        date: DateTime<Utc>,
    ) -> String {
        match rule {
            ReferenceRule::Root { prefix } => format!(
                "{prefix}{}{}",
                entity_prefix.unwrap_or_default(),
                self.body(seq, date)
            ),
            ReferenceRule::Child {
                prefix,
                parent_reference,
            } => {
                let stem: String = parent_reference.chars().skip(2).collect();
                format!("{prefix}{stem}/{seq}")
            }
            ReferenceRule::Counter { prefix } => format!("{prefix}-{seq}"),
        }
    }

    /// Rewrites the `YYMM` segment of a reference to match `date`.
    ///
    /// Idempotent. References without a date segment, and every reference
    /// when the segment is disabled, are returned unchanged.
    pub fn refresh_date_segment(&self, reference: &str, date: DateTime<Utc>) -> String {
        if !self.date_segment {
            return reference.to_string();
        }

        let split = reference.find('/').unwrap_or(reference.len());
        let (head, tail) = reference.split_at(split);
        let Some(dash) = head.rfind('-') else {
            return reference.to_string();
        };
        if dash < 4 || !head.as_bytes()[dash - 4..dash].iter().all(u8::is_ascii_digit) {
            return reference.to_string();
        }

        format!(
            "{}{}{}{}",
            &head[..dash - 4],
            date.format("%y%m"),
            &head[dash..],
            tail
        )
    }
}

/// Recovers the sequence number from a reference built with `prefix` and
/// `entity_prefix`.
pub fn parse_sequence(reference: &str, prefix: &str, entity_prefix: Option<&str>) -> Option<u64> {
    if let Some((_, counter)) = reference.rsplit_once('/') {
        return counter.parse().ok();
    }

    let rest = reference.strip_prefix(prefix)?;
    if let Some(counter) = rest.strip_prefix('-') {
        return counter.parse().ok();
    }

    let rest = match entity_prefix {
        Some(entity) => rest.strip_prefix(entity)?,
        None => rest,
    };
    let digits = rest.rsplit_once('-').map_or(rest, |(_, n)| n);
    digits.parse().ok()
}
