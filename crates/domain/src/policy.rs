//! Lifecycle configuration and the status transition guard.

use std::str::FromStr;

use common::{DocumentKind, DocumentStatus};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::reference::ReferenceFormat;

/// Guard applied to status transitions.
///
/// Statuses outside the document's status family are always rejected; this
/// policy only decides whether terminal statuses may be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionPolicy {
    /// Any in-family transition is accepted, including out of `CLOSED`,
    /// `CANCELED` and `BILLED`.
    #[default]
    Permissive,
    /// Transitions out of a terminal status are rejected.
    LockTerminal,
}

impl TransitionPolicy {
    pub fn check(
        &self,
        kind: DocumentKind,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<(), DomainError> {
        if !to.belongs_to(kind.status_family()) {
            return Err(DomainError::StatusNotAllowed { status: to, kind });
        }
        if matches!(self, TransitionPolicy::LockTerminal) && from.is_terminal() && from != to {
            return Err(DomainError::TransitionRejected { from, to });
        }
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionPolicy::Permissive => "permissive",
            TransitionPolicy::LockTerminal => "lock-terminal",
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "lock-terminal" | "lock_terminal" => Ok(TransitionPolicy::LockTerminal),
            other => Err(format!("unknown transition policy: {other}")),
        }
    }
}

/// Settings of the document lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub format: ReferenceFormat,
    pub transition_policy: TransitionPolicy,
    /// Qualify the shared `ORDER` counter by accounting entity.
    pub scope_per_entity: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_allows_leaving_terminal() {
        let policy = TransitionPolicy::Permissive;
        assert!(policy
            .check(
                DocumentKind::OrderCustomer,
                DocumentStatus::Closed,
                DocumentStatus::Processing
            )
            .is_ok());
    }

    #[test]
    fn lock_terminal_rejects_leaving_terminal() {
        let policy = TransitionPolicy::LockTerminal;
        let result = policy.check(
            DocumentKind::OrderCustomer,
            DocumentStatus::Billed,
            DocumentStatus::Validated,
        );
        assert!(matches!(result, Err(DomainError::TransitionRejected { .. })));

        // Non-terminal system statuses stay open
        assert!(policy
            .check(
                DocumentKind::OrderCustomer,
                DocumentStatus::Error,
                DocumentStatus::Validated
            )
            .is_ok());
    }

    #[test]
    fn foreign_family_status_rejected() {
        let result = TransitionPolicy::Permissive.check(
            DocumentKind::QuotationCustomer,
            DocumentStatus::New,
            DocumentStatus::Shipping,
        );
        assert!(matches!(result, Err(DomainError::StatusNotAllowed { .. })));
    }

    #[test]
    fn parse_policy() {
        assert_eq!(
            "lock-terminal".parse::<TransitionPolicy>(),
            Ok(TransitionPolicy::LockTerminal)
        );
        assert_eq!(
            "Permissive".parse::<TransitionPolicy>(),
            Ok(TransitionPolicy::Permissive)
        );
        assert!("strict".parse::<TransitionPolicy>().is_err());
    }
}
