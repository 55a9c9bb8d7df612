//! Legal-transition rules for disputes.
//!
//! ```text
//!   Open ──→ UnderReview ──→ Resolved
//!    │  │        │  ▲
//!    │  └────────┼──┼──→ Escalated
//!    │           │  └─────────┘
//!    └───────────┴──→ Closed  (also reachable from Escalated)
//! ```
//!
//! Terminal: Resolved, Closed. An escalated dispute is resolved by routing
//! back through UnderReview; there is no direct Escalated → Resolved edge.

use super::domain::DisputeStatus;

/// Requested transition not present in the legal table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition from {from} to {requested}")]
pub struct IllegalTransition {
    pub from: DisputeStatus,
    pub requested: DisputeStatus,
}

pub struct DisputeStateMachine;

impl DisputeStateMachine {
    pub const fn is_allowed(from: DisputeStatus, to: DisputeStatus) -> bool {
        use DisputeStatus::*;

        matches!(
            (from, to),
            (Open, UnderReview)
                | (Open | UnderReview, Resolved)
                | (Open | UnderReview, Escalated)
                | (Escalated, UnderReview)
                | (Open | UnderReview | Escalated, Closed)
        )
    }

    pub fn validate(from: DisputeStatus, requested: DisputeStatus) -> Result<(), IllegalTransition> {
        if Self::is_allowed(from, requested) {
            Ok(())
        } else {
            Err(IllegalTransition { from, requested })
        }
    }

    /// Statuses reachable in one step from `from`.
    pub const fn allowed_from(from: DisputeStatus) -> &'static [DisputeStatus] {
        use DisputeStatus::*;

        match from {
            Open => &[UnderReview, Resolved, Escalated, Closed],
            UnderReview => &[Resolved, Escalated, Closed],
            Escalated => &[UnderReview, Closed],
            Resolved | Closed => &[],
        }
    }
}
