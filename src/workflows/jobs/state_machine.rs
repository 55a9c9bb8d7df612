//! Legal-transition rules for the job lifecycle.
//!
//! ```text
//!   PendingDispatch → Dispatched → Accepted → InProgress → Submitted
//!                                                              │
//!                                          ┌───────────────────┤
//!                                          ▼                   ▼
//!                                     UnderReview ──────→ Completed
//!                                          │
//!                                          └─────→ Failed
//!
//!   every non-terminal status ──────→ Cancelled
//! ```
//!
//! Terminal: Completed, Cancelled, Failed. The validator is stateless; the
//! service layer owns preconditions that need the job itself (cancel reason,
//! appraiser assignment).

use super::domain::JobStatus;

/// Requested transition not present in the legal table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition from {from} to {requested}")]
pub struct IllegalTransition {
    pub from: JobStatus,
    pub requested: JobStatus,
}

pub struct JobStateMachine;

impl JobStateMachine {
    pub const fn is_allowed(from: JobStatus, to: JobStatus) -> bool {
        use JobStatus::*;

        match (from, to) {
            (PendingDispatch, Dispatched)
            | (Dispatched, Accepted)
            | (Accepted, InProgress)
            | (InProgress, Submitted)
            | (Submitted, UnderReview)
            | (Submitted, Completed)
            | (UnderReview, Completed)
            | (UnderReview, Failed) => true,
            (
                PendingDispatch | Dispatched | Accepted | InProgress | Submitted | UnderReview,
                Cancelled,
            ) => true,
            _ => false,
        }
    }

    pub fn validate(from: JobStatus, requested: JobStatus) -> Result<(), IllegalTransition> {
        if Self::is_allowed(from, requested) {
            Ok(())
        } else {
            Err(IllegalTransition { from, requested })
        }
    }

    /// Statuses reachable in one step from `from`.
    pub const fn allowed_from(from: JobStatus) -> &'static [JobStatus] {
        use JobStatus::*;

        match from {
            PendingDispatch => &[Dispatched, Cancelled],
            Dispatched => &[Accepted, Cancelled],
            Accepted => &[InProgress, Cancelled],
            InProgress => &[Submitted, Cancelled],
            Submitted => &[UnderReview, Completed, Cancelled],
            UnderReview => &[Completed, Failed, Cancelled],
            Completed | Cancelled | Failed => &[],
        }
    }
}
