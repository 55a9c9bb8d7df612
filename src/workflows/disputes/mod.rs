//! Dispute intake, review, resolution, and escalation.
//!
//! Disputes hold a weak reference to a job: they may read its summary but
//! never mutate job state. Refunds are issued only after the resolving
//! commit, with failures surfaced for retry rather than reverting it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod state_machine;

#[cfg(test)]
mod tests;

pub use domain::{Dispute, DisputeComment, DisputeId, DisputeStatus, NewDispute};
pub use repository::{
    BillingError, BillingGateway, DisputeRecord, DisputeRepository, DisputeStatusView,
    RefundError, RefundGateway, RefundId, RefundRequest,
};
pub use router::dispute_router;
pub use service::{
    CommentCommand, DisputeWorkflowError, DisputeWorkflowService, RefundDisposition,
    ResolutionOutcome, ResolveCommand,
};
pub use state_machine::{DisputeStateMachine, IllegalTransition};
