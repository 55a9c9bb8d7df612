//! Job lifecycle and SLA enforcement for appraisal orders.
//!
//! The state machine owns the legal-transition table, the SLA module owns the
//! pure breach math, the service composes both over the versioned job store,
//! and the bulk coordinator layers per-item failure isolation on top.

pub mod bulk;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod sla;
pub mod state_machine;

#[cfg(test)]
mod tests;

pub use bulk::{
    BulkApproveOutcome, BulkCancelOutcome, BulkFailure, BulkFailureKind, BulkOperationCoordinator,
};
pub use domain::{
    Actor, ActorRole, Job, JobId, JobStatus, NewJob, ScopePreset, StatusHistoryEntry,
};
pub use repository::{
    JobRecord, JobRepository, JobStatusView, PayoutError, PayoutGateway, PayoutId, PayoutRequest,
};
pub use router::{job_router, JobApi};
pub use service::{JobLifecycleService, JobWorkflowError, TransitionCommand};
pub use sla::{BreachReport, BreachedJob};
pub use state_machine::{IllegalTransition, JobStateMachine};
