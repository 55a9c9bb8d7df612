use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Dispute, DisputeId};
use crate::workflows::jobs::domain::JobId;
use crate::workflows::store::RepositoryError;

/// Repository record pairing a dispute with its optimistic-concurrency
/// version, mirroring the job store contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisputeRecord {
    pub dispute: Dispute,
    pub version: u64,
}

impl DisputeRecord {
    pub fn status_view(&self) -> DisputeStatusView {
        DisputeStatusView {
            dispute_id: self.dispute.id.clone(),
            status: self.dispute.status.label(),
            priority: self.dispute.priority,
            resolved_at: self.dispute.resolved_at,
            comment_count: self.dispute.comments.len(),
            version: self.version,
        }
    }
}

/// Storage abstraction for the dispute store; the single owner of dispute
/// mutation. `update` is a conditional write keyed on `version`.
pub trait DisputeRepository: Send + Sync {
    fn insert(&self, dispute: Dispute) -> Result<DisputeRecord, RepositoryError>;
    fn fetch(&self, id: &DisputeId) -> Result<Option<DisputeRecord>, RepositoryError>;
    fn update(&self, record: DisputeRecord) -> Result<DisputeRecord, RepositoryError>;
}

/// Refund collaborator invoked after a resolution with a refund commits.
pub trait RefundGateway: Send + Sync {
    fn issue_refund(&self, request: RefundRequest) -> Result<RefundId, RefundError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundRequest {
    pub dispute_id: DisputeId,
    pub amount_cents: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundId(pub String);

#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    #[error("refund collaborator unavailable: {0}")]
    Transport(String),
    #[error("refund rejected: {0}")]
    Rejected(String),
}

/// Billing collaborator consulted to cap refunds at the amount paid.
pub trait BillingGateway: Send + Sync {
    fn amount_paid(&self, job_id: &JobId) -> Result<u32, BillingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("billing collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized dispute summary returned from mutation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeStatusView {
    pub dispute_id: DisputeId,
    pub status: &'static str,
    pub priority: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub comment_count: usize,
    pub version: u64,
}
