use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflows::jobs::domain::{Actor, JobId};

/// Identifier wrapper for disputes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisputeId(pub String);

impl fmt::Display for DisputeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Escalated,
    Closed,
}

impl DisputeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderReview => "under_review",
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
            Self::Closed => "closed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry in the dispute's append-only comment thread. Internal comments
/// are filtered out at the query boundary, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeComment {
    pub author: Actor,
    pub content: String,
    pub is_internal: bool,
    pub at: DateTime<Utc>,
}

/// A dispute filed by an organization, optionally tied to a job.
///
/// `related_job_id` is a weak reference: the dispute may read job summary
/// fields for display but never mutates job state. `resolution`,
/// `refund_amount_cents`, and `resolved_at` are only ever set together, in
/// the commit that moves the dispute to `resolved`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_job_id: Option<JobId>,
    /// 1 is critical; informational only, never gates a transition.
    pub priority: u8,
    pub status: DisputeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount_cents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub opened_at: DateTime<Utc>,
    pub comments: Vec<DisputeComment>,
}

impl Dispute {
    pub fn open(
        id: DisputeId,
        organization_id: impl Into<String>,
        related_job_id: Option<JobId>,
        priority: u8,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id: organization_id.into(),
            related_job_id,
            priority,
            status: DisputeStatus::Open,
            resolution: None,
            refund_amount_cents: None,
            resolved_at: None,
            opened_at,
            comments: Vec::new(),
        }
    }
}

/// Intake payload for filing a dispute.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDispute {
    pub organization_id: String,
    #[serde(default)]
    pub related_job_id: Option<String>,
    pub priority: u8,
}
