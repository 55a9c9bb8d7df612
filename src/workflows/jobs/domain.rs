use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for appraisal jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who initiated a mutation. Roles gate a handful of preconditions (only the
/// assigned appraiser may accept a job) and pick the notification recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Admin,
        }
    }

    pub fn appraiser(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Appraiser,
        }
    }

    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: ActorRole::Organization,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Organization,
    Appraiser,
    System,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Organization => "organization",
            Self::Appraiser => "appraiser",
            Self::System => "system",
        }
    }
}

/// Lifecycle status of an appraisal job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    PendingDispatch,
    Dispatched,
    Accepted,
    InProgress,
    Submitted,
    UnderReview,
    Completed,
    Cancelled,
    Failed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingDispatch => "pending_dispatch",
            Self::Dispatched => "dispatched",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Terminal statuses admit no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named inspection package chosen at order time. The SLA window starts when
/// the job is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScopePreset {
    pub key: &'static str,
    pub name: &'static str,
    pub price_cents: u32,
    pub photo_count: u8,
    pub sla_hours: i64,
}

impl ScopePreset {
    pub const RUSH: Self = Self {
        key: "rush",
        name: "Rush Inspection",
        price_cents: 24_900,
        photo_count: 12,
        sla_hours: 24,
    };

    pub const STANDARD: Self = Self {
        key: "standard",
        name: "Standard Inspection",
        price_cents: 39_900,
        photo_count: 24,
        sla_hours: 72,
    };

    pub const EXTENDED: Self = Self {
        key: "extended",
        name: "Extended Inspection",
        price_cents: 64_900,
        photo_count: 40,
        sla_hours: 168,
    };

    pub const fn catalog() -> [Self; 3] {
        [Self::RUSH, Self::STANDARD, Self::EXTENDED]
    }

    pub fn by_key(key: &str) -> Option<Self> {
        Self::catalog()
            .into_iter()
            .find(|preset| preset.key.eq_ignore_ascii_case(key.trim()))
    }

    pub fn sla(&self) -> Duration {
        Duration::hours(self.sla_hours)
    }
}

/// Append-only record of one committed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub from: JobStatus,
    pub to: JobStatus,
    pub actor: Actor,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An appraisal job as held by the job store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub organization_id: String,
    pub property_id: String,
    pub scope: ScopePreset,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_appraiser_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_due_at: Option<DateTime<Utc>>,
    pub status_history: Vec<StatusHistoryEntry>,
}

impl Job {
    /// A freshly ordered job awaiting dispatch.
    pub fn pending(
        id: JobId,
        organization_id: impl Into<String>,
        property_id: impl Into<String>,
        scope: ScopePreset,
    ) -> Self {
        Self {
            id,
            organization_id: organization_id.into(),
            property_id: property_id.into(),
            scope,
            status: JobStatus::PendingDispatch,
            assigned_appraiser_id: None,
            sla_due_at: None,
            status_history: Vec::new(),
        }
    }
}

/// Intake payload for placing a new job order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub organization_id: String,
    pub property_id: String,
    pub scope: String,
}
