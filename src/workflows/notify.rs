//! Outbound notification boundary shared by both state machines.
//!
//! Transitions notify interested parties on a best-effort basis: a delivery
//! failure is logged and never rolls back the committed state change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Notification payload handed to the delivery adapter (e-mail, push, etc.).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub template: String,
    pub recipient_id: String,
    pub details: BTreeMap<String, String>,
}

impl Notice {
    pub fn new(template: impl Into<String>, recipient_id: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            recipient_id: recipient_id.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Trait describing outbound notification hooks.
pub trait NotificationGateway: Send + Sync {
    fn notify(&self, notice: Notice) -> Result<(), NotificationError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Deliver a notice, downgrading any failure to a warning log entry.
pub fn dispatch_best_effort<N: NotificationGateway + ?Sized>(gateway: &N, notice: Notice) {
    let template = notice.template.clone();
    let recipient = notice.recipient_id.clone();
    if let Err(err) = gateway.notify(notice) {
        tracing::warn!(%template, %recipient, error = %err, "notification delivery degraded");
    }
}
