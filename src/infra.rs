//! In-memory adapters backing the server, the CLI demo, and tests.
//!
//! Production deployments replace these with database- and vendor-backed
//! implementations; the traits they satisfy are the only coupling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::workflows::disputes::domain::{Dispute, DisputeId};
use crate::workflows::disputes::repository::{
    BillingError, BillingGateway, DisputeRecord, DisputeRepository, RefundError, RefundGateway,
    RefundId, RefundRequest,
};
use crate::workflows::jobs::domain::{Job, JobId};
use crate::workflows::jobs::repository::{
    JobRecord, JobRepository, PayoutError, PayoutGateway, PayoutId, PayoutRequest,
};
use crate::workflows::notify::{Notice, NotificationError, NotificationGateway};
use crate::workflows::store::RepositoryError;

#[derive(Default, Clone)]
pub struct InMemoryJobRepository {
    records: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, job: Job) -> Result<JobRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("job repository mutex poisoned");
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        let record = JobRecord { job, version: 1 };
        guard.insert(record.job.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &JobId) -> Result<Option<JobRecord>, RepositoryError> {
        let guard = self.records.lock().expect("job repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: JobRecord) -> Result<JobRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("job repository mutex poisoned");
        let stored = guard
            .get_mut(&record.job.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::VersionConflict);
        }
        stored.job = record.job;
        stored.version += 1;
        Ok(stored.clone())
    }

    fn active(&self) -> Result<Vec<JobRecord>, RepositoryError> {
        let guard = self.records.lock().expect("job repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| !record.job.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDisputeRepository {
    records: Arc<Mutex<HashMap<DisputeId, DisputeRecord>>>,
}

impl DisputeRepository for InMemoryDisputeRepository {
    fn insert(&self, dispute: Dispute) -> Result<DisputeRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("dispute repository mutex poisoned");
        if guard.contains_key(&dispute.id) {
            return Err(RepositoryError::Conflict);
        }
        let record = DisputeRecord {
            dispute,
            version: 1,
        };
        guard.insert(record.dispute.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &DisputeId) -> Result<Option<DisputeRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .expect("dispute repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: DisputeRecord) -> Result<DisputeRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .expect("dispute repository mutex poisoned");
        let stored = guard
            .get_mut(&record.dispute.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != record.version {
            return Err(RepositoryError::VersionConflict);
        }
        stored.dispute = record.dispute;
        stored.version += 1;
        Ok(stored.clone())
    }
}

/// Records every delivered notice so tests and the demo can inspect traffic.
#[derive(Default, Clone)]
pub struct InMemoryNotificationGateway {
    events: Arc<Mutex<Vec<Notice>>>,
}

impl InMemoryNotificationGateway {
    pub fn events(&self) -> Vec<Notice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }
}

impl NotificationGateway for InMemoryNotificationGateway {
    fn notify(&self, notice: Notice) -> Result<(), NotificationError> {
        self.events.lock().expect("notice mutex poisoned").push(notice);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPayoutGateway {
    sequence: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<PayoutRequest>>>,
}

impl InMemoryPayoutGateway {
    pub fn requests(&self) -> Vec<PayoutRequest> {
        self.requests.lock().expect("payout mutex poisoned").clone()
    }
}

impl PayoutGateway for InMemoryPayoutGateway {
    fn create_payout(&self, request: PayoutRequest) -> Result<PayoutId, PayoutError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.requests
            .lock()
            .expect("payout mutex poisoned")
            .push(request);
        Ok(PayoutId(format!("payout-{id:06}")))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryRefundGateway {
    sequence: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<RefundRequest>>>,
}

impl InMemoryRefundGateway {
    pub fn requests(&self) -> Vec<RefundRequest> {
        self.requests.lock().expect("refund mutex poisoned").clone()
    }
}

impl RefundGateway for InMemoryRefundGateway {
    fn issue_refund(&self, request: RefundRequest) -> Result<RefundId, RefundError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        self.requests
            .lock()
            .expect("refund mutex poisoned")
            .push(request);
        Ok(RefundId(format!("refund-{id:06}")))
    }
}

/// Billing lookup seeded explicitly; jobs without a seeded amount report the
/// collaborator as unavailable, which routes resolutions through the
/// reconciliation flag instead of blocking them.
#[derive(Default, Clone)]
pub struct InMemoryBillingGateway {
    amounts: Arc<Mutex<HashMap<JobId, u32>>>,
}

impl InMemoryBillingGateway {
    pub fn set_amount_paid(&self, job_id: JobId, amount_cents: u32) {
        self.amounts
            .lock()
            .expect("billing mutex poisoned")
            .insert(job_id, amount_cents);
    }
}

impl BillingGateway for InMemoryBillingGateway {
    fn amount_paid(&self, job_id: &JobId) -> Result<u32, BillingError> {
        self.amounts
            .lock()
            .expect("billing mutex poisoned")
            .get(job_id)
            .copied()
            .ok_or_else(|| BillingError::Unavailable(format!("no billing record for job {job_id}")))
    }
}
