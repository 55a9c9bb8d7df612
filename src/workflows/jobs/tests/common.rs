use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::FixedClock;
use crate::infra::{
    InMemoryJobRepository, InMemoryNotificationGateway, InMemoryPayoutGateway,
};
use crate::workflows::jobs::bulk::BulkOperationCoordinator;
use crate::workflows::jobs::domain::{Actor, JobId, JobStatus, NewJob};
use crate::workflows::jobs::repository::{PayoutError, PayoutGateway, PayoutId, PayoutRequest};
use crate::workflows::jobs::service::{JobLifecycleService, TransitionCommand};
use crate::workflows::notify::{Notice, NotificationError, NotificationGateway};

pub(super) const APPRAISER: &str = "apr-001";

pub(super) type Service = JobLifecycleService<InMemoryJobRepository, InMemoryNotificationGateway>;

pub(super) struct Harness {
    pub service: Arc<Service>,
    pub repository: Arc<InMemoryJobRepository>,
    pub notifications: Arc<InMemoryNotificationGateway>,
    pub payouts: Arc<InMemoryPayoutGateway>,
    pub bulk: BulkOperationCoordinator<
        InMemoryJobRepository,
        InMemoryNotificationGateway,
        InMemoryPayoutGateway,
    >,
    pub clock: Arc<FixedClock>,
}

pub(super) fn start_of_day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).single().expect("valid instant")
}

pub(super) fn harness() -> Harness {
    let clock = Arc::new(FixedClock::at(start_of_day()));
    let repository = Arc::new(InMemoryJobRepository::default());
    let notifications = Arc::new(InMemoryNotificationGateway::default());
    let payouts = Arc::new(InMemoryPayoutGateway::default());
    let service = Arc::new(JobLifecycleService::new(
        repository.clone(),
        notifications.clone(),
        clock.clone(),
    ));
    let bulk = BulkOperationCoordinator::new(service.clone(), payouts.clone());

    Harness {
        service,
        repository,
        notifications,
        payouts,
        bulk,
        clock,
    }
}

pub(super) fn admin() -> Actor {
    Actor::admin("adm-1")
}

pub(super) fn appraiser() -> Actor {
    Actor::appraiser(APPRAISER)
}

pub(super) fn order(service: &Service, scope: &str) -> JobId {
    service
        .create(NewJob {
            organization_id: "org-42".to_string(),
            property_id: "prop-9".to_string(),
            scope: scope.to_string(),
        })
        .expect("order placed")
        .job
        .id
}

/// Walk a job along the happy path until it reaches `target`.
pub(super) fn drive_to(service: &Service, id: &JobId, target: JobStatus) {
    use JobStatus::*;

    if target == Cancelled {
        service
            .transition(id, &TransitionCommand::cancel(admin(), "test cancel"))
            .expect("cancel applies");
        return;
    }

    let path = [Dispatched, Accepted, InProgress, Submitted, UnderReview];
    for step in path {
        if service.get(id).expect("job present").job.status == target {
            return;
        }
        let command = match step {
            Dispatched => TransitionCommand::dispatch(admin(), APPRAISER),
            Accepted | InProgress | Submitted => TransitionCommand::new(step, appraiser()),
            _ => TransitionCommand::new(step, admin()),
        };
        service.transition(id, &command).expect("path step applies");
    }

    if matches!(target, Completed | Failed) {
        service
            .transition(id, &TransitionCommand::new(target, admin()))
            .expect("terminal step applies");
    }
}

/// Gateway that refuses every delivery, for degradation tests.
#[derive(Default, Clone)]
pub(super) struct FailingNotifications;

impl NotificationGateway for FailingNotifications {
    fn notify(&self, _notice: Notice) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp offline".to_string()))
    }
}

/// Payout collaborator that refuses every request.
#[derive(Default, Clone)]
pub(super) struct FailingPayouts;

impl PayoutGateway for FailingPayouts {
    fn create_payout(&self, _request: PayoutRequest) -> Result<PayoutId, PayoutError> {
        Err(PayoutError::Transport("ledger offline".to_string()))
    }
}
