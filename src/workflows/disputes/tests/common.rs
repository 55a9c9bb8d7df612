use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::FixedClock;
use crate::infra::{
    InMemoryBillingGateway, InMemoryDisputeRepository, InMemoryNotificationGateway,
    InMemoryRefundGateway,
};
use crate::workflows::disputes::domain::{DisputeId, NewDispute};
use crate::workflows::disputes::repository::{
    RefundError, RefundGateway, RefundId, RefundRequest,
};
use crate::workflows::disputes::service::DisputeWorkflowService;
use crate::workflows::jobs::domain::Actor;

pub(super) type Service = DisputeWorkflowService<
    InMemoryDisputeRepository,
    InMemoryRefundGateway,
    InMemoryBillingGateway,
    InMemoryNotificationGateway,
>;

pub(super) struct Harness {
    pub service: Service,
    pub refunds: Arc<InMemoryRefundGateway>,
    pub billing: Arc<InMemoryBillingGateway>,
    pub notifications: Arc<InMemoryNotificationGateway>,
    pub clock: Arc<FixedClock>,
}

pub(super) fn filing_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 10, 14, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn harness() -> Harness {
    let clock = Arc::new(FixedClock::at(filing_time()));
    let refunds = Arc::new(InMemoryRefundGateway::default());
    let billing = Arc::new(InMemoryBillingGateway::default());
    let notifications = Arc::new(InMemoryNotificationGateway::default());
    let service = DisputeWorkflowService::new(
        Arc::new(InMemoryDisputeRepository::default()),
        refunds.clone(),
        billing.clone(),
        notifications.clone(),
        clock.clone(),
    );

    Harness {
        service,
        refunds,
        billing,
        notifications,
        clock,
    }
}

pub(super) fn admin() -> Actor {
    Actor::admin("adm-7")
}

pub(super) fn file(service: &Service, related_job_id: Option<&str>) -> DisputeId {
    service
        .open(NewDispute {
            organization_id: "org-42".to_string(),
            related_job_id: related_job_id.map(str::to_string),
            priority: 2,
        })
        .expect("dispute filed")
        .dispute
        .id
}

/// Refund collaborator that refuses every request.
#[derive(Default, Clone)]
pub(super) struct FailingRefunds;

impl RefundGateway for FailingRefunds {
    fn issue_refund(&self, _request: RefundRequest) -> Result<RefundId, RefundError> {
        Err(RefundError::Transport("payment processor offline".to_string()))
    }
}
