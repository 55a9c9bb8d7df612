//! End-to-end specifications for the job lifecycle, SLA enforcement, and
//! bulk operations, driven through the public service facade and the HTTP
//! router so behavior is validated without reaching into private modules.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use appraisal_ops::clock::FixedClock;
    use appraisal_ops::infra::{
        InMemoryJobRepository, InMemoryNotificationGateway, InMemoryPayoutGateway,
    };
    use appraisal_ops::workflows::jobs::{
        job_router, Actor, BulkOperationCoordinator, JobApi, JobId, JobLifecycleService,
        JobStatus, NewJob, TransitionCommand,
    };

    pub(super) type Service =
        JobLifecycleService<InMemoryJobRepository, InMemoryNotificationGateway>;
    pub(super) type Bulk = BulkOperationCoordinator<
        InMemoryJobRepository,
        InMemoryNotificationGateway,
        InMemoryPayoutGateway,
    >;

    pub(super) struct Harness {
        pub service: Arc<Service>,
        pub bulk: Arc<Bulk>,
        pub payouts: Arc<InMemoryPayoutGateway>,
        pub clock: Arc<FixedClock>,
    }

    pub(super) fn dispatch_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).single().expect("valid instant")
    }

    pub(super) fn harness() -> Harness {
        let clock = Arc::new(FixedClock::at(dispatch_time()));
        let payouts = Arc::new(InMemoryPayoutGateway::default());
        let service = Arc::new(JobLifecycleService::new(
            Arc::new(InMemoryJobRepository::default()),
            Arc::new(InMemoryNotificationGateway::default()),
            clock.clone(),
        ));
        let bulk = Arc::new(BulkOperationCoordinator::new(
            service.clone(),
            payouts.clone(),
        ));

        Harness {
            service,
            bulk,
            payouts,
            clock,
        }
    }

    pub(super) fn router(harness: &Harness) -> axum::Router {
        job_router(JobApi {
            service: harness.service.clone(),
            bulk: harness.bulk.clone(),
        })
    }

    pub(super) fn admin() -> Actor {
        Actor::admin("adm-1")
    }

    pub(super) fn place_order(service: &Service, scope: &str) -> JobId {
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

    pub(super) fn dispatch(service: &Service, id: &JobId, appraiser: &str) {
        service
            .transition(id, &TransitionCommand::dispatch(admin(), appraiser))
            .expect("dispatch applies");
    }

    pub(super) fn step(service: &Service, id: &JobId, to: JobStatus, actor: Actor) {
        service
            .transition(id, &TransitionCommand::new(to, actor))
            .expect("step applies");
    }
}

mod lifecycle {
    use super::common::*;
    use appraisal_ops::clock::Clock;
    use appraisal_ops::workflows::jobs::{
        sla, Actor, JobStatus, JobWorkflowError, ScopePreset, TransitionCommand,
    };
    use chrono::Duration;

    #[test]
    fn sla_breach_follows_the_clock_and_clears_on_completion() {
        let harness = harness();
        let id = place_order(&harness.service, "rush");
        dispatch(&harness.service, &id, "apr-77");

        let record = harness.service.get(&id).expect("job present");
        assert_eq!(
            record.job.sla_due_at,
            Some(dispatch_time() + ScopePreset::RUSH.sla())
        );
        assert!(!sla::is_breached(&record.job, harness.clock.now()));

        // Past the deadline while still dispatched: breached.
        harness.clock.advance(Duration::hours(25));
        let record = harness.service.get(&id).expect("job present");
        assert!(sla::is_breached(&record.job, harness.clock.now()));

        // Acceptance does not stop the clock.
        step(
            &harness.service,
            &id,
            JobStatus::Accepted,
            Actor::appraiser("apr-77"),
        );
        let record = harness.service.get(&id).expect("job present");
        assert!(sla::is_breached(&record.job, harness.clock.now()));

        // Completion clears the due date and the breach with it.
        step(
            &harness.service,
            &id,
            JobStatus::InProgress,
            Actor::appraiser("apr-77"),
        );
        step(
            &harness.service,
            &id,
            JobStatus::Submitted,
            Actor::appraiser("apr-77"),
        );
        step(&harness.service, &id, JobStatus::Completed, admin());

        let record = harness.service.get(&id).expect("job present");
        assert!(record.job.sla_due_at.is_none());
        assert!(!sla::is_breached(&record.job, harness.clock.now()));
    }

    #[test]
    fn completed_jobs_stay_completed() {
        let harness = harness();
        let id = place_order(&harness.service, "standard");
        dispatch(&harness.service, &id, "apr-81");
        step(
            &harness.service,
            &id,
            JobStatus::Accepted,
            Actor::appraiser("apr-81"),
        );
        step(
            &harness.service,
            &id,
            JobStatus::InProgress,
            Actor::appraiser("apr-81"),
        );
        step(
            &harness.service,
            &id,
            JobStatus::Submitted,
            Actor::appraiser("apr-81"),
        );
        step(&harness.service, &id, JobStatus::Completed, admin());

        let err = harness
            .service
            .transition(&id, &TransitionCommand::cancel(admin(), "changed my mind"))
            .expect_err("terminal cancel rejected");
        assert!(matches!(err, JobWorkflowError::Transition(_)));

        let record = harness.service.get(&id).expect("job present");
        assert_eq!(record.job.status, JobStatus::Completed);
    }
}

mod bulk {
    use super::common::*;
    use appraisal_ops::workflows::jobs::{BulkFailureKind, JobStatus};

    #[test]
    fn bulk_cancel_reports_two_cancelled_one_skipped() {
        let harness = harness();
        let j1 = place_order(&harness.service, "rush");
        let j2 = place_order(&harness.service, "rush");
        let j3 = place_order(&harness.service, "rush");
        dispatch(&harness.service, &j1, "apr-77");
        dispatch(&harness.service, &j2, "apr-78");
        dispatch(&harness.service, &j3, "apr-79");
        step(
            &harness.service,
            &j3,
            JobStatus::Accepted,
            appraisal_ops::workflows::jobs::Actor::appraiser("apr-79"),
        );
        step(
            &harness.service,
            &j3,
            JobStatus::InProgress,
            appraisal_ops::workflows::jobs::Actor::appraiser("apr-79"),
        );
        step(
            &harness.service,
            &j3,
            JobStatus::Submitted,
            appraisal_ops::workflows::jobs::Actor::appraiser("apr-79"),
        );
        step(&harness.service, &j3, JobStatus::Completed, admin());

        let outcome = harness
            .bulk
            .bulk_cancel(
                &[j1.clone(), j2.clone(), j3.clone()],
                "client request",
                &admin(),
            )
            .expect("batch runs");

        assert_eq!(outcome.cancelled, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].job_id, j3);
        assert_eq!(outcome.failures[0].kind, BulkFailureKind::IllegalTransition);
    }

    #[test]
    fn bulk_approve_pays_out_each_approved_job_once() {
        let harness = harness();
        let id = place_order(&harness.service, "rush");
        dispatch(&harness.service, &id, "apr-77");
        let appraiser = appraisal_ops::workflows::jobs::Actor::appraiser("apr-77");
        step(&harness.service, &id, JobStatus::Accepted, appraiser.clone());
        step(
            &harness.service,
            &id,
            JobStatus::InProgress,
            appraiser.clone(),
        );
        step(&harness.service, &id, JobStatus::Submitted, appraiser);

        let outcome = harness
            .bulk
            .bulk_approve(&[id.clone()], Some("looks complete"), &admin());

        assert_eq!(outcome.approved, 1);
        assert!(outcome.failures.is_empty());

        let payouts = harness.payouts.requests();
        assert_eq!(payouts.len(), 1);
        assert_eq!(payouts[0].job_id, id);
        assert_eq!(payouts[0].appraiser_id, "apr-77");
    }
}

mod routing {
    use super::common::*;
    use appraisal_ops::workflows::jobs::JobStatus;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        serde_json::from_slice(&body).expect("json")
    }

    #[tokio::test]
    async fn post_jobs_creates_a_pending_order() {
        let harness = harness();
        let router = router(&harness);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "organization_id": "org-42",
                    "property_id": "prop-9",
                    "scope": "rush",
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CREATED);

        let payload = body_json(response).await;
        assert_eq!(
            payload["job"]["status"].as_str(),
            Some("pending_dispatch")
        );
        assert_eq!(payload["version"].as_u64(), Some(1));
    }

    #[tokio::test]
    async fn transition_endpoint_dispatches_and_reports_the_due_date() {
        let harness = harness();
        let id = place_order(&harness.service, "rush");
        let router = router(&harness);

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/jobs/{}/transition", id.0))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "to": "dispatched",
                    "actor": { "id": "adm-1", "role": "admin" },
                    "appraiser_id": "apr-77",
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["status"].as_str(), Some("dispatched"));
        assert!(payload["sla_due_at"].is_string());
        assert_eq!(payload["version"].as_u64(), Some(2));
    }

    #[tokio::test]
    async fn illegal_transitions_map_to_conflict() {
        let harness = harness();
        let id = place_order(&harness.service, "rush");
        let router = router(&harness);

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/jobs/{}/transition", id.0))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "to": "completed",
                    "actor": { "id": "adm-1", "role": "admin" },
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let payload = body_json(response).await;
        assert!(payload["error"]
            .as_str()
            .unwrap_or_default()
            .contains("illegal transition"));
    }

    #[tokio::test]
    async fn bulk_cancel_endpoint_returns_the_outcome() {
        let harness = harness();
        let j1 = place_order(&harness.service, "rush");
        dispatch(&harness.service, &j1, "apr-77");
        let router = router(&harness);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs/bulk/cancel")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "job_ids": [j1.0, "job-ghost"],
                    "reason": "client request",
                    "actor": { "id": "adm-1", "role": "admin" },
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["processed"].as_u64(), Some(2));
        assert_eq!(payload["cancelled"].as_u64(), Some(1));
        assert_eq!(payload["failures"][0]["kind"].as_str(), Some("not_found"));
    }

    #[tokio::test]
    async fn bulk_cancel_endpoint_rejects_blank_reasons() {
        let harness = harness();
        let router = router(&harness);

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs/bulk/cancel")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "job_ids": ["job-000001"],
                    "reason": "  ",
                    "actor": { "id": "adm-1", "role": "admin" },
                })
                .to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn breach_endpoint_surfaces_the_aggregate() {
        let harness = harness();
        let id = place_order(&harness.service, "rush");
        dispatch(&harness.service, &id, "apr-77");
        harness.clock.advance(chrono::Duration::hours(25));
        let router = router(&harness);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/jobs/sla/breaches")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["evaluated"].as_u64(), Some(1));
        assert_eq!(payload["breached"].as_u64(), Some(1));
        assert_eq!(
            payload["breached_jobs"][0]["job_id"].as_str(),
            Some(id.0.as_str())
        );
    }

    #[tokio::test]
    async fn missing_jobs_return_not_found() {
        let harness = harness();
        let router = router(&harness);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/jobs/job-ghost")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_job_returns_history() {
        let harness = harness();
        let id = place_order(&harness.service, "standard");
        dispatch(&harness.service, &id, "apr-81");
        step(
            &harness.service,
            &id,
            JobStatus::Accepted,
            appraisal_ops::workflows::jobs::Actor::appraiser("apr-81"),
        );
        let router = router(&harness);

        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/v1/jobs/{}", id.0))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);

        let payload = body_json(response).await;
        assert_eq!(payload["job"]["status"].as_str(), Some("accepted"));
        let history = payload["job"]["status_history"]
            .as_array()
            .expect("history serialized");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["to"].as_str(), Some("dispatched"));
        assert_eq!(history[1]["to"].as_str(), Some("accepted"));
    }
}
