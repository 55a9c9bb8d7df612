use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::bulk::BulkOperationCoordinator;
use super::domain::{Actor, JobId, JobStatus, NewJob};
use super::repository::{JobRepository, PayoutGateway};
use super::service::{JobLifecycleService, JobWorkflowError, TransitionCommand};
use crate::workflows::notify::NotificationGateway;

/// Shared state for the job endpoints.
pub struct JobApi<R, N, P> {
    pub service: Arc<JobLifecycleService<R, N>>,
    pub bulk: Arc<BulkOperationCoordinator<R, N, P>>,
}

impl<R, N, P> Clone for JobApi<R, N, P> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            bulk: self.bulk.clone(),
        }
    }
}

/// Router builder exposing job intake, transitions, bulk operations, and the
/// SLA breach report.
pub fn job_router<R, N, P>(api: JobApi<R, N, P>) -> Router
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    Router::new()
        .route("/api/v1/jobs", post(create_handler::<R, N, P>))
        .route("/api/v1/jobs/:job_id", get(status_handler::<R, N, P>))
        .route(
            "/api/v1/jobs/:job_id/transition",
            post(transition_handler::<R, N, P>),
        )
        .route(
            "/api/v1/jobs/bulk/cancel",
            post(bulk_cancel_handler::<R, N, P>),
        )
        .route(
            "/api/v1/jobs/bulk/approve",
            post(bulk_approve_handler::<R, N, P>),
        )
        .route(
            "/api/v1/jobs/sla/breaches",
            get(breaches_handler::<R, N, P>),
        )
        .with_state(api)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub to: JobStatus,
    pub actor: Actor,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub appraiser_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkCancelRequest {
    pub job_ids: Vec<String>,
    pub reason: String,
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkApproveRequest {
    pub job_ids: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub actor: Actor,
}

async fn create_handler<R, N, P>(
    State(api): State<JobApi<R, N, P>>,
    axum::Json(order): axum::Json<NewJob>,
) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    match api.service.create(order) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn status_handler<R, N, P>(
    State(api): State<JobApi<R, N, P>>,
    Path(job_id): Path<String>,
) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    match api.service.get(&JobId(job_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn transition_handler<R, N, P>(
    State(api): State<JobApi<R, N, P>>,
    Path(job_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    let command = TransitionCommand {
        to: request.to,
        actor: request.actor,
        reason: request.reason,
        appraiser_id: request.appraiser_id,
    };

    match api.service.transition(&JobId(job_id), &command) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn bulk_cancel_handler<R, N, P>(
    State(api): State<JobApi<R, N, P>>,
    axum::Json(request): axum::Json<BulkCancelRequest>,
) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    let job_ids: Vec<JobId> = request.job_ids.into_iter().map(JobId).collect();

    match api
        .bulk
        .bulk_cancel(&job_ids, &request.reason, &request.actor)
    {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn bulk_approve_handler<R, N, P>(
    State(api): State<JobApi<R, N, P>>,
    axum::Json(request): axum::Json<BulkApproveRequest>,
) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    let job_ids: Vec<JobId> = request.job_ids.into_iter().map(JobId).collect();
    let outcome = api
        .bulk
        .bulk_approve(&job_ids, request.notes.as_deref(), &request.actor);

    (StatusCode::OK, axum::Json(outcome)).into_response()
}

async fn breaches_handler<R, N, P>(State(api): State<JobApi<R, N, P>>) -> Response
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    match api.service.breach_report() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: JobWorkflowError) -> Response {
    let status = match &err {
        JobWorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        JobWorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        JobWorkflowError::Transition(_) | JobWorkflowError::Conflict(_) => StatusCode::CONFLICT,
        JobWorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
