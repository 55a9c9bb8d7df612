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

use super::domain::{DisputeId, NewDispute};
use super::repository::{BillingGateway, DisputeRepository, RefundGateway};
use super::service::{
    CommentCommand, DisputeWorkflowError, DisputeWorkflowService, ResolveCommand,
};
use crate::workflows::jobs::domain::Actor;
use crate::workflows::notify::NotificationGateway;

/// Router builder exposing dispute filing, review, resolution, escalation,
/// closure, and comment threading.
pub fn dispute_router<R, F, B, N>(service: Arc<DisputeWorkflowService<R, F, B, N>>) -> Router
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    Router::new()
        .route("/api/v1/disputes", post(open_handler::<R, F, B, N>))
        .route(
            "/api/v1/disputes/:dispute_id",
            get(status_handler::<R, F, B, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/review",
            post(review_handler::<R, F, B, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/resolve",
            post(resolve_handler::<R, F, B, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/escalate",
            post(escalate_handler::<R, F, B, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/close",
            post(close_handler::<R, F, B, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/comments",
            post(comment_handler::<R, F, B, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActorRequest {
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolveRequest {
    pub resolution: String,
    #[serde(default)]
    pub refund_amount_cents: Option<u32>,
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EscalateRequest {
    pub reason: String,
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    pub actor: Actor,
}

async fn open_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    axum::Json(filing): axum::Json<NewDispute>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    match service.open(filing) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn status_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    match service.get(&DisputeId(dispute_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn review_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    match service.begin_review(&DisputeId(dispute_id), &request.actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn resolve_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<ResolveRequest>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    let command = ResolveCommand {
        resolution: request.resolution,
        refund_amount_cents: request.refund_amount_cents,
        actor: request.actor,
    };

    match service.resolve(&DisputeId(dispute_id), &command) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn escalate_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<EscalateRequest>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    match service.escalate(&DisputeId(dispute_id), &request.reason, &request.actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn close_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    match service.close(&DisputeId(dispute_id), &request.actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn comment_handler<R, F, B, N>(
    State(service): State<Arc<DisputeWorkflowService<R, F, B, N>>>,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<CommentRequest>,
) -> Response
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    let command = CommentCommand {
        author: request.actor,
        content: request.content,
        is_internal: request.is_internal,
    };

    match service.add_comment(&DisputeId(dispute_id), &command) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: DisputeWorkflowError) -> Response {
    let status = match &err {
        DisputeWorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        DisputeWorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DisputeWorkflowError::Transition(_) | DisputeWorkflowError::Conflict(_) => {
            StatusCode::CONFLICT
        }
        DisputeWorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
