use appraisal_ops::clock::{Clock, FixedClock, SystemClock};
use appraisal_ops::config::AppConfig;
use appraisal_ops::error::AppError;
use appraisal_ops::infra::{
    InMemoryBillingGateway, InMemoryDisputeRepository, InMemoryJobRepository,
    InMemoryNotificationGateway, InMemoryPayoutGateway, InMemoryRefundGateway,
};
use appraisal_ops::telemetry;
use appraisal_ops::workflows::disputes::{dispute_router, DisputeWorkflowService};
use appraisal_ops::workflows::jobs::{
    job_router, Actor, BulkOperationCoordinator, JobApi, JobLifecycleService, JobStatus, NewJob,
    TransitionCommand,
};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Appraisal Operations Engine",
    about = "Run the appraisal job lifecycle and dispute workflow service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// SLA tooling for operator demos
    Sla {
        #[command(subcommand)]
        command: SlaCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum SlaCommand {
    /// Seed a scripted day of jobs and render the breach report
    Report(SlaReportArgs),
}

#[derive(Args, Debug)]
struct SlaReportArgs {
    /// Evaluation instant (RFC 3339, defaults to now)
    #[arg(long, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,
    /// Include a per-job listing in the output
    #[arg(long)]
    list_jobs: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Sla {
            command: SlaCommand::Report(args),
        } => run_sla_report(args),
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as RFC 3339 ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let notifications = Arc::new(InMemoryNotificationGateway::default());

    let job_repository = Arc::new(InMemoryJobRepository::default());
    let job_service = Arc::new(JobLifecycleService::new(
        job_repository,
        notifications.clone(),
        clock.clone(),
    ));
    let bulk = Arc::new(BulkOperationCoordinator::new(
        job_service.clone(),
        Arc::new(InMemoryPayoutGateway::default()),
    ));

    let dispute_service = Arc::new(DisputeWorkflowService::new(
        Arc::new(InMemoryDisputeRepository::default()),
        Arc::new(InMemoryRefundGateway::default()),
        Arc::new(InMemoryBillingGateway::default()),
        notifications,
        clock,
    ));

    let sweep_service = job_service.clone();
    let sweep_interval = config.sla.interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            match sweep_service.breach_report() {
                Ok(report) => info!(
                    evaluated = report.evaluated,
                    breached = report.breached,
                    "sla sweep complete"
                ),
                Err(err) => tracing::warn!(error = %err, "sla sweep failed"),
            }
        }
    });

    let api = JobApi {
        service: job_service,
        bulk,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(job_router(api))
        .merge(dispute_router(dispute_service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "appraisal operations engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Seed a scripted day of orders against a pinned clock and render what the
/// sweep would report.
fn run_sla_report(args: SlaReportArgs) -> Result<(), AppError> {
    let evaluation = args.now.unwrap_or_else(Utc::now);
    let day_start = evaluation - Duration::hours(30);

    let clock = Arc::new(FixedClock::at(day_start));
    let repository = Arc::new(InMemoryJobRepository::default());
    let notifications = Arc::new(InMemoryNotificationGateway::default());
    let service = JobLifecycleService::new(repository.clone(), notifications, clock.clone());

    let admin = Actor::admin("ops-demo");

    // Rush order that blows through its 24h window mid-inspection.
    let overdue = service.create(NewJob {
        organization_id: "org-1042".to_string(),
        property_id: "prop-2214".to_string(),
        scope: "rush".to_string(),
    })?;
    service.transition(
        &overdue.job.id,
        &TransitionCommand::dispatch(admin.clone(), "apr-77"),
    )?;
    clock.advance(Duration::hours(2));
    service.transition(
        &overdue.job.id,
        &TransitionCommand::new(JobStatus::Accepted, Actor::appraiser("apr-77")),
    )?;
    service.transition(
        &overdue.job.id,
        &TransitionCommand::new(JobStatus::InProgress, Actor::appraiser("apr-77")),
    )?;

    // Standard order comfortably inside its 72h window.
    clock.set(day_start);
    let on_track = service.create(NewJob {
        organization_id: "org-1042".to_string(),
        property_id: "prop-2215".to_string(),
        scope: "standard".to_string(),
    })?;
    service.transition(
        &on_track.job.id,
        &TransitionCommand::dispatch(admin.clone(), "apr-81"),
    )?;

    // Rush order submitted before the deadline: out of the breach window.
    let submitted = service.create(NewJob {
        organization_id: "org-1077".to_string(),
        property_id: "prop-0931".to_string(),
        scope: "rush".to_string(),
    })?;
    service.transition(
        &submitted.job.id,
        &TransitionCommand::dispatch(admin.clone(), "apr-90"),
    )?;
    service.transition(
        &submitted.job.id,
        &TransitionCommand::new(JobStatus::Accepted, Actor::appraiser("apr-90")),
    )?;
    clock.advance(Duration::hours(20));
    service.transition(
        &submitted.job.id,
        &TransitionCommand::new(JobStatus::InProgress, Actor::appraiser("apr-90")),
    )?;
    service.transition(
        &submitted.job.id,
        &TransitionCommand::new(JobStatus::Submitted, Actor::appraiser("apr-90")),
    )?;

    // Extended order still awaiting dispatch: no SLA clock yet.
    let pending = service.create(NewJob {
        organization_id: "org-1077".to_string(),
        property_id: "prop-0932".to_string(),
        scope: "extended".to_string(),
    })?;

    clock.set(evaluation);
    let report = service.breach_report()?;

    println!("SLA breach report");
    println!("Evaluated at: {evaluation}");
    println!(
        "Active jobs evaluated: {}, breached: {}",
        report.evaluated, report.breached
    );

    if report.breached_jobs.is_empty() {
        println!("\nBreaches: none");
    } else {
        println!("\nBreaches (oldest deadline first)");
        for breach in &report.breached_jobs {
            println!(
                "- {} | {} | due {} | {} minutes overdue",
                breach.job_id,
                breach.status.label(),
                breach.due_at,
                breach.overdue_minutes
            );
        }
    }

    if args.list_jobs {
        println!("\nSeeded jobs");
        for id in [
            &overdue.job.id,
            &on_track.job.id,
            &submitted.job.id,
            &pending.job.id,
        ] {
            let record = service.get(id)?;
            let due = record
                .job
                .sla_due_at
                .map(|due| due.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "- {} | {} | {} | due {}",
                record.job.id,
                record.job.scope.name,
                record.job.status.label(),
                due
            );
        }
    }

    Ok(())
}
