use crate::cli::ServeArgs;
use crate::infra::{
    default_catalog, AppState, InMemoryEvaluationRepository, InMemoryStaffRepository,
    InMemoryTaskRepository,
};
use crate::routes::with_qa_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use call_qa::config::AppConfig;
use call_qa::error::AppError;
use call_qa::telemetry;
use call_qa::workflows::evaluation::EvaluationService;
use call_qa::workflows::staff::StaffService;
use call_qa::workflows::tasks::TaskService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let evaluation_service = Arc::new(EvaluationService::new(
        Arc::new(InMemoryEvaluationRepository::default()),
        default_catalog(),
        config.evaluation,
    )?);
    let task_service = Arc::new(TaskService::new(Arc::new(InMemoryTaskRepository::default())));

    let staff_service = Arc::new(StaffService::new(Arc::new(InMemoryStaffRepository::default())));

    let app = with_qa_routes(evaluation_service, task_service, staff_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        monthly_limit = config.evaluation.monthly_limit,
        "call quality service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
