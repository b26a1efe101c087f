use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use call_qa::workflows::evaluation::{evaluation_router, EvaluationRepository, EvaluationService};
use call_qa::workflows::salary::salary_router;
use call_qa::workflows::staff::{staff_router, StaffRepository, StaffService};
use call_qa::workflows::tasks::{task_router, TaskRepository, TaskService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_qa_routes<E, T, S>(
    evaluations: Arc<EvaluationService<E>>,
    tasks: Arc<TaskService<T>>,
    staff: Arc<StaffService<S>>,
) -> axum::Router
where
    E: EvaluationRepository + 'static,
    T: TaskRepository + 'static,
    S: StaffRepository + 'static,
{
    evaluation_router(evaluations)
        .merge(task_router(tasks))
        .merge(staff_router(staff))
        .merge(salary_router())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
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

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
