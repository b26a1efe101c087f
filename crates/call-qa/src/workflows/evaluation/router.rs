use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::catalog::{CriterionCatalog, DirectionId};
use super::record::{EvaluationId, EvaluationSubmission};
use super::repository::{EvaluationRepository, RepositoryError};
use super::service::{
    preview_rubric, AudioState, EvaluationService, EvaluationServiceError, RubricInput,
};
use super::verdict::ScoreSheet;
use crate::workflows::staff::{Actor, StaffId};

/// Router builder exposing scoring, evaluation lifecycle, and catalog endpoints.
pub fn evaluation_router<R>(service: Arc<EvaluationService<R>>) -> Router
where
    R: EvaluationRepository + 'static,
{
    Router::new()
        .route("/api/v1/evaluations/score", post(score_handler::<R>))
        .route("/api/v1/evaluations/preview", post(preview_handler::<R>))
        .route("/api/v1/evaluations", post(submit_handler::<R>))
        .route(
            "/api/v1/evaluations/:evaluation_id",
            get(status_handler::<R>)
                .put(update_draft_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/corrections",
            post(correction_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/history",
            get(history_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/dispute",
            post(dispute_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/reevaluation-request",
            post(reevaluation_request_handler::<R>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/reevaluation-approval",
            post(reevaluation_approval_handler::<R>),
        )
        .route(
            "/api/v1/operators/:operator_id/evaluations/summary",
            get(summary_handler::<R>),
        )
        .route(
            "/api/v1/directions",
            get(catalog_handler::<R>).put(save_catalog_handler::<R>),
        )
        .with_state(service)
}

/// Catalog-backed preview of an in-progress evaluation form.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub direction_id: DirectionId,
    #[serde(default)]
    pub sheet: ScoreSheet,
    #[serde(default)]
    pub audio: AudioState,
}

/// Evaluator acting on their own draft.
#[derive(Debug, Deserialize)]
pub struct RequesterParams {
    pub requester: StaffId,
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub month: String,
}

#[derive(Debug, Deserialize)]
pub struct ReevaluationRequestBody {
    pub actor: Actor,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct DisputeBody {
    pub actor: Actor,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReevaluationApprovalBody {
    pub actor: Actor,
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    axum::Json(input): axum::Json<RubricInput>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match preview_rubric(input, &service.policy().duration_tolerance) {
        Ok(preview) => (StatusCode::OK, axum::Json(preview)).into_response(),
        Err(error) => failure(error.into()),
    }
}

pub(crate) async fn preview_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    axum::Json(request): axum::Json<PreviewRequest>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.score_preview(request.direction_id, &request.sheet, &request.audio) {
        Ok(preview) => (StatusCode::OK, axum::Json(preview)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    axum::Json(submission): axum::Json<EvaluationSubmission>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.submit(submission) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.get(&EvaluationId(evaluation_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn update_draft_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    Query(params): Query<RequesterParams>,
    axum::Json(submission): axum::Json<EvaluationSubmission>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.update_draft(&EvaluationId(evaluation_id), params.requester, submission) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    Query(params): Query<RequesterParams>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.delete_draft(&EvaluationId(evaluation_id), params.requester) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn correction_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    axum::Json(submission): axum::Json<EvaluationSubmission>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.correct(&EvaluationId(evaluation_id), submission) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn history_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.history(&EvaluationId(evaluation_id)) {
        Ok(chain) => {
            let versions: Vec<_> = chain.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(versions)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn dispute_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    axum::Json(body): axum::Json<DisputeBody>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.dispute(&EvaluationId(evaluation_id), body.actor, &body.message) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn reevaluation_request_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    axum::Json(body): axum::Json<ReevaluationRequestBody>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.request_reevaluation(&EvaluationId(evaluation_id), body.actor, &body.comment) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn reevaluation_approval_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(evaluation_id): Path<String>,
    axum::Json(body): axum::Json<ReevaluationApprovalBody>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.approve_reevaluation(&EvaluationId(evaluation_id), body.actor) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn summary_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    Path(operator_id): Path<u64>,
    Query(params): Query<SummaryParams>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.monthly_summary(StaffId(operator_id), &params.month) {
        Ok(summary) => {
            let payload = json!({
                "operator_id": summary.operator_id,
                "month": summary.month,
                "evaluated": summary.evaluated,
                "limit": summary.limit,
                "remaining": summary.remaining(),
                "average_score": summary.average_score,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn catalog_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    (StatusCode::OK, axum::Json(service.catalog())).into_response()
}

pub(crate) async fn save_catalog_handler<R>(
    State(service): State<Arc<EvaluationService<R>>>,
    axum::Json(catalog): axum::Json<CriterionCatalog>,
) -> Response
where
    R: EvaluationRepository + 'static,
{
    match service.save_catalog(catalog) {
        Ok(()) => (StatusCode::OK, axum::Json(service.catalog())).into_response(),
        Err(error) => failure(error),
    }
}

fn failure(error: EvaluationServiceError) -> Response {
    let status = match &error {
        EvaluationServiceError::Catalog(_)
        | EvaluationServiceError::Scoring(_)
        | EvaluationServiceError::Record(_)
        | EvaluationServiceError::Validation(_)
        | EvaluationServiceError::EmptyDispute => StatusCode::UNPROCESSABLE_ENTITY,
        EvaluationServiceError::UnknownDirection(_)
        | EvaluationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        EvaluationServiceError::Repository(
            RepositoryError::Conflict | RepositoryError::Stale | RepositoryError::LimitReached { .. },
        )
        | EvaluationServiceError::NotDraft(_)
        | EvaluationServiceError::Modified(_)
        | EvaluationServiceError::AlreadyDisputed(_)
        | EvaluationServiceError::NotCurrent(_)
        | EvaluationServiceError::MonthlyLimitReached { .. }
        | EvaluationServiceError::RequestPending(_)
        | EvaluationServiceError::NoPendingRequest(_) => StatusCode::CONFLICT,
        EvaluationServiceError::NotOwner(_) | EvaluationServiceError::Forbidden(_) => {
            StatusCode::FORBIDDEN
        }
        EvaluationServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = match &error {
        EvaluationServiceError::Validation(report) => json!({
            "error": error.to_string(),
            "valid": false,
            "reasons": report.reasons,
        }),
        _ => json!({
            "error": error.to_string(),
        }),
    };
    (status, axum::Json(payload)).into_response()
}
