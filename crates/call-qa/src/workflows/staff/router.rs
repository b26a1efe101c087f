use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::record::{NewStaff, StaffError, StatusChange};
use super::repository::{RepositoryError, StaffRepository};
use super::service::{StaffService, StaffServiceError};
use super::{Actor, StaffId};

/// Router builder exposing staff accounts and their employment status.
pub fn staff_router<R>(service: Arc<StaffService<R>>) -> Router
where
    R: StaffRepository + 'static,
{
    Router::new()
        .route("/api/v1/staff", post(create_handler::<R>))
        .route("/api/v1/staff/:staff_id", get(detail_handler::<R>))
        .route("/api/v1/staff/:staff_id/status", put(status_handler::<R>))
        .route(
            "/api/v1/supervisors/:supervisor_id/team",
            get(team_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub creator: Actor,
    #[serde(flatten)]
    pub staff: NewStaff,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub actor: Actor,
    #[serde(flatten)]
    pub change: StatusChange,
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<StaffService<R>>>,
    axum::Json(request): axum::Json<CreateStaffRequest>,
) -> Response
where
    R: StaffRepository + 'static,
{
    match service.create(request.creator, request.staff) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn detail_handler<R>(
    State(service): State<Arc<StaffService<R>>>,
    Path(staff_id): Path<u64>,
) -> Response
where
    R: StaffRepository + 'static,
{
    match service.get(StaffId(staff_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<StaffService<R>>>,
    Path(staff_id): Path<u64>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    R: StaffRepository + 'static,
{
    match service.change_status(request.actor, StaffId(staff_id), request.change) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn team_handler<R>(
    State(service): State<Arc<StaffService<R>>>,
    Path(supervisor_id): Path<u64>,
) -> Response
where
    R: StaffRepository + 'static,
{
    match service.team(StaffId(supervisor_id)) {
        Ok(team) => (StatusCode::OK, axum::Json(team)).into_response(),
        Err(error) => failure(error),
    }
}

fn failure(error: StaffServiceError) -> Response {
    let status = match &error {
        StaffServiceError::Staff(StaffError::Forbidden(_)) => StatusCode::FORBIDDEN,
        StaffServiceError::Staff(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StaffServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        StaffServiceError::Repository(RepositoryError::Conflict | RepositoryError::Stale)
        | StaffServiceError::Modified(_) => StatusCode::CONFLICT,
        StaffServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
