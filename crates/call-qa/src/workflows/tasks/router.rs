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

use super::domain::{NewTask, TaskAction, TaskId};
use super::repository::{RepositoryError, TaskRepository};
use super::service::{TaskService, TaskServiceError, TaskView};
use crate::workflows::staff::{Actor, StaffId, StaffRole};

/// Router builder exposing task assignment and status endpoints.
pub fn task_router<R>(service: Arc<TaskService<R>>) -> Router
where
    R: TaskRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/tasks",
            post(create_handler::<R>).get(list_handler::<R>),
        )
        .route("/api/v1/tasks/:task_id", get(detail_handler::<R>))
        .route("/api/v1/tasks/:task_id/status", post(status_handler::<R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub creator: Actor,
    #[serde(flatten)]
    pub task: NewTask,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub actor: Actor,
    pub action: TaskAction,
    /// Return comment, or the completion summary when completing.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Viewer identity for read endpoints.
#[derive(Debug, Deserialize)]
pub struct ViewerParams {
    pub user_id: StaffId,
    pub role: StaffRole,
}

impl ViewerParams {
    fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<TaskService<R>>>,
    axum::Json(request): axum::Json<CreateTaskRequest>,
) -> Response
where
    R: TaskRepository + 'static,
{
    match service.create(request.creator, request.task) {
        Ok(task) => {
            let view = TaskView::for_actor(task, request.creator);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<TaskService<R>>>,
    Query(viewer): Query<ViewerParams>,
) -> Response
where
    R: TaskRepository + 'static,
{
    match service.list_for(viewer.user_id) {
        Ok(tasks) => {
            let views: Vec<TaskView> = tasks
                .into_iter()
                .map(|task| TaskView::for_actor(task, viewer.actor()))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn detail_handler<R>(
    State(service): State<Arc<TaskService<R>>>,
    Path(task_id): Path<u64>,
    Query(viewer): Query<ViewerParams>,
) -> Response
where
    R: TaskRepository + 'static,
{
    match service.get(TaskId(task_id)) {
        Ok(task) => {
            let view = TaskView::for_actor(task, viewer.actor());
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => failure(error),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<TaskService<R>>>,
    Path(task_id): Path<u64>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: TaskRepository + 'static,
{
    let outcome = service.transition(
        TaskId(task_id),
        request.actor,
        request.action,
        request.comment.as_deref(),
    );
    match outcome {
        Ok(task) => {
            let view = TaskView::for_actor(task, request.actor);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => failure(error),
    }
}

fn failure(error: TaskServiceError) -> Response {
    let status = match &error {
        TaskServiceError::MissingSubject | TaskServiceError::SubjectTooLong { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TaskServiceError::Forbidden(_) | TaskServiceError::Transition(_) => StatusCode::FORBIDDEN,
        TaskServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TaskServiceError::Repository(RepositoryError::Conflict | RepositoryError::Stale)
        | TaskServiceError::Modified(_) => StatusCode::CONFLICT,
        TaskServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
