use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{NewTask, Task, TaskAction, TaskId};
use super::repository::{RepositoryError, TaskRepository};
use super::transitions::{available_actions, TaskTransitionError};
use crate::workflows::staff::{Actor, StaffId, StaffRole};

const MAX_SUBJECT_CHARS: usize = 255;

static TASK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// A task as one participant sees it, with the buttons they may press.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,
    pub status_label: &'static str,
    pub available_actions: Vec<TaskAction>,
}

impl TaskView {
    pub fn for_actor(task: Task, actor: Actor) -> Self {
        let available_actions = available_actions(&task, actor);
        Self {
            status_label: task.status.label(),
            task,
            available_actions,
        }
    }
}

pub struct TaskService<R> {
    repository: Arc<R>,
}

impl<R> TaskService<R>
where
    R: TaskRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Hand out a task; only admins and supervisors create tasks.
    pub fn create(&self, creator: Actor, draft: NewTask) -> Result<Task, TaskServiceError> {
        if !creator.role.is_manager() {
            return Err(TaskServiceError::Forbidden(creator.role));
        }
        let subject = draft.subject.trim();
        if subject.is_empty() {
            return Err(TaskServiceError::MissingSubject);
        }
        if subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(TaskServiceError::SubjectTooLong {
                max: MAX_SUBJECT_CHARS,
            });
        }

        let id = TaskId(TASK_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        let task = Task::assign(id, creator, draft, now());
        let stored = self.repository.insert(task)?;

        info!(
            task_id = %stored.id,
            creator = %stored.creator,
            assignee = %stored.assignee,
            tag = stored.tag.label(),
            "task assigned"
        );
        Ok(stored)
    }

    pub fn transition(
        &self,
        id: TaskId,
        actor: Actor,
        action: TaskAction,
        note: Option<&str>,
    ) -> Result<Task, TaskServiceError> {
        let current = self.get(id)?;
        let mut task = current.clone();
        task.apply(actor, action, note, now())?;
        let task = self
            .repository
            .replace(&current, task)
            .map_err(|err| match err {
                RepositoryError::Stale => {
                    warn!(task_id = %id, action = action.label(), "task changed concurrently");
                    TaskServiceError::Modified(id)
                }
                other => other.into(),
            })?;

        info!(
            task_id = %task.id,
            actor = %actor.user_id,
            from = current.status.label(),
            to = task.status.label(),
            "task status changed"
        );
        Ok(task)
    }

    pub fn get(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        let task = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(task)
    }

    /// Tasks the user created or was assigned, newest first.
    pub fn list_for(&self, user_id: StaffId) -> Result<Vec<Task>, TaskServiceError> {
        let mut tasks: Vec<Task> = self
            .repository
            .list()?
            .into_iter()
            .filter(|task| task.involves(user_id))
            .collect();
        tasks.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(tasks)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Transition(#[from] TaskTransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("role '{}' may not assign tasks", .0.label())]
    Forbidden(StaffRole),
    #[error("task subject is required")]
    MissingSubject,
    #[error("task subject is limited to {max} characters")]
    SubjectTooLong { max: usize },
    #[error("task {0} changed while the action was applied; reload and retry")]
    Modified(TaskId),
}
