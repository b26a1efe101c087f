use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::workflows::staff::{Actor, StaffId, StaffRole};
use crate::workflows::tasks::{
    NewTask, RepositoryError, Task, TaskId, TaskRepository, TaskService, TaskTag,
};

pub(super) const OPERATOR: Actor = Actor::new(StaffId(501), StaffRole::Operator);
pub(super) const OTHER_OPERATOR: Actor = Actor::new(StaffId(502), StaffRole::Operator);
pub(super) const SUPERVISOR: Actor = Actor::new(StaffId(7), StaffRole::Supervisor);
pub(super) const ADMIN: Actor = Actor::new(StaffId(1), StaffRole::Admin);

pub(super) fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid timestamp")
}

pub(super) fn new_task() -> NewTask {
    NewTask {
        subject: "  Review March escalations  ".to_string(),
        description: "Listen to the three flagged calls".to_string(),
        tag: TaskTag::Problem,
        assignee: OPERATOR.user_id,
    }
}

/// Task handed by the supervisor to the operator.
pub(super) fn assigned_task() -> Task {
    Task::assign(TaskId(1), SUPERVISOR, new_task(), at(9))
}

pub(super) fn build_service() -> (TaskService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    (TaskService::new(repository.clone()), repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    tasks: Arc<Mutex<BTreeMap<TaskId, Task>>>,
}

impl TaskRepository for MemoryRepository {
    fn insert(&self, task: Task) -> Result<Task, RepositoryError> {
        let mut guard = self.tasks.lock().expect("repository mutex poisoned");
        if guard.contains_key(&task.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(task.id, task.clone());
        Ok(task)
    }

    fn replace(&self, current: &Task, next: Task) -> Result<Task, RepositoryError> {
        let mut guard = self.tasks.lock().expect("repository mutex poisoned");
        match guard.get(&current.id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored != current => Err(RepositoryError::Stale),
            Some(_) => {
                guard.insert(next.id, next.clone());
                Ok(next)
            }
        }
    }

    fn fetch(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let guard = self.tasks.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Task>, RepositoryError> {
        let guard = self.tasks.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Holds the first `callers` fetches at a barrier so each caller acts on the same snapshot.
pub(super) struct GatedRepository {
    pub(super) inner: MemoryRepository,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl GatedRepository {
    pub(super) fn new(inner: MemoryRepository, callers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(callers),
            gated: AtomicUsize::new(callers),
        }
    }
}

impl TaskRepository for GatedRepository {
    fn insert(&self, task: Task) -> Result<Task, RepositoryError> {
        self.inner.insert(task)
    }

    fn replace(&self, current: &Task, next: Task) -> Result<Task, RepositoryError> {
        self.inner.replace(current, next)
    }

    fn fetch(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let task = self.inner.fetch(id)?;
        if self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            self.barrier.wait();
        }
        Ok(task)
    }

    fn list(&self) -> Result<Vec<Task>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) struct UnavailableRepository;

impl TaskRepository for UnavailableRepository {
    fn insert(&self, _task: Task) -> Result<Task, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(&self, _current: &Task, _next: Task) -> Result<Task, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self) -> Result<Vec<Task>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
