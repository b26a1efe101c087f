use super::domain::{Task, TaskId};

/// Storage abstraction for tasks and their history.
pub trait TaskRepository: Send + Sync {
    fn insert(&self, task: Task) -> Result<Task, RepositoryError>;
    /// Swap `current` for `next`; `Stale` when the stored task no longer equals `current`.
    fn replace(&self, current: &Task, next: Task) -> Result<Task, RepositoryError>;
    fn fetch(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;
    fn list(&self) -> Result<Vec<Task>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("task already exists")]
    Conflict,
    #[error("task not found")]
    NotFound,
    #[error("task changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
