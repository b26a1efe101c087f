//! Task assignment between managers and operators, with a role-gated status machine.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
mod transitions;

#[cfg(test)]
mod tests;

pub use domain::{
    NewTask, Task, TaskAction, TaskEvent, TaskHistoryEntry, TaskId, TaskStatus, TaskTag,
};
pub use repository::{RepositoryError, TaskRepository};
pub use router::task_router;
pub use service::{TaskService, TaskServiceError, TaskView};
pub use transitions::{available_actions, TaskTransitionError};
