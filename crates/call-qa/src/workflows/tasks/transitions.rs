use chrono::NaiveDateTime;

use super::domain::{Task, TaskAction, TaskHistoryEntry, TaskStatus};
use crate::workflows::staff::{Actor, StaffRole};

/// Actions `actor` may take on `task` right now, in display order.
pub fn available_actions(task: &Task, actor: Actor) -> Vec<TaskAction> {
    let is_assignee = task.assignee == actor.user_id;
    let can_review = !is_assignee
        && (actor.role == StaffRole::Admin
            || actor.role == StaffRole::Supervisor
            || task.creator == actor.user_id);

    let mut actions = Vec::new();
    if is_assignee && matches!(task.status, TaskStatus::Assigned | TaskStatus::Returned) {
        actions.push(TaskAction::InProgress);
    }
    if is_assignee && matches!(task.status, TaskStatus::InProgress | TaskStatus::Returned) {
        actions.push(TaskAction::Completed);
    }
    if can_review && task.status == TaskStatus::Completed {
        actions.push(TaskAction::Accepted);
        actions.push(TaskAction::Returned);
    }
    if can_review && task.status == TaskStatus::Accepted {
        actions.push(TaskAction::Reopened);
    }
    actions
}

impl Task {
    /// Apply `action` for `actor`. `note` is the return comment for `Returned` and the
    /// completion summary for `Completed`; other actions ignore it.
    pub fn apply(
        &mut self,
        actor: Actor,
        action: TaskAction,
        note: Option<&str>,
        at: NaiveDateTime,
    ) -> Result<(), TaskTransitionError> {
        if !available_actions(self, actor).contains(&action) {
            return Err(TaskTransitionError::NotAllowed {
                action,
                status: self.status,
                role: actor.role,
            });
        }

        let note = note
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let comment = match action {
            TaskAction::Completed => {
                if note.is_some() {
                    self.completion_summary = note;
                }
                None
            }
            TaskAction::Returned => note,
            _ => None,
        };

        self.status = action.resulting_status();
        self.updated_at = at;
        self.history.push(TaskHistoryEntry {
            event: action.into(),
            actor,
            comment,
            at,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskTransitionError {
    #[error("action '{}' is not available to role '{}' while the task is {}", .action.label(), .role.label(), .status.label())]
    NotAllowed {
        action: TaskAction,
        status: TaskStatus,
        role: StaffRole,
    },
}
