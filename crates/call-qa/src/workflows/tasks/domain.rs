use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::workflows::staff::{Actor, StaffId};

/// Identifier wrapper for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Assigned,
    InProgress,
    Completed,
    Accepted,
    Returned,
}

impl TaskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Accepted => "Accepted",
            Self::Returned => "Returned",
        }
    }
}

/// Buttons a participant may press; `Reopened` lands the task back in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    InProgress,
    Completed,
    Accepted,
    Returned,
    Reopened,
}

impl TaskAction {
    pub const fn resulting_status(self) -> TaskStatus {
        match self {
            Self::InProgress | Self::Reopened => TaskStatus::InProgress,
            Self::Completed => TaskStatus::Completed,
            Self::Accepted => TaskStatus::Accepted,
            Self::Returned => TaskStatus::Returned,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "Start work",
            Self::Completed => "Complete",
            Self::Accepted => "Accept",
            Self::Returned => "Return",
            Self::Reopened => "Reopen",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskTag {
    #[default]
    Task,
    Problem,
    Suggestion,
}

impl TaskTag {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Problem => "Problem",
            Self::Suggestion => "Suggestion",
        }
    }
}

/// What a history line records: the initial assignment or an applied action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEvent {
    Assigned,
    InProgress,
    Completed,
    Accepted,
    Returned,
    Reopened,
}

impl TaskEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assigned => "Assigned",
            Self::InProgress => "Taken into work",
            Self::Completed => "Completed",
            Self::Accepted => "Accepted",
            Self::Returned => "Returned for rework",
            Self::Reopened => "Reopened",
        }
    }
}

impl From<TaskAction> for TaskEvent {
    fn from(action: TaskAction) -> Self {
        match action {
            TaskAction::InProgress => Self::InProgress,
            TaskAction::Completed => Self::Completed,
            TaskAction::Accepted => Self::Accepted,
            TaskAction::Returned => Self::Returned,
            TaskAction::Reopened => Self::Reopened,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistoryEntry {
    pub event: TaskEvent,
    pub actor: Actor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub at: NaiveDateTime,
}

/// Fields a manager fills in when handing out a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tag: TaskTag,
    pub assignee: StaffId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub subject: String,
    pub description: String,
    pub tag: TaskTag,
    pub creator: StaffId,
    pub assignee: StaffId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_summary: Option<String>,
    pub history: Vec<TaskHistoryEntry>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Fresh task in `Assigned` with the assignment as its first history line.
    pub fn assign(id: TaskId, creator: Actor, draft: NewTask, at: NaiveDateTime) -> Self {
        Self {
            id,
            subject: draft.subject.trim().to_string(),
            description: draft.description.trim().to_string(),
            tag: draft.tag,
            creator: creator.user_id,
            assignee: draft.assignee,
            status: TaskStatus::Assigned,
            completion_summary: None,
            history: vec![TaskHistoryEntry {
                event: TaskEvent::Assigned,
                actor: creator,
                comment: None,
                at,
            }],
            created_at: at,
            updated_at: at,
        }
    }

    pub fn involves(&self, user_id: StaffId) -> bool {
        self.assignee == user_id || self.creator == user_id
    }
}
