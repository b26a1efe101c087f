use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Actor, StaffId, StaffRole};
use crate::workflows::evaluation::DirectionId;

/// Employment rates an account can be scheduled at.
pub const RATES: [f64; 3] = [1.0, 0.75, 0.5];

fn default_rate() -> f64 {
    1.0
}

/// Employment status; every status except `Working` and `Fired` is tracked as a dated period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[default]
    Working,
    Fired,
    /// Unpaid leave.
    #[serde(alias = "unpaid_leave")]
    Bs,
    SickLeave,
    AnnualLeave,
    /// Notice period ending in dismissal; may be open-ended.
    Dismissal,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::Working => "working",
            EmploymentStatus::Fired => "fired",
            EmploymentStatus::Bs => "bs",
            EmploymentStatus::SickLeave => "sick_leave",
            EmploymentStatus::AnnualLeave => "annual_leave",
            EmploymentStatus::Dismissal => "dismissal",
        }
    }

    pub const fn is_period(self) -> bool {
        matches!(
            self,
            EmploymentStatus::Bs
                | EmploymentStatus::SickLeave
                | EmploymentStatus::AnnualLeave
                | EmploymentStatus::Dismissal
        )
    }
}

/// A dated stretch of a non-working status, as it appears on the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPeriod {
    pub status: EmploymentStatus,
    pub start_date: NaiveDate,
    /// `None` only for an open-ended dismissal.
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissal_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl StatusPeriod {
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Requested status change for an existing account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusChange {
    pub status: EmploymentStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub dismissal_reason: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl StatusChange {
    pub fn to(status: EmploymentStatus) -> Self {
        Self {
            status,
            start_date: None,
            end_date: None,
            dismissal_reason: None,
            comment: None,
        }
    }

    pub fn between(mut self, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        self.start_date = Some(start);
        self.end_date = end;
        self
    }

    /// The schedule period this change opens, if the status is tracked as one.
    pub fn into_period(self) -> Result<Option<StatusPeriod>, StaffError> {
        let Self {
            status,
            start_date,
            end_date,
            dismissal_reason,
            comment,
        } = self;
        if !status.is_period() {
            return Ok(None);
        }

        let start_date = start_date.ok_or(StaffError::MissingPeriodStart)?;
        match end_date {
            Some(end) if end < start_date => {
                return Err(StaffError::PeriodEndsBeforeStart {
                    start: start_date,
                    end,
                })
            }
            None if status != EmploymentStatus::Dismissal => {
                return Err(StaffError::MissingPeriodEnd(status))
            }
            _ => {}
        }

        let dismissal_reason = non_blank(dismissal_reason);
        let comment = non_blank(comment);
        if status == EmploymentStatus::Dismissal {
            if dismissal_reason.is_none() {
                return Err(StaffError::MissingDismissalReason);
            }
            if comment.is_none() {
                return Err(StaffError::MissingDismissalComment);
            }
        }

        Ok(Some(StatusPeriod {
            status,
            start_date,
            end_date,
            dismissal_reason,
            comment,
        }))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Account form submitted by an admin or supervisor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewStaff {
    pub name: String,
    pub role: StaffRole,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub direction_id: Option<DirectionId>,
    #[serde(default)]
    pub supervisor_id: Option<StaffId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub rate: f64,
    pub hire_date: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    pub direction_id: Option<DirectionId>,
    pub supervisor_id: Option<StaffId>,
    pub status: EmploymentStatus,
    pub periods: Vec<StatusPeriod>,
}

impl StaffRecord {
    /// Validate a new account. Supervisors only add operators to their own team.
    pub fn create(id: StaffId, creator: Actor, draft: NewStaff) -> Result<Self, StaffError> {
        let NewStaff {
            name,
            role,
            rate,
            hire_date,
            birth_date,
            direction_id,
            mut supervisor_id,
        } = draft;

        match creator.role {
            StaffRole::Admin => {}
            StaffRole::Supervisor if role == StaffRole::Operator => {
                supervisor_id = Some(creator.user_id);
            }
            other => return Err(StaffError::Forbidden(other)),
        }

        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(StaffError::MissingName);
        }
        let hire_date = hire_date.ok_or(StaffError::MissingHireDate)?;
        if !RATES.contains(&rate) {
            return Err(StaffError::InvalidRate(rate));
        }
        if role == StaffRole::Operator {
            if supervisor_id.is_none() {
                return Err(StaffError::MissingSupervisor);
            }
            if direction_id.is_none() {
                return Err(StaffError::MissingDirection);
            }
        }

        Ok(Self {
            id,
            name,
            role,
            rate,
            hire_date,
            birth_date,
            direction_id,
            supervisor_id,
            status: EmploymentStatus::Working,
            periods: Vec::new(),
        })
    }

    /// Record a status change; period statuses are appended to the schedule.
    pub fn apply_status(&mut self, change: StatusChange) -> Result<(), StaffError> {
        let status = change.status;
        if let Some(period) = change.into_period()? {
            self.periods.push(period);
        }
        self.status = status;
        Ok(())
    }

    /// Status in force on `date`: the latest period covering it, else the base status.
    pub fn status_on(&self, date: NaiveDate) -> EmploymentStatus {
        self.periods
            .iter()
            .rev()
            .find(|period| period.covers(date))
            .map(|period| period.status)
            .unwrap_or(match self.status {
                EmploymentStatus::Fired => EmploymentStatus::Fired,
                _ => EmploymentStatus::Working,
            })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StaffError {
    #[error("role '{}' may not manage this account", .0.label())]
    Forbidden(StaffRole),
    #[error("name is required")]
    MissingName,
    #[error("hire date is required")]
    MissingHireDate,
    #[error("rate {0} is not one of 1.00, 0.75, 0.50")]
    InvalidRate(f64),
    #[error("operators need a supervisor")]
    MissingSupervisor,
    #[error("operators need a direction")]
    MissingDirection,
    #[error("a status period needs a start date")]
    MissingPeriodStart,
    #[error("status '{}' needs an end date", .0.label())]
    MissingPeriodEnd(EmploymentStatus),
    #[error("period ends on {end} before it starts on {start}")]
    PeriodEndsBeforeStart { start: NaiveDate, end: NaiveDate },
    #[error("a dismissal needs a reason")]
    MissingDismissalReason,
    #[error("a dismissal needs a comment")]
    MissingDismissalComment,
}
