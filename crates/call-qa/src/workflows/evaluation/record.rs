use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::catalog::{Criterion, Direction, DirectionId};
use super::scoring::{RubricScore, ScoreBand};
use super::verdict::{ScoreSheet, Verdict};
use crate::workflows::staff::StaffId;

const MIN_PHONE_LENGTH: usize = 5;

/// Identifier wrapper for stored evaluations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationId(pub String);

impl fmt::Display for EvaluationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a recording kept by the upload store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioReference {
    pub storage_key: String,
    /// Length reported by the player once the file's metadata loaded.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Evaluation payload as submitted by an evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub operator_id: StaffId,
    pub evaluator_id: StaffId,
    pub direction_id: DirectionId,
    pub phone_number: String,
    #[serde(default)]
    pub appeal_date: Option<NaiveDateTime>,
    /// Month the evaluation counts towards, `YYYY-MM`.
    pub assigned_month: String,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub sheet: ScoreSheet,
    #[serde(default)]
    pub audio: Option<AudioReference>,
    /// Duration carried by an imported call record, in seconds.
    #[serde(default)]
    pub expected_duration: Option<f64>,
}

/// Lifecycle of a stored evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Draft,
    Final,
    /// Replaced by a correction; kept read-only as history.
    Superseded,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EvaluationStatus::Draft => "draft",
            EvaluationStatus::Final => "final",
            EvaluationStatus::Superseded => "superseded",
        }
    }
}

/// Supervisor's request to have a final evaluation looked at again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorRequest {
    pub requested_by: StaffId,
    pub comment: String,
    pub requested_at: NaiveDateTime,
    pub approved_by: Option<StaffId>,
    pub approved_at: Option<NaiveDateTime>,
}

impl SupervisorRequest {
    pub fn is_pending(&self) -> bool {
        self.approved_by.is_none()
    }
}

/// Operator's objection to a final evaluation, addressed to their supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDispute {
    pub operator_id: StaffId,
    pub message: String,
    pub submitted_at: NaiveDateTime,
}

/// Stored evaluation including the criteria it was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: EvaluationId,
    pub operator_id: StaffId,
    pub evaluator_id: StaffId,
    pub direction_id: DirectionId,
    pub direction_name: String,
    pub phone_number: String,
    pub appeal_date: Option<NaiveDateTime>,
    pub assigned_month: String,
    pub criteria: Vec<Criterion>,
    pub scores: Vec<Verdict>,
    pub comments: Vec<String>,
    pub combined_comment: String,
    pub total_score: f64,
    pub critical_failure: Option<String>,
    pub status: EvaluationStatus,
    pub audio: Option<AudioReference>,
    pub expected_duration: Option<f64>,
    pub previous_version_id: Option<EvaluationId>,
    pub superseded_by: Option<EvaluationId>,
    pub supervisor_request: Option<SupervisorRequest>,
    #[serde(default)]
    pub dispute: Option<OperatorDispute>,
    pub created_at: NaiveDateTime,
}

impl EvaluationRecord {
    pub fn is_draft(&self) -> bool {
        self.status == EvaluationStatus::Draft
    }

    /// Current records are the ones not replaced by a correction.
    pub fn is_current(&self) -> bool {
        self.status != EvaluationStatus::Superseded
    }

    pub fn status_view(&self) -> EvaluationStatusView {
        EvaluationStatusView {
            evaluation_id: self.id.clone(),
            operator_id: self.operator_id,
            direction: self.direction_name.clone(),
            status: self.status.label(),
            total_score: self.total_score,
            band: ScoreBand::of(self.total_score).label(),
            assigned_month: self.assigned_month.clone(),
            previous_version_id: self.previous_version_id.clone(),
            reevaluation_requested: self
                .supervisor_request
                .as_ref()
                .is_some_and(SupervisorRequest::is_pending),
            disputed: self.dispute.is_some(),
        }
    }
}

/// Sanitized representation of an evaluation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStatusView {
    pub evaluation_id: EvaluationId,
    pub operator_id: StaffId,
    pub direction: String,
    pub status: &'static str,
    pub total_score: f64,
    pub band: &'static str,
    pub assigned_month: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version_id: Option<EvaluationId>,
    pub reevaluation_requested: bool,
    pub disputed: bool,
}

/// Metadata problems caught while assembling a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("phone number '{0}' is too short")]
    InvalidPhoneNumber(String),
    #[error("assigned month '{0}' must look like YYYY-MM")]
    InvalidMonth(String),
}

/// Assembles scorer output and submission metadata into a storable record.
pub struct EvaluationRecordBuilder<'a> {
    direction: &'a Direction,
    submission: EvaluationSubmission,
    score: RubricScore,
    previous_version_id: Option<EvaluationId>,
}

impl<'a> EvaluationRecordBuilder<'a> {
    pub fn new(direction: &'a Direction, submission: EvaluationSubmission, score: RubricScore) -> Self {
        Self {
            direction,
            submission,
            score,
            previous_version_id: None,
        }
    }

    pub fn previous_version(mut self, id: EvaluationId) -> Self {
        self.previous_version_id = Some(id);
        self
    }

    pub fn build(
        self,
        id: EvaluationId,
        created_at: NaiveDateTime,
    ) -> Result<EvaluationRecord, RecordError> {
        let Self {
            direction,
            submission,
            score,
            previous_version_id,
        } = self;

        let phone_number = normalize_phone(&submission.phone_number)?;
        let assigned_month = normalize_month(&submission.assigned_month)?;

        let count = direction.criteria.len();
        let mut scores = submission.sheet.verdicts.clone();
        scores.resize(count, Verdict::Correct);
        let mut comments = submission.sheet.comments.clone();
        comments.resize(count, String::new());

        let combined_comment = direction
            .criteria
            .iter()
            .zip(&comments)
            .filter(|(_, comment)| !comment.trim().is_empty())
            .map(|(criterion, comment)| format!("{}: {}", criterion.name, comment.trim()))
            .collect::<Vec<_>>()
            .join("; ");

        let audio = submission.audio.map(|mut audio| {
            audio.duration_seconds = audio.duration_seconds.filter(|value| value.is_finite());
            audio
        });
        let expected_duration = submission
            .expected_duration
            .filter(|value| value.is_finite() && *value > 0.0);

        let status = if submission.is_draft {
            EvaluationStatus::Draft
        } else {
            EvaluationStatus::Final
        };

        Ok(EvaluationRecord {
            id,
            operator_id: submission.operator_id,
            evaluator_id: submission.evaluator_id,
            direction_id: direction.id,
            direction_name: direction.name.clone(),
            phone_number,
            appeal_date: submission.appeal_date,
            assigned_month,
            criteria: direction.criteria.clone(),
            scores,
            comments,
            combined_comment,
            total_score: score.total,
            critical_failure: score.critical_failure,
            status,
            audio,
            expected_duration,
            previous_version_id,
            superseded_by: None,
            supervisor_request: None,
            dispute: None,
            created_at,
        })
    }
}

pub(crate) fn normalize_phone(raw: &str) -> Result<String, RecordError> {
    let normalized: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if normalized.len() < MIN_PHONE_LENGTH {
        return Err(RecordError::InvalidPhoneNumber(raw.to_string()));
    }
    Ok(normalized)
}

/// Canonical `YYYY-MM` form of an assigned month.
pub fn normalize_month(raw: &str) -> Result<String, RecordError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m").to_string())
        .map_err(|_| RecordError::InvalidMonth(raw.to_string()))
}
