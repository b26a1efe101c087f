use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::{CatalogError, Criterion, CriterionCatalog, Direction, DirectionId};
use super::config::EvaluationPolicy;
use super::duration::DurationTolerance;
use super::record::{
    normalize_month, EvaluationId, EvaluationRecord, EvaluationRecordBuilder, EvaluationStatus,
    EvaluationSubmission, OperatorDispute, RecordError, SupervisorRequest,
};
use super::repository::{EvaluationRepository, RepositoryError};
use super::scoring::{RubricScore, RubricScorer, ScoringError};
use super::validation::{SubmissionContext, SubmissionReport, SubmissionValidator, ValidationIssue};
use super::verdict::{ScoreSheet, Verdict};
use crate::workflows::staff::{Actor, StaffId, StaffRole};

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Score plus submittability, the shape returned to the evaluation form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePreview {
    pub total_score: f64,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<ValidationIssue>,
}

/// Audio state of an evaluation form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct AudioState {
    #[serde(default)]
    pub attached: bool,
    #[serde(default)]
    pub expected_duration: Option<f64>,
    #[serde(default)]
    pub actual_duration: Option<f64>,
}

/// Catalog-free scoring request: criteria travel with the verdicts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RubricInput {
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub verdicts: Vec<Verdict>,
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub has_file_upload: bool,
    #[serde(default)]
    pub audio: AudioState,
}

/// Score an ad-hoc rubric and report whether it could be submitted.
pub fn preview_rubric(
    input: RubricInput,
    tolerance: &DurationTolerance,
) -> Result<ScorePreview, ScoringError> {
    let RubricInput {
        criteria,
        verdicts,
        comments,
        has_file_upload,
        audio,
    } = input;

    let direction = Direction {
        id: DirectionId(0),
        name: "ad hoc".to_string(),
        has_file_upload,
        criteria,
    };
    let sheet = ScoreSheet { verdicts, comments };
    let (score, report) = assess(&direction, &sheet, &audio, tolerance)?;

    Ok(ScorePreview {
        total_score: score.total,
        valid: report.valid,
        reasons: report.reasons,
    })
}

fn assess(
    direction: &Direction,
    sheet: &ScoreSheet,
    audio: &AudioState,
    tolerance: &DurationTolerance,
) -> Result<(RubricScore, SubmissionReport), ScoringError> {
    let score = RubricScorer::new().score(&direction.criteria, &sheet.verdicts)?;
    let duration = if audio.attached || audio.actual_duration.is_some() {
        tolerance.check(audio.expected_duration, audio.actual_duration)
    } else {
        None
    };
    let report = SubmissionValidator.check(&SubmissionContext {
        direction: Some(direction),
        sheet,
        audio_attached: audio.attached,
        duration,
    });
    Ok((score, report))
}

/// Final evaluations counted for one operator in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub operator_id: StaffId,
    pub month: String,
    pub evaluated: usize,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
}

impl MonthlySummary {
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.evaluated)
    }
}

/// Service composing the catalog, scorer, validator, and repository.
pub struct EvaluationService<R> {
    repository: Arc<R>,
    catalog: RwLock<CriterionCatalog>,
    policy: EvaluationPolicy,
}

impl<R> EvaluationService<R>
where
    R: EvaluationRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: CriterionCatalog,
        policy: EvaluationPolicy,
    ) -> Result<Self, EvaluationServiceError> {
        catalog.validate()?;
        Ok(Self {
            repository,
            catalog: RwLock::new(catalog),
            policy,
        })
    }

    pub fn policy(&self) -> &EvaluationPolicy {
        &self.policy
    }

    pub fn catalog(&self) -> CriterionCatalog {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the catalog after it passes save-time validation.
    pub fn save_catalog(&self, catalog: CriterionCatalog) -> Result<(), EvaluationServiceError> {
        if let Err(err) = catalog.validate() {
            warn!(error = %err, "catalog save rejected");
            return Err(err.into());
        }
        let directions = catalog.directions().len();
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = catalog;
        info!(directions, "criterion catalog saved");
        Ok(())
    }

    fn direction(&self, id: DirectionId) -> Result<Direction, EvaluationServiceError> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .direction(id)
            .cloned()
            .ok_or(EvaluationServiceError::UnknownDirection(id))
    }

    /// Score an in-progress evaluation against the catalog without storing it.
    pub fn score_preview(
        &self,
        direction_id: DirectionId,
        sheet: &ScoreSheet,
        audio: &AudioState,
    ) -> Result<ScorePreview, EvaluationServiceError> {
        let direction = self.direction(direction_id)?;
        let (score, report) = assess(&direction, sheet, audio, &self.policy.duration_tolerance)?;
        Ok(ScorePreview {
            total_score: score.total,
            valid: report.valid,
            reasons: report.reasons,
        })
    }

    /// Store a draft or a final evaluation.
    pub fn submit(
        &self,
        submission: EvaluationSubmission,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        let direction = self.direction(submission.direction_id)?;
        let score = self.score_and_gate(&direction, &submission, false)?;

        let record = EvaluationRecordBuilder::new(&direction, submission, score)
            .build(next_evaluation_id(), now())?;
        let stored = if record.is_draft() {
            self.repository.insert(record)?
        } else {
            self.store_final(record, None)?
        };

        info!(
            evaluation_id = %stored.id,
            operator_id = %stored.operator_id,
            status = stored.status.label(),
            total_score = stored.total_score,
            "evaluation stored"
        );
        Ok(stored)
    }

    /// Save changes to a draft; a submission with `is_draft == false` finalizes it in place.
    pub fn update_draft(
        &self,
        id: &EvaluationId,
        requester: StaffId,
        mut submission: EvaluationSubmission,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        let current = self.fetch(id)?;
        if !current.is_draft() {
            return Err(EvaluationServiceError::NotDraft(id.clone()));
        }
        if current.evaluator_id != requester {
            return Err(EvaluationServiceError::NotOwner(id.clone()));
        }
        submission.evaluator_id = current.evaluator_id;

        let direction = self.direction(submission.direction_id)?;
        let score = self.score_and_gate(&direction, &submission, false)?;
        let created_at = if submission.is_draft {
            current.created_at
        } else {
            now()
        };
        let record = EvaluationRecordBuilder::new(&direction, submission, score)
            .build(current.id.clone(), created_at)?;

        let stored = if record.is_draft() {
            self.repository
                .replace(&current, record)
                .map_err(|err| stale_as_modified(err, id))?
        } else {
            self.store_final(record, Some(&current))?
        };

        info!(
            evaluation_id = %stored.id,
            status = stored.status.label(),
            total_score = stored.total_score,
            "draft saved"
        );
        Ok(stored)
    }

    fn store_final(
        &self,
        record: EvaluationRecord,
        replacing: Option<&EvaluationRecord>,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        let operator_id = record.operator_id;
        let month = record.assigned_month.clone();
        let id = record.id.clone();
        self.repository
            .store_final(record, replacing, self.policy.monthly_limit)
            .map_err(|err| match err {
                RepositoryError::LimitReached { limit } => {
                    warn!(%operator_id, %month, limit, "monthly evaluation limit reached");
                    EvaluationServiceError::MonthlyLimitReached {
                        operator_id,
                        month,
                        limit,
                    }
                }
                other => stale_as_modified(other, &id),
            })
    }

    /// Re-evaluate a final record; the previous version is kept as read-only history.
    pub fn correct(
        &self,
        previous_id: &EvaluationId,
        mut submission: EvaluationSubmission,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        let previous = self.fetch(previous_id)?;
        if previous.status != EvaluationStatus::Final {
            return Err(EvaluationServiceError::NotCurrent(previous_id.clone()));
        }

        submission.is_draft = false;
        submission.operator_id = previous.operator_id;
        if submission.audio.is_none() {
            submission.audio = previous.audio.clone();
        }
        if submission.expected_duration.is_none() {
            submission.expected_duration = previous.expected_duration;
        }

        let direction = self.direction(submission.direction_id)?;
        let score = self.score_and_gate(&direction, &submission, true)?;

        let record = EvaluationRecordBuilder::new(&direction, submission, score)
            .previous_version(previous.id.clone())
            .build(next_evaluation_id(), now())?;

        let mut superseded = previous.clone();
        superseded.status = EvaluationStatus::Superseded;
        superseded.superseded_by = Some(record.id.clone());

        let stored = self
            .repository
            .supersede(&previous, superseded, record)
            .map_err(|err| match err {
                RepositoryError::Stale => {
                    warn!(evaluation_id = %previous_id, "correction lost to a concurrent change");
                    EvaluationServiceError::NotCurrent(previous_id.clone())
                }
                other => other.into(),
            })?;

        info!(
            evaluation_id = %stored.id,
            previous_id = %previous_id,
            total_score = stored.total_score,
            "evaluation corrected"
        );
        Ok(stored)
    }

    fn score_and_gate(
        &self,
        direction: &Direction,
        submission: &EvaluationSubmission,
        force_final: bool,
    ) -> Result<RubricScore, EvaluationServiceError> {
        let audio = AudioState {
            attached: submission.audio.is_some(),
            expected_duration: submission.expected_duration,
            actual_duration: submission
                .audio
                .as_ref()
                .and_then(|audio| audio.duration_seconds),
        };
        let (score, report) = assess(
            direction,
            &submission.sheet,
            &audio,
            &self.policy.duration_tolerance,
        )?;

        if (force_final || !submission.is_draft) && !report.valid {
            return Err(EvaluationServiceError::Validation(report));
        }
        Ok(score)
    }

    pub fn get(&self, id: &EvaluationId) -> Result<EvaluationRecord, EvaluationServiceError> {
        self.fetch(id)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<EvaluationRecord, EvaluationServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Drafts may only be discarded by the evaluator who started them.
    pub fn delete_draft(
        &self,
        id: &EvaluationId,
        requester: StaffId,
    ) -> Result<(), EvaluationServiceError> {
        let record = self.fetch(id)?;
        if !record.is_draft() {
            return Err(EvaluationServiceError::NotDraft(id.clone()));
        }
        if record.evaluator_id != requester {
            return Err(EvaluationServiceError::NotOwner(id.clone()));
        }
        self.repository
            .remove(&record)
            .map_err(|err| stale_as_modified(err, id))?;
        info!(evaluation_id = %id, "draft deleted");
        Ok(())
    }

    /// Versions leading up to `id`, oldest first.
    pub fn history(
        &self,
        id: &EvaluationId,
    ) -> Result<Vec<EvaluationRecord>, EvaluationServiceError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id.clone());

        while let Some(current) = cursor {
            if !seen.insert(current.clone()) {
                break;
            }
            let record = self.fetch(&current)?;
            cursor = record.previous_version_id.clone();
            chain.push(record);
        }

        chain.reverse();
        Ok(chain)
    }

    pub fn request_reevaluation(
        &self,
        id: &EvaluationId,
        actor: Actor,
        comment: &str,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        if actor.role != StaffRole::Supervisor {
            return Err(EvaluationServiceError::Forbidden(actor.role));
        }
        let current = self.fetch(id)?;
        if current.status != EvaluationStatus::Final {
            return Err(EvaluationServiceError::NotCurrent(id.clone()));
        }
        if current
            .supervisor_request
            .as_ref()
            .is_some_and(SupervisorRequest::is_pending)
        {
            return Err(EvaluationServiceError::RequestPending(id.clone()));
        }

        let mut record = current.clone();
        record.supervisor_request = Some(SupervisorRequest {
            requested_by: actor.user_id,
            comment: comment.trim().to_string(),
            requested_at: now(),
            approved_by: None,
            approved_at: None,
        });
        let record = self
            .repository
            .replace(&current, record)
            .map_err(|err| stale_as_modified(err, id))?;
        info!(evaluation_id = %id, supervisor = %actor.user_id, "re-evaluation requested");
        Ok(record)
    }

    pub fn approve_reevaluation(
        &self,
        id: &EvaluationId,
        actor: Actor,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        if actor.role != StaffRole::Admin {
            return Err(EvaluationServiceError::Forbidden(actor.role));
        }
        let current = self.fetch(id)?;
        let mut record = current.clone();
        let request = record
            .supervisor_request
            .as_mut()
            .filter(|request| request.is_pending())
            .ok_or_else(|| EvaluationServiceError::NoPendingRequest(id.clone()))?;

        request.approved_by = Some(actor.user_id);
        request.approved_at = Some(now());
        let record = self
            .repository
            .replace(&current, record)
            .map_err(|err| stale_as_modified(err, id))?;
        info!(evaluation_id = %id, approver = %actor.user_id, "re-evaluation approved");
        Ok(record)
    }

    /// Operator objects to one of their own final evaluations.
    pub fn dispute(
        &self,
        id: &EvaluationId,
        actor: Actor,
        message: &str,
    ) -> Result<EvaluationRecord, EvaluationServiceError> {
        if actor.role != StaffRole::Operator {
            return Err(EvaluationServiceError::Forbidden(actor.role));
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(EvaluationServiceError::EmptyDispute);
        }

        let current = self.fetch(id)?;
        if current.operator_id != actor.user_id {
            return Err(EvaluationServiceError::NotOwner(id.clone()));
        }
        if current.status != EvaluationStatus::Final {
            return Err(EvaluationServiceError::NotCurrent(id.clone()));
        }
        if current.dispute.is_some() {
            return Err(EvaluationServiceError::AlreadyDisputed(id.clone()));
        }

        let mut record = current.clone();
        record.dispute = Some(OperatorDispute {
            operator_id: actor.user_id,
            message: message.to_string(),
            submitted_at: now(),
        });
        let record = self
            .repository
            .replace(&current, record)
            .map_err(|err| stale_as_modified(err, id))?;
        info!(evaluation_id = %id, operator_id = %actor.user_id, "evaluation disputed");
        Ok(record)
    }

    /// Count and average of current final evaluations; drafts and history are excluded.
    pub fn monthly_summary(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<MonthlySummary, EvaluationServiceError> {
        let month = normalize_month(month)?;
        let records = self.repository.list_for_operator(operator_id, &month)?;
        let scores: Vec<f64> = records
            .iter()
            .filter(|record| record.status == EvaluationStatus::Final)
            .map(|record| record.total_score)
            .collect();

        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };

        Ok(MonthlySummary {
            operator_id,
            month,
            evaluated: scores.len(),
            limit: self.policy.monthly_limit,
            average_score,
        })
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("evaluation cannot be submitted: {}", .0.summary())]
    Validation(SubmissionReport),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("unknown direction {0}")]
    UnknownDirection(DirectionId),
    #[error("evaluation {0} is not a draft")]
    NotDraft(EvaluationId),
    #[error("evaluation {0} belongs to another user")]
    NotOwner(EvaluationId),
    #[error("evaluation {0} is not the current final version")]
    NotCurrent(EvaluationId),
    #[error("operator {operator_id} already has {limit} evaluations for {month}")]
    MonthlyLimitReached {
        operator_id: StaffId,
        month: String,
        limit: usize,
    },
    #[error("role '{}' may not perform this action", .0.label())]
    Forbidden(StaffRole),
    #[error("a re-evaluation request for {0} is still pending")]
    RequestPending(EvaluationId),
    #[error("no pending re-evaluation request for {0}")]
    NoPendingRequest(EvaluationId),
    #[error("evaluation {0} changed while it was being saved")]
    Modified(EvaluationId),
    #[error("a dispute needs a message for the supervisor")]
    EmptyDispute,
    #[error("evaluation {0} is already disputed")]
    AlreadyDisputed(EvaluationId),
}

fn stale_as_modified(err: RepositoryError, id: &EvaluationId) -> EvaluationServiceError {
    match err {
        RepositoryError::Stale => EvaluationServiceError::Modified(id.clone()),
        other => other.into(),
    }
}
