//! Call evaluation: criterion catalog, rubric scoring, submission gating, and the
//! versioned evaluation records built on top of them.

pub mod catalog;
mod config;
pub mod duration;
pub mod record;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;
pub mod verdict;

#[cfg(test)]
mod tests;

pub use catalog::{
    CatalogError, Criterion, CriterionCatalog, Deficiency, Direction, DirectionId, TOTAL_WEIGHT,
};
pub use config::EvaluationPolicy;
pub use duration::{format_seconds, DurationCheck, DurationTolerance};
pub use record::{
    normalize_month, AudioReference, EvaluationId, EvaluationRecord, EvaluationRecordBuilder,
    EvaluationStatus, EvaluationStatusView, EvaluationSubmission, OperatorDispute, RecordError,
    SupervisorRequest,
};
pub use repository::{finals_in_month, EvaluationRepository, RepositoryError};
pub use router::evaluation_router;
pub use scoring::{RubricScore, RubricScorer, ScoreBand, ScoreComponent, ScoringError};
pub use service::{
    preview_rubric, AudioState, EvaluationService, EvaluationServiceError, MonthlySummary,
    RubricInput, ScorePreview,
};
pub use validation::{SubmissionContext, SubmissionReport, SubmissionValidator, ValidationIssue};
pub use verdict::{ScoreSheet, Verdict};
