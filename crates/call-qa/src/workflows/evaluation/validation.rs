use std::fmt;

use serde::{Serialize, Serializer};

use super::catalog::Direction;
use super::duration::{format_seconds, DurationCheck};
use super::verdict::ScoreSheet;

/// Snapshot of an in-progress evaluation the validator inspects.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionContext<'a> {
    pub direction: Option<&'a Direction>,
    pub sheet: &'a ScoreSheet,
    /// A recording is attached now or was stored with an earlier version.
    pub audio_attached: bool,
    pub duration: Option<DurationCheck>,
}

/// Reasons an evaluation cannot be submitted yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    NoCriteria,
    MissingAudio {
        direction: String,
    },
    MissingComment {
        index: usize,
        criterion: String,
    },
    DurationMismatch {
        expected: f64,
        actual: f64,
        allowed: f64,
    },
    /// An expected duration is known but the attached recording's length is not.
    UnknownRecordingLength {
        expected: f64,
    },
}

impl ValidationIssue {
    /// Name of the control the message belongs next to.
    pub fn field(&self) -> String {
        match self {
            ValidationIssue::NoCriteria => "direction".to_string(),
            ValidationIssue::MissingAudio { .. }
            | ValidationIssue::DurationMismatch { .. }
            | ValidationIssue::UnknownRecordingLength { .. } => "audio_file".to_string(),
            ValidationIssue::MissingComment { index, .. } => format!("comments[{index}]"),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::NoCriteria => write!(f, "no direction criteria are loaded"),
            ValidationIssue::MissingAudio { direction } => {
                write!(f, "direction '{direction}' requires an audio recording")
            }
            ValidationIssue::MissingComment { criterion, .. } => {
                write!(f, "criterion '{criterion}' needs a comment explaining the error")
            }
            ValidationIssue::DurationMismatch {
                expected, actual, ..
            } => write!(
                f,
                "recording length {} does not match expected {}",
                format_seconds(Some(*actual)),
                format_seconds(Some(*expected))
            ),
            ValidationIssue::UnknownRecordingLength { expected } => write!(
                f,
                "recording length is unknown; expected {}",
                format_seconds(Some(*expected))
            ),
        }
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of gating a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub valid: bool,
    pub reasons: Vec<ValidationIssue>,
}

impl SubmissionReport {
    pub fn summary(&self) -> String {
        if self.valid {
            "ready to submit".to_string()
        } else {
            self.reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        }
    }
}

/// Pure gate deciding whether an evaluation may be submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionValidator;

impl SubmissionValidator {
    pub fn check(&self, context: &SubmissionContext<'_>) -> SubmissionReport {
        let mut reasons = Vec::new();

        match context.direction {
            Some(direction) if !direction.criteria.is_empty() => {
                if direction.has_file_upload && !context.audio_attached {
                    reasons.push(ValidationIssue::MissingAudio {
                        direction: direction.name.clone(),
                    });
                }

                for (index, criterion) in direction.criteria.iter().enumerate() {
                    if context.sheet.verdict(index).requires_comment()
                        && context.sheet.comment(index).trim().is_empty()
                    {
                        reasons.push(ValidationIssue::MissingComment {
                            index,
                            criterion: criterion.name.clone(),
                        });
                    }
                }
            }
            _ => reasons.push(ValidationIssue::NoCriteria),
        }

        if let Some(check) = context.duration {
            match check.actual {
                None if context.audio_attached => {
                    reasons.push(ValidationIssue::UnknownRecordingLength {
                        expected: check.expected,
                    });
                }
                Some(actual) if check.mismatch => {
                    reasons.push(ValidationIssue::DurationMismatch {
                        expected: check.expected,
                        actual,
                        allowed: check.allowed,
                    });
                }
                _ => {}
            }
        }

        SubmissionReport {
            valid: reasons.is_empty(),
            reasons,
        }
    }
}
