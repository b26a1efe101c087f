use serde::{Deserialize, Serialize};

use super::catalog::Criterion;
use super::verdict::Verdict;

/// Stateless scorer turning per-criterion verdicts into a 0-100 total.
#[derive(Debug, Clone, Copy, Default)]
pub struct RubricScorer;

impl RubricScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score `verdicts` against `criteria`. Missing verdicts count as `Correct`.
    pub fn score(
        &self,
        criteria: &[Criterion],
        verdicts: &[Verdict],
    ) -> Result<RubricScore, ScoringError> {
        if criteria.is_empty() {
            return Err(ScoringError::EmptyRubric);
        }
        if verdicts.len() > criteria.len() {
            return Err(ScoringError::VerdictCountMismatch {
                criteria: criteria.len(),
                verdicts: verdicts.len(),
            });
        }

        let verdict_at = |index: usize| verdicts.get(index).copied().unwrap_or_default();

        for (index, criterion) in criteria.iter().enumerate() {
            check_verdict(index, criterion, verdict_at(index))?;
        }

        let critical_failure = criteria
            .iter()
            .enumerate()
            .find(|(index, criterion)| criterion.is_critical && verdict_at(*index) == Verdict::Error)
            .map(|(_, criterion)| criterion.name.clone());

        let mut components = Vec::with_capacity(criteria.len());
        let mut total = 0.0;

        for (index, criterion) in criteria.iter().enumerate() {
            let verdict = verdict_at(index);
            let possible = criterion.scored_weight();
            let awarded = if critical_failure.is_some() || criterion.is_critical {
                0.0
            } else {
                awarded_points(index, criterion, verdict)?
            };
            total += awarded;
            components.push(ScoreComponent {
                criterion: criterion.name.clone(),
                verdict,
                awarded,
                possible,
            });
        }

        if critical_failure.is_some() {
            total = 0.0;
        }

        Ok(RubricScore {
            total,
            critical_failure,
            components,
        })
    }
}

fn check_verdict(index: usize, criterion: &Criterion, verdict: Verdict) -> Result<(), ScoringError> {
    let allowed = match verdict {
        Verdict::Correct | Verdict::NotApplicable => true,
        Verdict::Error => criterion.is_critical,
        Verdict::Incorrect => !criterion.is_critical,
        Verdict::Deficiency => !criterion.is_critical && criterion.deficiency.is_some(),
    };

    if allowed {
        Ok(())
    } else {
        Err(ScoringError::InvalidVerdict {
            index,
            criterion: criterion.name.clone(),
            verdict,
        })
    }
}

fn awarded_points(
    index: usize,
    criterion: &Criterion,
    verdict: Verdict,
) -> Result<f64, ScoringError> {
    match verdict {
        Verdict::Correct | Verdict::NotApplicable => Ok(criterion.weight),
        Verdict::Incorrect | Verdict::Error => Ok(0.0),
        Verdict::Deficiency => {
            let Some(deficiency) = criterion.deficiency.as_ref() else {
                return Err(ScoringError::InvalidVerdict {
                    index,
                    criterion: criterion.name.clone(),
                    verdict,
                });
            };
            Ok(deficiency.weight)
        }
    }
}

/// Points awarded for a single criterion, kept for audits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub criterion: String,
    pub verdict: Verdict,
    pub awarded: f64,
    pub possible: f64,
}

/// Scorer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricScore {
    pub total: f64,
    /// Name of the critical criterion that zeroed the score, if any.
    pub critical_failure: Option<String>,
    pub components: Vec<ScoreComponent>,
}

impl RubricScore {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::of(self.total)
    }
}

/// Coarse quality band for a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    High,
    Mid,
    Low,
}

impl ScoreBand {
    pub fn of(total: f64) -> Self {
        if total >= 80.0 {
            ScoreBand::High
        } else if total >= 60.0 {
            ScoreBand::Mid
        } else {
            ScoreBand::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ScoreBand::High => "high",
            ScoreBand::Mid => "mid",
            ScoreBand::Low => "low",
        }
    }
}

/// Inputs the scorer refuses to interpret.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("direction has no criteria to score against")]
    EmptyRubric,
    #[error("received {verdicts} verdicts for {criteria} criteria")]
    VerdictCountMismatch { criteria: usize, verdicts: usize },
    #[error("verdict {verdict} is not allowed for criterion #{} '{criterion}'", .index + 1)]
    InvalidVerdict {
        index: usize,
        criterion: String,
        verdict: Verdict,
    },
}
