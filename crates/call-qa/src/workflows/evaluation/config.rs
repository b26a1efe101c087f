use serde::{Deserialize, Serialize};

use super::duration::DurationTolerance;

const DEFAULT_MONTHLY_LIMIT: usize = 20;

/// Policy knobs applied by the evaluation service on top of the rubric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPolicy {
    pub duration_tolerance: DurationTolerance,
    /// Final evaluations allowed per operator per assigned month.
    pub monthly_limit: usize,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self {
            duration_tolerance: DurationTolerance::default(),
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
        }
    }
}
