use std::fmt;

use serde::{Deserialize, Serialize};

/// Evaluator judgment on one criterion of one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[default]
    Correct,
    #[serde(rename = "N/A")]
    NotApplicable,
    Incorrect,
    Deficiency,
    Error,
}

impl Verdict {
    pub const fn label(self) -> &'static str {
        match self {
            Verdict::Correct => "Correct",
            Verdict::NotApplicable => "N/A",
            Verdict::Incorrect => "Incorrect",
            Verdict::Deficiency => "Deficiency",
            Verdict::Error => "Error",
        }
    }

    /// Failing verdicts must be explained before the evaluation can be submitted.
    pub const fn requires_comment(self) -> bool {
        matches!(self, Verdict::Error | Verdict::Incorrect)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdicts and per-criterion comments, index aligned with a direction's criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    #[serde(default)]
    pub verdicts: Vec<Verdict>,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl ScoreSheet {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts,
            comments: Vec::new(),
        }
    }

    /// Sheet with every criterion marked `Correct`, as a fresh evaluation starts.
    pub fn all_correct(criteria: usize) -> Self {
        Self {
            verdicts: vec![Verdict::Correct; criteria],
            comments: vec![String::new(); criteria],
        }
    }

    pub fn with_comment(mut self, index: usize, comment: impl Into<String>) -> Self {
        if self.comments.len() <= index {
            self.comments.resize(index + 1, String::new());
        }
        self.comments[index] = comment.into();
        self
    }

    pub fn set(&mut self, index: usize, verdict: Verdict) {
        if self.verdicts.len() <= index {
            self.verdicts.resize(index + 1, Verdict::Correct);
        }
        self.verdicts[index] = verdict;
    }

    /// Missing entries count as `Correct`.
    pub fn verdict(&self, index: usize) -> Verdict {
        self.verdicts.get(index).copied().unwrap_or_default()
    }

    pub fn comment(&self, index: usize) -> &str {
        self.comments.get(index).map(String::as_str).unwrap_or("")
    }
}
