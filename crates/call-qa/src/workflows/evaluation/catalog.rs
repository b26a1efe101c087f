use std::fmt;

use serde::{Deserialize, Serialize};

/// Weight every direction's non-critical criteria must add up to.
pub const TOTAL_WEIGHT: f64 = 100.0;

const WEIGHT_EPSILON: f64 = 1e-6;

/// Identifier wrapper for a direction (business line) in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectionId(pub u64);

impl fmt::Display for DirectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial-credit tier attached to a weighted criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deficiency {
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

/// One scored dimension of a call evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub name: String,
    #[serde(default)]
    pub is_critical: bool,
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deficiency: Option<Deficiency>,
    /// Guidance shown to the evaluator; never scored.
    #[serde(default)]
    pub value: String,
}

impl Criterion {
    pub fn weighted(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            is_critical: false,
            weight,
            deficiency: None,
            value: String::new(),
        }
    }

    pub fn critical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_critical: true,
            weight: 0.0,
            deficiency: None,
            value: String::new(),
        }
    }

    pub fn with_deficiency(mut self, weight: f64, description: impl Into<String>) -> Self {
        self.deficiency = Some(Deficiency {
            weight,
            description: description.into(),
        });
        self
    }

    pub fn with_guidance(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Weight counted towards the direction total; critical criteria never count.
    pub fn scored_weight(&self) -> f64 {
        if self.is_critical {
            0.0
        } else {
            self.weight
        }
    }

    fn check_shape(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::MissingName);
        }
        if self.is_critical {
            return Ok(());
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(CatalogError::NonPositiveWeight {
                criterion: self.name.clone(),
            });
        }
        if let Some(deficiency) = &self.deficiency {
            if !deficiency.weight.is_finite()
                || deficiency.weight <= 0.0
                || deficiency.weight > self.weight + WEIGHT_EPSILON
            {
                return Err(CatalogError::DeficiencyOutOfRange {
                    criterion: self.name.clone(),
                    deficiency: deficiency.weight,
                    weight: self.weight,
                });
            }
        }
        Ok(())
    }

    /// Critical criteria are stored weightless and without a deficiency tier.
    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.is_critical {
            self.weight = 0.0;
            self.deficiency = None;
        }
        self
    }
}

/// A business line with its own rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Direction {
    pub id: DirectionId,
    pub name: String,
    /// Whether an audio recording is mandatory for evaluations in this direction.
    #[serde(default)]
    pub has_file_upload: bool,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

impl Direction {
    pub fn new(id: DirectionId, name: impl Into<String>, has_file_upload: bool) -> Self {
        Self {
            id,
            name: name.into(),
            has_file_upload,
            criteria: Vec::new(),
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(Criterion::scored_weight).sum()
    }

    pub fn has_weighted_criteria(&self) -> bool {
        self.criteria.iter().any(|criterion| !criterion.is_critical)
    }

    pub fn add_criterion(&mut self, criterion: Criterion) -> Result<(), CatalogError> {
        criterion.check_shape()?;
        let criterion = criterion.normalized();
        let total = self.total_weight() + criterion.scored_weight();
        if total > TOTAL_WEIGHT + WEIGHT_EPSILON {
            return Err(CatalogError::WeightOverflow {
                direction: self.name.clone(),
                total,
            });
        }
        self.criteria.push(criterion);
        Ok(())
    }

    pub fn update_criterion(
        &mut self,
        index: usize,
        criterion: Criterion,
    ) -> Result<(), CatalogError> {
        let current = self
            .criteria
            .get(index)
            .ok_or(CatalogError::UnknownCriterion { index })?;
        criterion.check_shape()?;
        let criterion = criterion.normalized();
        let total = self.total_weight() - current.scored_weight() + criterion.scored_weight();
        if total > TOTAL_WEIGHT + WEIGHT_EPSILON {
            return Err(CatalogError::WeightOverflow {
                direction: self.name.clone(),
                total,
            });
        }
        self.criteria[index] = criterion;
        Ok(())
    }

    pub fn remove_criterion(&mut self, index: usize) -> Result<Criterion, CatalogError> {
        if index >= self.criteria.len() {
            return Err(CatalogError::UnknownCriterion { index });
        }
        Ok(self.criteria.remove(index))
    }

    /// Save-time check: weighted criteria must total exactly 100.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::MissingDirectionName);
        }
        for criterion in &self.criteria {
            criterion.check_shape()?;
            if criterion.is_critical && criterion.weight != 0.0 {
                return Err(CatalogError::WeightedCritical {
                    criterion: criterion.name.clone(),
                });
            }
        }
        if self.has_weighted_criteria() {
            let total = self.total_weight();
            if (total - TOTAL_WEIGHT).abs() > WEIGHT_EPSILON {
                return Err(CatalogError::WeightTotal {
                    direction: self.name.clone(),
                    total,
                });
            }
        }
        Ok(())
    }
}

/// Admin-configured collection of directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriterionCatalog {
    directions: Vec<Direction>,
}

impl CriterionCatalog {
    pub fn new(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn direction(&self, id: DirectionId) -> Option<&Direction> {
        self.directions.iter().find(|direction| direction.id == id)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        for (position, direction) in self.directions.iter().enumerate() {
            if self.directions[..position]
                .iter()
                .any(|earlier| earlier.id == direction.id)
            {
                return Err(CatalogError::DuplicateDirection { id: direction.id });
            }
            direction.validate()?;
        }
        Ok(())
    }
}

/// Catalog invariant violations; these block a save.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("criterion name is required")]
    MissingName,
    #[error("direction name is required")]
    MissingDirectionName,
    #[error("criterion '{criterion}' needs a positive weight")]
    NonPositiveWeight { criterion: String },
    #[error("critical criterion '{criterion}' cannot carry weight")]
    WeightedCritical { criterion: String },
    #[error(
        "deficiency weight {deficiency} for '{criterion}' must be above 0 and at most {weight}"
    )]
    DeficiencyOutOfRange {
        criterion: String,
        deficiency: f64,
        weight: f64,
    },
    #[error("non-critical weights in '{direction}' would reach {total}, above 100")]
    WeightOverflow { direction: String, total: f64 },
    #[error("non-critical weights in '{direction}' must total 100, found {total}")]
    WeightTotal { direction: String, total: f64 },
    #[error("no criterion at position {index}")]
    UnknownCriterion { index: usize },
    #[error("direction {id} is listed more than once")]
    DuplicateDirection { id: DirectionId },
}
