use super::record::{EvaluationId, EvaluationRecord, EvaluationStatus};
use crate::workflows::staff::StaffId;

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Writes that depend on something read earlier take the record as it was read
/// (`current`) and fail with [`RepositoryError::Stale`] when the stored record no
/// longer matches it. Each method applies all of its writes or none of them.
pub trait EvaluationRepository: Send + Sync {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError>;
    /// Swap `current` for `next`, which must carry the same id.
    fn replace(
        &self,
        current: &EvaluationRecord,
        next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError>;
    /// Swap `current` for its `superseded` form and store `successor` in one step.
    fn supersede(
        &self,
        current: &EvaluationRecord,
        superseded: EvaluationRecord,
        successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError>;
    /// Store a final record, in place of the draft `replacing` when given, unless the
    /// operator already has `limit` final records in the record's month.
    fn store_final(
        &self,
        record: EvaluationRecord,
        replacing: Option<&EvaluationRecord>,
        limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError>;
    fn remove(&self, current: &EvaluationRecord) -> Result<(), RepositoryError>;
    /// Every version stored for an operator in an assigned month.
    fn list_for_operator(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError>;
}

/// Final records other than `record` counted against its operator and month.
pub fn finals_in_month<'a>(
    stored: impl IntoIterator<Item = &'a EvaluationRecord>,
    record: &EvaluationRecord,
) -> usize {
    stored
        .into_iter()
        .filter(|other| {
            other.id != record.id
                && other.status == EvaluationStatus::Final
                && other.operator_id == record.operator_id
                && other.assigned_month == record.assigned_month
        })
        .count()
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed since it was read")]
    Stale,
    #[error("monthly limit of {limit} final records reached")]
    LimitReached { limit: usize },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
