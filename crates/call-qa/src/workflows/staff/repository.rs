use super::record::StaffRecord;
use super::StaffId;

/// Storage abstraction for staff accounts.
pub trait StaffRepository: Send + Sync {
    fn insert(&self, record: StaffRecord) -> Result<StaffRecord, RepositoryError>;
    /// Swap `current` for `next`; `Stale` when the stored account no longer equals `current`.
    fn replace(
        &self,
        current: &StaffRecord,
        next: StaffRecord,
    ) -> Result<StaffRecord, RepositoryError>;
    fn fetch(&self, id: StaffId) -> Result<Option<StaffRecord>, RepositoryError>;
    fn list(&self) -> Result<Vec<StaffRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("account already exists")]
    Conflict,
    #[error("account not found")]
    NotFound,
    #[error("account changed since it was read")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
