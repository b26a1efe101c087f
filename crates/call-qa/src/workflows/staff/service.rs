use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use super::record::{NewStaff, StaffError, StaffRecord, StatusChange};
use super::repository::{RepositoryError, StaffRepository};
use super::{Actor, StaffId, StaffRole};

static STAFF_SEQUENCE: AtomicU64 = AtomicU64::new(1000);

pub struct StaffService<R> {
    repository: Arc<R>,
}

impl<R> StaffService<R>
where
    R: StaffRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(
        &self,
        creator: Actor,
        draft: NewStaff,
    ) -> Result<StaffRecord, StaffServiceError> {
        let id = StaffId(STAFF_SEQUENCE.fetch_add(1, Ordering::Relaxed));
        let record = StaffRecord::create(id, creator, draft)?;
        let stored = self.repository.insert(record)?;

        info!(
            staff_id = %stored.id,
            creator = %creator.user_id,
            role = stored.role.label(),
            rate = stored.rate,
            "staff account created"
        );
        Ok(stored)
    }

    /// Change an account's employment status. Supervisors manage their own team only.
    pub fn change_status(
        &self,
        actor: Actor,
        id: StaffId,
        change: StatusChange,
    ) -> Result<StaffRecord, StaffServiceError> {
        let current = self.get(id)?;
        match actor.role {
            StaffRole::Admin => {}
            StaffRole::Supervisor if current.supervisor_id == Some(actor.user_id) => {}
            other => return Err(StaffError::Forbidden(other).into()),
        }

        let mut record = current.clone();
        record.apply_status(change)?;
        let record = self
            .repository
            .replace(&current, record)
            .map_err(|err| match err {
                RepositoryError::Stale => {
                    warn!(staff_id = %id, "staff account changed concurrently");
                    StaffServiceError::Modified(id)
                }
                other => other.into(),
            })?;

        info!(
            staff_id = %record.id,
            actor = %actor.user_id,
            from = current.status.label(),
            to = record.status.label(),
            "employment status changed"
        );
        Ok(record)
    }

    pub fn get(&self, id: StaffId) -> Result<StaffRecord, StaffServiceError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Operators reporting to a supervisor, by name.
    pub fn team(&self, supervisor_id: StaffId) -> Result<Vec<StaffRecord>, StaffServiceError> {
        let mut team: Vec<StaffRecord> = self
            .repository
            .list()?
            .into_iter()
            .filter(|record| {
                record.role == StaffRole::Operator && record.supervisor_id == Some(supervisor_id)
            })
            .collect();
        team.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(team)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StaffServiceError {
    #[error(transparent)]
    Staff(#[from] StaffError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("staff account {0} changed while the update was applied; reload and retry")]
    Modified(StaffId),
}
