use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::evaluation::DirectionId;
use crate::workflows::staff::{
    Actor, NewStaff, RepositoryError, StaffId, StaffRecord, StaffRepository, StaffRole,
    StaffService,
};

pub(super) const SUPERVISOR: Actor = Actor::new(StaffId(7), StaffRole::Supervisor);
pub(super) const OTHER_SUPERVISOR: Actor = Actor::new(StaffId(8), StaffRole::Supervisor);
pub(super) const ADMIN: Actor = Actor::new(StaffId(1), StaffRole::Admin);

pub(super) fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

pub(super) fn operator_form(name: &str) -> NewStaff {
    NewStaff {
        name: name.to_string(),
        role: StaffRole::Operator,
        rate: 1.0,
        hire_date: Some(day(1, 15)),
        birth_date: None,
        direction_id: Some(DirectionId(1)),
        supervisor_id: None,
    }
}

pub(super) fn build_service() -> (StaffService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    (StaffService::new(repository.clone()), repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<BTreeMap<StaffId, StaffRecord>>>,
}

impl StaffRepository for MemoryRepository {
    fn insert(&self, record: StaffRecord) -> Result<StaffRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        current: &StaffRecord,
        next: StaffRecord,
    ) -> Result<StaffRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&current.id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored != current => Err(RepositoryError::Stale),
            Some(_) => {
                guard.insert(next.id, next.clone());
                Ok(next)
            }
        }
    }

    fn fetch(&self, id: StaffId) -> Result<Option<StaffRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<StaffRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Holds the first `callers` fetches at a barrier so each caller acts on the same snapshot.
pub(super) struct GatedRepository {
    pub(super) inner: MemoryRepository,
    barrier: Barrier,
    gated: AtomicUsize,
}

impl GatedRepository {
    pub(super) fn new(inner: MemoryRepository, callers: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(callers),
            gated: AtomicUsize::new(callers),
        }
    }
}

impl StaffRepository for GatedRepository {
    fn insert(&self, record: StaffRecord) -> Result<StaffRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn replace(
        &self,
        current: &StaffRecord,
        next: StaffRecord,
    ) -> Result<StaffRecord, RepositoryError> {
        self.inner.replace(current, next)
    }

    fn fetch(&self, id: StaffId) -> Result<Option<StaffRecord>, RepositoryError> {
        let record = self.inner.fetch(id)?;
        if self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            self.barrier.wait();
        }
        Ok(record)
    }

    fn list(&self) -> Result<Vec<StaffRecord>, RepositoryError> {
        self.inner.list()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
