use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::evaluation::{
    evaluation_router, AudioReference, Criterion, CriterionCatalog, Direction, DirectionId,
    EvaluationId, EvaluationPolicy, EvaluationRecord, EvaluationRepository, EvaluationService,
    finals_in_month, EvaluationStatus, EvaluationSubmission, RepositoryError, ScoreSheet, Verdict,
};
use crate::workflows::staff::{Actor, StaffId, StaffRole};

pub(super) const SALES: DirectionId = DirectionId(1);
pub(super) const SUPPORT: DirectionId = DirectionId(2);

pub(super) const OPERATOR: StaffId = StaffId(501);
pub(super) const EVALUATOR: StaffId = StaffId(11);

/// 50 / 30 (deficiency 10) / 20, no recording required.
pub(super) fn sales_direction() -> Direction {
    let mut direction = Direction::new(SALES, "Sales", false);
    direction.criteria = vec![
        Criterion::weighted("Greeting", 50.0),
        Criterion::weighted("Needs discovery", 30.0).with_deficiency(10.0, "asked only one question"),
        Criterion::weighted("Closing", 20.0),
    ];
    direction
}

/// One critical gate plus 60 / 40, recording required.
pub(super) fn support_direction() -> Direction {
    let mut direction = Direction::new(SUPPORT, "Support", true);
    direction.criteria = vec![
        Criterion::critical("Rudeness"),
        Criterion::weighted("Resolution", 60.0),
        Criterion::weighted("Tone", 40.0),
    ];
    direction
}

pub(super) fn catalog() -> CriterionCatalog {
    CriterionCatalog::new(vec![sales_direction(), support_direction()])
}

pub(super) fn submission(direction_id: DirectionId, sheet: ScoreSheet) -> EvaluationSubmission {
    EvaluationSubmission {
        operator_id: OPERATOR,
        evaluator_id: EVALUATOR,
        direction_id,
        phone_number: "+7 (701) 555-12-34".to_string(),
        appeal_date: None,
        assigned_month: "2025-03".to_string(),
        is_draft: false,
        sheet,
        audio: None,
        expected_duration: None,
    }
}

pub(super) fn sales_submission(verdicts: Vec<Verdict>) -> EvaluationSubmission {
    submission(SALES, ScoreSheet::new(verdicts))
}

pub(super) fn support_submission(verdicts: Vec<Verdict>) -> EvaluationSubmission {
    let mut submission = submission(SUPPORT, ScoreSheet::new(verdicts));
    submission.audio = Some(recording(Some(118.0)));
    submission
}

pub(super) fn recording(duration_seconds: Option<f64>) -> AudioReference {
    AudioReference {
        storage_key: "uploads/2025-03/call-0042.mp3".to_string(),
        duration_seconds,
    }
}

pub(super) fn supervisor() -> Actor {
    Actor::new(StaffId(7), StaffRole::Supervisor)
}

pub(super) fn admin() -> Actor {
    Actor::new(StaffId(1), StaffRole::Admin)
}

pub(super) fn build_service() -> (EvaluationService<MemoryRepository>, Arc<MemoryRepository>) {
    build_service_with(EvaluationPolicy::default())
}

pub(super) fn build_service_with(
    policy: EvaluationPolicy,
) -> (EvaluationService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service =
        EvaluationService::new(repository.clone(), catalog(), policy).expect("catalog is valid");
    (service, repository)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<EvaluationId, EvaluationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }

    pub(super) fn finals(&self) -> Vec<EvaluationRecord> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .filter(|record| record.status == EvaluationStatus::Final)
            .cloned()
            .collect()
    }
}

impl EvaluationRepository for MemoryRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        current: &EvaluationRecord,
        next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&current.id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored != current => Err(RepositoryError::Stale),
            Some(_) => {
                guard.insert(next.id.clone(), next.clone());
                Ok(next)
            }
        }
    }

    fn supersede(
        &self,
        current: &EvaluationRecord,
        superseded: EvaluationRecord,
        successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.get(&current.id) != Some(current) {
            return Err(RepositoryError::Stale);
        }
        if guard.contains_key(&successor.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(superseded.id.clone(), superseded);
        guard.insert(successor.id.clone(), successor.clone());
        Ok(successor)
    }

    fn store_final(
        &self,
        record: EvaluationRecord,
        replacing: Option<&EvaluationRecord>,
        limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match replacing {
            Some(draft) if guard.get(&draft.id) != Some(draft) => {
                return Err(RepositoryError::Stale)
            }
            None if guard.contains_key(&record.id) => return Err(RepositoryError::Conflict),
            _ => {}
        }
        if finals_in_month(guard.values(), &record) >= limit {
            return Err(RepositoryError::LimitReached { limit });
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, current: &EvaluationRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&current.id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored != current => Err(RepositoryError::Stale),
            Some(_) => {
                guard.remove(&current.id);
                Ok(())
            }
        }
    }

    fn list_for_operator(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.operator_id == operator_id && record.assigned_month == month)
            .cloned()
            .collect())
    }
}

/// Holds the first `gated` fetches at a barrier so concurrent callers read the same state.
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

impl EvaluationRepository for GatedRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn replace(
        &self,
        current: &EvaluationRecord,
        next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.replace(current, next)
    }

    fn supersede(
        &self,
        current: &EvaluationRecord,
        superseded: EvaluationRecord,
        successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.supersede(current, superseded, successor)
    }

    fn store_final(
        &self,
        record: EvaluationRecord,
        replacing: Option<&EvaluationRecord>,
        limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.store_final(record, replacing, limit)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let record = self.inner.fetch(id)?;
        let gate = self
            .gated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if gate {
            self.barrier.wait();
        }
        Ok(record)
    }

    fn remove(&self, current: &EvaluationRecord) -> Result<(), RepositoryError> {
        self.inner.remove(current)
    }

    fn list_for_operator(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        self.inner.list_for_operator(operator_id, month)
    }
}

/// Reads and plain inserts work; lineage writes fail.
pub(super) struct FlakySupersedeRepository {
    pub(super) inner: MemoryRepository,
}

impl EvaluationRepository for FlakySupersedeRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.insert(record)
    }

    fn replace(
        &self,
        current: &EvaluationRecord,
        next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.replace(current, next)
    }

    fn supersede(
        &self,
        _current: &EvaluationRecord,
        _superseded: EvaluationRecord,
        _successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("flaky".to_string()))
    }

    fn store_final(
        &self,
        record: EvaluationRecord,
        replacing: Option<&EvaluationRecord>,
        limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError> {
        self.inner.store_final(record, replacing, limit)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn remove(&self, current: &EvaluationRecord) -> Result<(), RepositoryError> {
        self.inner.remove(current)
    }

    fn list_for_operator(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        self.inner.list_for_operator(operator_id, month)
    }
}

pub(super) struct ConflictRepository;

impl EvaluationRepository for ConflictRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn replace(
        &self,
        _current: &EvaluationRecord,
        _next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn supersede(
        &self,
        _current: &EvaluationRecord,
        _superseded: EvaluationRecord,
        _successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn store_final(
        &self,
        _record: EvaluationRecord,
        _replacing: Option<&EvaluationRecord>,
        _limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Ok(None)
    }

    fn remove(&self, _current: &EvaluationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn list_for_operator(
        &self,
        _operator_id: StaffId,
        _month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl EvaluationRepository for UnavailableRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(
        &self,
        _current: &EvaluationRecord,
        _next: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn supersede(
        &self,
        _current: &EvaluationRecord,
        _superseded: EvaluationRecord,
        _successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn store_final(
        &self,
        _record: EvaluationRecord,
        _replacing: Option<&EvaluationRecord>,
        _limit: usize,
    ) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove(&self, _current: &EvaluationRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_for_operator(
        &self,
        _operator_id: StaffId,
        _month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn service_over<R>(repository: R) -> Arc<EvaluationService<R>>
where
    R: EvaluationRepository + 'static,
{
    Arc::new(
        EvaluationService::new(Arc::new(repository), catalog(), EvaluationPolicy::default())
            .expect("catalog is valid"),
    )
}

pub(super) fn router_with_service(service: EvaluationService<MemoryRepository>) -> axum::Router {
    evaluation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
