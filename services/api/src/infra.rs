use call_qa::workflows::evaluation::{
    finals_in_month, normalize_month, Criterion, CriterionCatalog, Direction, DirectionId,
    EvaluationId, EvaluationRecord, EvaluationRepository, RepositoryError,
};
use call_qa::workflows::staff::{self, StaffId, StaffRecord, StaffRepository};
use call_qa::workflows::tasks::{self, Task, TaskId, TaskRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, String> {
    mutex
        .lock()
        .map_err(|_| "in-memory store mutex poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationRepository {
    records: Arc<Mutex<HashMap<EvaluationId, EvaluationRecord>>>,
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
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
        let mut guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        unchanged(&guard, current)?;
        guard.insert(next.id.clone(), next.clone());
        Ok(next)
    }

    fn supersede(
        &self,
        current: &EvaluationRecord,
        superseded: EvaluationRecord,
        successor: EvaluationRecord,
    ) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        unchanged(&guard, current)?;
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
        let mut guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        match replacing {
            Some(draft) => unchanged(&guard, draft)?,
            None if guard.contains_key(&record.id) => return Err(RepositoryError::Conflict),
            None => {}
        }
        if finals_in_month(guard.values(), &record) >= limit {
            return Err(RepositoryError::LimitReached { limit });
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, current: &EvaluationRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        unchanged(&guard, current)?;
        guard.remove(&current.id);
        Ok(())
    }

    fn list_for_operator(
        &self,
        operator_id: StaffId,
        month: &str,
    ) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        let guard = lock(&self.records).map_err(RepositoryError::Unavailable)?;
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| record.operator_id == operator_id && record.assigned_month == month)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

fn unchanged(
    records: &HashMap<EvaluationId, EvaluationRecord>,
    current: &EvaluationRecord,
) -> Result<(), RepositoryError> {
    match records.get(&current.id) {
        None => Err(RepositoryError::NotFound),
        Some(stored) if stored != current => Err(RepositoryError::Stale),
        Some(_) => Ok(()),
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryTaskRepository {
    tasks: Arc<Mutex<HashMap<TaskId, Task>>>,
}

impl TaskRepository for InMemoryTaskRepository {
    fn insert(&self, task: Task) -> Result<Task, tasks::RepositoryError> {
        let mut guard = lock(&self.tasks).map_err(tasks::RepositoryError::Unavailable)?;
        if guard.contains_key(&task.id) {
            return Err(tasks::RepositoryError::Conflict);
        }
        guard.insert(task.id, task.clone());
        Ok(task)
    }

    fn replace(&self, current: &Task, next: Task) -> Result<Task, tasks::RepositoryError> {
        let mut guard = lock(&self.tasks).map_err(tasks::RepositoryError::Unavailable)?;
        match guard.get(&current.id) {
            None => Err(tasks::RepositoryError::NotFound),
            Some(stored) if stored != current => Err(tasks::RepositoryError::Stale),
            Some(_) => {
                guard.insert(next.id, next.clone());
                Ok(next)
            }
        }
    }

    fn fetch(&self, id: TaskId) -> Result<Option<Task>, tasks::RepositoryError> {
        let guard = lock(&self.tasks).map_err(tasks::RepositoryError::Unavailable)?;
        Ok(guard.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Task>, tasks::RepositoryError> {
        let guard = lock(&self.tasks).map_err(tasks::RepositoryError::Unavailable)?;
        Ok(guard.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryStaffRepository {
    records: Arc<Mutex<HashMap<StaffId, StaffRecord>>>,
}

impl StaffRepository for InMemoryStaffRepository {
    fn insert(&self, record: StaffRecord) -> Result<StaffRecord, staff::RepositoryError> {
        let mut guard = lock(&self.records).map_err(staff::RepositoryError::Unavailable)?;
        if guard.contains_key(&record.id) {
            return Err(staff::RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn replace(
        &self,
        current: &StaffRecord,
        next: StaffRecord,
    ) -> Result<StaffRecord, staff::RepositoryError> {
        let mut guard = lock(&self.records).map_err(staff::RepositoryError::Unavailable)?;
        match guard.get(&current.id) {
            None => Err(staff::RepositoryError::NotFound),
            Some(stored) if stored != current => Err(staff::RepositoryError::Stale),
            Some(_) => {
                guard.insert(next.id, next.clone());
                Ok(next)
            }
        }
    }

    fn fetch(&self, id: StaffId) -> Result<Option<StaffRecord>, staff::RepositoryError> {
        let guard = lock(&self.records).map_err(staff::RepositoryError::Unavailable)?;
        Ok(guard.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<StaffRecord>, staff::RepositoryError> {
        let guard = lock(&self.records).map_err(staff::RepositoryError::Unavailable)?;
        Ok(guard.values().cloned().collect())
    }
}

/// Directions the service starts with until an admin saves a catalog.
pub(crate) fn default_catalog() -> CriterionCatalog {
    let mut sales = Direction::new(DirectionId(1), "Sales", false);
    sales.criteria = vec![
        Criterion::weighted("Greeting and introduction", 15.0),
        Criterion::weighted("Needs discovery", 30.0)
            .with_deficiency(15.0, "asked a single qualifying question"),
        Criterion::weighted("Product presentation", 30.0)
            .with_deficiency(10.0, "benefits not tied to the customer's needs"),
        Criterion::weighted("Closing", 25.0),
    ];

    let mut support = Direction::new(DirectionId(2), "Support", true);
    support.criteria = vec![
        Criterion::critical("Rudeness towards the customer")
            .with_guidance("raised voice, sarcasm, or hanging up"),
        Criterion::weighted("Identity verification", 20.0),
        Criterion::weighted("Issue resolution", 50.0)
            .with_deficiency(20.0, "resolved after an avoidable transfer"),
        Criterion::weighted("Tone and empathy", 30.0),
    ];

    CriterionCatalog::new(vec![sales, support])
}

pub(crate) fn parse_month(raw: &str) -> Result<String, String> {
    normalize_month(raw).map_err(|err| format!("failed to parse '{raw}' as YYYY-MM ({err})"))
}
