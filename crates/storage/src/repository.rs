use async_trait::async_trait;
use assess_core::model::{AssessmentResult, Patient, PatientId, ResultDraft, ResultId, Subject};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One row of the bulk export read: a patient joined with one of their results.
///
/// Patients without results appear exactly once with `result: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientResultRow {
    pub patient: Patient,
    pub result: Option<AssessmentResult>,
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Register a subject as a new patient.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the patient cannot be stored.
    async fn create_patient(
        &self,
        subject: &Subject,
        registered_at: DateTime<Utc>,
    ) -> Result<PatientId, StorageError>;
}

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Persist a completed session result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the patient does not exist, or other storage errors.
    async fn save_result(&self, draft: &ResultDraft) -> Result<ResultId, StorageError>;

    /// Every patient with each of their results, newest completion first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if rows cannot be read or rehydrated.
    async fn list_results_with_patients(&self) -> Result<Vec<PatientResultRow>, StorageError>;

    /// Remove a single result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no result has this id.
    async fn delete_result(&self, id: ResultId) -> Result<(), StorageError>;
}

/// Orders rows by completion descending, rows without results last.
pub(crate) fn sort_rows(rows: &mut [PatientResultRow]) {
    rows.sort_by(|a, b| {
        let a_key = a.result.as_ref().map(|r| (r.completed_at(), r.id()));
        let b_key = b.result.as_ref().map(|r| (r.completed_at(), r.id()));
        match (a_key, b_key) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.patient.id.cmp(&b.patient.id),
        }
    });
}

#[derive(Default)]
struct InMemoryState {
    next_patient: u64,
    next_result: u64,
    patients: BTreeMap<PatientId, Patient>,
    results: BTreeMap<ResultId, AssessmentResult>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl PatientRepository for InMemoryRepository {
    async fn create_patient(
        &self,
        subject: &Subject,
        registered_at: DateTime<Utc>,
    ) -> Result<PatientId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_patient += 1;
        let id = PatientId::new(guard.next_patient);
        guard
            .patients
            .insert(id, Patient::from_subject(id, subject, registered_at));
        Ok(id)
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn save_result(&self, draft: &ResultDraft) -> Result<ResultId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.patients.contains_key(&draft.patient_id()) {
            return Err(StorageError::NotFound);
        }
        guard.next_result += 1;
        let id = ResultId::new(guard.next_result);
        guard.results.insert(id, draft.clone().assign_id(id));
        Ok(id)
    }

    async fn list_results_with_patients(&self) -> Result<Vec<PatientResultRow>, StorageError> {
        let guard = self.lock()?;
        let mut rows = Vec::with_capacity(guard.results.len() + guard.patients.len());
        for patient in guard.patients.values() {
            let mut any = false;
            for result in guard
                .results
                .values()
                .filter(|r| r.patient_id() == patient.id)
            {
                any = true;
                rows.push(PatientResultRow {
                    patient: patient.clone(),
                    result: Some(result.clone()),
                });
            }
            if !any {
                rows.push(PatientResultRow {
                    patient: patient.clone(),
                    result: None,
                });
            }
        }
        sort_rows(&mut rows);
        Ok(rows)
    }

    async fn delete_result(&self, id: ResultId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .results
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub patients: Arc<dyn PatientRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let patients: Arc<dyn PatientRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Self { patients, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::AgeBand;
    use assess_core::time::fixed_now;
    use chrono::Duration;

    fn subject(name: &str) -> Subject {
        Subject {
            name: name.into(),
            age: 70,
        }
    }

    #[tokio::test]
    async fn registered_patient_is_listed_without_results() {
        let repo = InMemoryRepository::new();
        let first = repo.create_patient(&subject("Margaret"), fixed_now()).await.unwrap();
        let second = repo.create_patient(&subject("Robert"), fixed_now()).await.unwrap();
        assert_ne!(first, second);

        let rows = repo.list_results_with_patients().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].patient.id, first);
        assert_eq!(rows[0].patient.name, "Margaret");
        assert_eq!(rows[0].patient.registered_at, fixed_now());
        assert!(rows.iter().all(|row| row.result.is_none()));
    }

    #[tokio::test]
    async fn save_requires_existing_patient() {
        let repo = InMemoryRepository::new();
        let draft =
            ResultDraft::new(PatientId::new(5), AgeBand::Adult, 3, 5, fixed_now()).unwrap();
        assert!(matches!(
            repo.save_result(&draft).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_includes_unassessed_patients_last() {
        let repo = InMemoryRepository::new();
        let a = repo.create_patient(&subject("Ann"), fixed_now()).await.unwrap();
        let b = repo.create_patient(&subject("Bob"), fixed_now()).await.unwrap();
        let _c = repo.create_patient(&subject("Cy"), fixed_now()).await.unwrap();

        let older = ResultDraft::new(a, AgeBand::Adult, 3, 5, fixed_now()).unwrap();
        let newer =
            ResultDraft::new(b, AgeBand::Adult, 4, 5, fixed_now() + Duration::hours(1)).unwrap();
        repo.save_result(&older).await.unwrap();
        repo.save_result(&newer).await.unwrap();

        let rows = repo.list_results_with_patients().await.unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.patient.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Ann", "Cy"]);
        assert!(rows[2].result.is_none());
    }

    #[tokio::test]
    async fn delete_removes_only_that_result() {
        let repo = InMemoryRepository::new();
        let a = repo.create_patient(&subject("Ann"), fixed_now()).await.unwrap();
        let first = repo
            .save_result(&ResultDraft::new(a, AgeBand::Elderly, 2, 5, fixed_now()).unwrap())
            .await
            .unwrap();
        let second = repo
            .save_result(&ResultDraft::new(a, AgeBand::Elderly, 5, 5, fixed_now()).unwrap())
            .await
            .unwrap();

        repo.delete_result(first).await.unwrap();
        let rows = repo.list_results_with_patients().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].result.as_ref().map(AssessmentResult::id), Some(second));

        assert!(matches!(
            repo.delete_result(first).await,
            Err(StorageError::NotFound)
        ));
    }
}
