use std::collections::HashMap;
use std::sync::Arc;

use assess_core::model::ResultId;
use assess_core::trend::{self, PatientProfile, PatientTrendSummary, TrendOverview};
use storage::repository::ResultRepository;

use crate::error::TrendServiceError;

/// Read side of the dashboard: per-patient trends and headline counts.
#[derive(Clone)]
pub struct TrendService {
    results: Arc<dyn ResultRepository>,
}

impl TrendService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Summaries for every stored patient, most recently assessed first.
    ///
    /// # Errors
    ///
    /// Returns `TrendServiceError::Storage` if the bulk read fails.
    pub async fn patient_trends(&self) -> Result<Vec<PatientTrendSummary>, TrendServiceError> {
        let rows = self.results.list_results_with_patients().await?;

        let mut patients = HashMap::new();
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            patients
                .entry(row.patient.id)
                .or_insert_with(|| PatientProfile::from(&row.patient));
            if let Some(result) = row.result {
                results.push(result);
            }
        }

        let summaries = trend::analyze(&results, &patients);
        tracing::debug!(
            patients = summaries.len(),
            results = results.len(),
            "computed patient trends"
        );
        Ok(summaries)
    }

    /// # Errors
    ///
    /// Returns `TrendServiceError::Storage` if the bulk read fails.
    pub async fn overview(&self) -> Result<TrendOverview, TrendServiceError> {
        let summaries = self.patient_trends().await?;
        Ok(TrendOverview::from_summaries(&summaries))
    }

    /// Remove one result. Trends reflect the deletion on the next read.
    ///
    /// # Errors
    ///
    /// Returns `TrendServiceError::Storage` wrapping `NotFound` if the id is unknown.
    pub async fn delete_result(&self, id: ResultId) -> Result<(), TrendServiceError> {
        self.results.delete_result(id).await?;
        tracing::info!(result = %id, "assessment result deleted");
        Ok(())
    }
}
