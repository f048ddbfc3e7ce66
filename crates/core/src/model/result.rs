use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::catalog::AgeBand;
use crate::model::ids::{PatientId, ResultId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("total questions must be positive")]
    ZeroTotal,

    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

fn check_counts(score: u32, total_questions: u32) -> Result<(), ResultError> {
    if total_questions == 0 {
        return Err(ResultError::ZeroTotal);
    }
    if score > total_questions {
        return Err(ResultError::ScoreExceedsTotal {
            score,
            total: total_questions,
        });
    }
    Ok(())
}

/// `100 * score / total`, or 0 for an empty session.
#[must_use]
pub fn percentage_of(score: u32, total_questions: u32) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    100.0 * f64::from(score) / f64::from(total_questions)
}

/// A completed session's outcome before storage assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDraft {
    patient_id: PatientId,
    band: AgeBand,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl ResultDraft {
    /// # Errors
    ///
    /// Returns `ResultError` if the counts are inconsistent.
    pub fn new(
        patient_id: PatientId,
        band: AgeBand,
        score: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        check_counts(score, total_questions)?;
        Ok(Self {
            patient_id,
            band,
            score,
            total_questions,
            completed_at,
        })
    }

    #[must_use]
    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    #[must_use]
    pub fn band(&self) -> AgeBand {
        self.band
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_of(self.score, self.total_questions)
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn assign_id(self, id: ResultId) -> AssessmentResult {
        AssessmentResult {
            id,
            patient_id: self.patient_id,
            band: self.band,
            score: self.score,
            total_questions: self.total_questions,
            completed_at: self.completed_at,
        }
    }
}

/// Persisted outcome of one assessment session. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    id: ResultId,
    patient_id: PatientId,
    band: AgeBand,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
}

impl AssessmentResult {
    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if the stored counts are inconsistent.
    pub fn from_persisted(
        id: ResultId,
        patient_id: PatientId,
        band: AgeBand,
        score: u32,
        total_questions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        Ok(ResultDraft::new(patient_id, band, score, total_questions, completed_at)?.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    /// Age band tag the session was run against.
    #[must_use]
    pub fn band(&self) -> AgeBand {
        self.band
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage_of(self.score, self.total_questions)
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn percentage_is_derived_from_counts() {
        let draft = ResultDraft::new(PatientId::new(1), AgeBand::Adult, 4, 5, fixed_now()).unwrap();
        assert_eq!(draft.percentage(), 80.0);
        let result = draft.assign_id(ResultId::new(9));
        assert_eq!(result.id(), ResultId::new(9));
        assert_eq!(result.percentage(), 80.0);
    }

    #[test]
    fn inconsistent_counts_rejected() {
        let err = ResultDraft::new(PatientId::new(1), AgeBand::Adult, 6, 5, fixed_now()).unwrap_err();
        assert_eq!(err, ResultError::ScoreExceedsTotal { score: 6, total: 5 });

        let err = AssessmentResult::from_persisted(
            ResultId::new(1),
            PatientId::new(1),
            AgeBand::Youth,
            0,
            0,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ResultError::ZeroTotal);
    }

    #[test]
    fn percentage_of_zero_total_is_zero() {
        assert_eq!(percentage_of(0, 0), 0.0);
        assert_eq!(percentage_of(1, 3), 100.0 / 3.0);
    }
}
