use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::PatientId;

pub const MIN_NAME_LEN: usize = 2;
pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 149;

//
// ─── FIELD ERRORS ─────────────────────────────────────────────────────────────
//

/// Field-level intake errors. Every failing field is reported at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", field_messages(.name, .age))]
pub struct SubjectErrors {
    pub name: Option<&'static str>,
    pub age: Option<&'static str>,
}

impl SubjectErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none()
    }
}

#[allow(clippy::ref_option)]
fn field_messages(name: &Option<&'static str>, age: &Option<&'static str>) -> String {
    [("name", *name), ("age", *age)]
        .into_iter()
        .filter_map(|(field, msg)| msg.map(|m| format!("{field}: {m}")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Leading whole number of `raw`, ignoring anything after it ("36 years" is 36).
fn leading_age(raw: &str) -> Option<u8> {
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

//
// ─── DRAFT / VALIDATED SUBJECT ────────────────────────────────────────────────
//

/// Raw intake as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectDraft {
    pub name: String,
    pub age: String,
}

impl SubjectDraft {
    #[must_use]
    pub fn new(name: impl Into<String>, age: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: age.into(),
        }
    }

    /// Validate name and age.
    ///
    /// # Errors
    ///
    /// Returns `SubjectErrors` listing every invalid field.
    pub fn validate(&self) -> Result<Subject, SubjectErrors> {
        let mut errors = SubjectErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.name = Some("Name is required");
        } else if name.chars().count() < MIN_NAME_LEN {
            errors.name = Some("Name must be at least 2 characters");
        }

        let age_raw = self.age.trim();
        let mut age = None;
        if age_raw.is_empty() {
            errors.age = Some("Age is required");
        } else {
            match leading_age(age_raw) {
                Some(v) if (MIN_AGE..=MAX_AGE).contains(&v) => age = Some(v),
                _ => errors.age = Some("Please enter a valid age (1-149)"),
            }
        }

        match (errors.is_empty(), age) {
            (true, Some(age)) => Ok(Subject {
                name: name.to_owned(),
                age,
            }),
            _ => Err(errors),
        }
    }
}

/// Validated subject identity supplied at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub age: u8,
}

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: u8,
    pub registered_at: DateTime<Utc>,
}

impl Patient {
    #[must_use]
    pub fn from_subject(id: PatientId, subject: &Subject, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: subject.name.clone(),
            age: subject.age,
            registered_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_subject_is_trimmed() {
        let subject = SubjectDraft::new("  Ada Lovelace ", " 36").validate().unwrap();
        assert_eq!(subject.name, "Ada Lovelace");
        assert_eq!(subject.age, 36);
    }

    #[test]
    fn missing_fields_reported_together() {
        let err = SubjectDraft::new(" ", "").validate().unwrap_err();
        assert_eq!(err.name, Some("Name is required"));
        assert_eq!(err.age, Some("Age is required"));
        assert_eq!(
            err.to_string(),
            "name: Name is required; age: Age is required"
        );
    }

    #[test]
    fn short_name_rejected() {
        let err = SubjectDraft::new("A", "30").validate().unwrap_err();
        assert_eq!(err.name, Some("Name must be at least 2 characters"));
        assert!(err.age.is_none());
    }

    #[test]
    fn age_bounds_enforced() {
        for bad in ["0", "150", "-3", "abc", "200"] {
            let err = SubjectDraft::new("Bo", bad).validate().unwrap_err();
            assert_eq!(err.age, Some("Please enter a valid age (1-149)"), "age {bad}");
        }
        assert!(SubjectDraft::new("Bo", "1").validate().is_ok());
        assert!(SubjectDraft::new("Bo", "149").validate().is_ok());
    }

    #[test]
    fn age_reads_the_leading_number() {
        assert_eq!(SubjectDraft::new("Bo", "36 years").validate().unwrap().age, 36);
        assert_eq!(SubjectDraft::new("Bo", "+7").validate().unwrap().age, 7);
        assert_eq!(SubjectDraft::new("Bo", "4.5").validate().unwrap().age, 4);
        for bad in ["years 36", "1000 days", "."] {
            let err = SubjectDraft::new("Bo", bad).validate().unwrap_err();
            assert_eq!(err.age, Some("Please enter a valid age (1-149)"), "age {bad}");
        }
    }
}
