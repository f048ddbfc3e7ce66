use assess_core::model::{AgeBand, AssessmentResult, Patient, PatientId, ResultId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn patient_id_from_i64(v: i64) -> Result<PatientId, StorageError> {
    Ok(PatientId::new(i64_to_u64("patient_id", v)?))
}

pub(crate) fn result_id_from_i64(v: i64) -> Result<ResultId, StorageError> {
    Ok(ResultId::new(i64_to_u64("result_id", v)?))
}

/// Maps `id, name, age, registered_at` (optionally aliased with a `patient_` prefix).
pub(crate) fn map_patient_row(row: &SqliteRow, prefix: &str) -> Result<Patient, StorageError> {
    let col = |name: &str| format!("{prefix}{name}");
    let age: i64 = row.try_get(col("age").as_str()).map_err(ser)?;
    Ok(Patient {
        id: patient_id_from_i64(row.try_get::<i64, _>(col("id").as_str()).map_err(ser)?)?,
        name: row.try_get(col("name").as_str()).map_err(ser)?,
        age: u8::try_from(age)
            .map_err(|_| StorageError::Serialization(format!("invalid age: {age}")))?,
        registered_at: row.try_get(col("registered_at").as_str()).map_err(ser)?,
    })
}

/// Maps a result row; returns `None` when the left-joined result columns are null.
pub(crate) fn map_result_row(row: &SqliteRow) -> Result<Option<AssessmentResult>, StorageError> {
    let Some(id) = row.try_get::<Option<i64>, _>("result_id").map_err(ser)? else {
        return Ok(None);
    };

    let band_raw: String = row.try_get("assessment_type").map_err(ser)?;
    let band = band_raw.parse::<AgeBand>().map_err(ser)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;

    AssessmentResult::from_persisted(
        result_id_from_i64(id)?,
        patient_id_from_i64(row.try_get::<i64, _>("result_patient_id").map_err(ser)?)?,
        band,
        score,
        total,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map(Some)
    .map_err(ser)
}
