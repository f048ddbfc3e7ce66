use assess_core::model::{ResultDraft, ResultId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_patient_row, map_result_row, result_id_from_i64};
use crate::repository::{PatientResultRow, ResultRepository, StorageError};

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn save_result(&self, draft: &ResultDraft) -> Result<ResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO assessment_results (
                    patient_id, assessment_type, score, total_questions, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_to_i64("patient_id", draft.patient_id().value())?)
        .bind(draft.band().as_str())
        .bind(i64::from(draft.score()))
        .bind(i64::from(draft.total_questions()))
        .bind(draft.completed_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StorageError::NotFound
            } else {
                conn(e)
            }
        })?;

        result_id_from_i64(res.last_insert_rowid())
    }

    async fn list_results_with_patients(&self) -> Result<Vec<PatientResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    p.id AS patient_id,
                    p.name AS patient_name,
                    p.age AS patient_age,
                    p.registered_at AS patient_registered_at,
                    r.id AS result_id,
                    r.patient_id AS result_patient_id,
                    r.assessment_type,
                    r.score,
                    r.total_questions,
                    r.completed_at
                FROM patients p
                LEFT JOIN assessment_results r ON r.patient_id = p.id
                ORDER BY r.completed_at IS NULL, r.completed_at DESC, r.id DESC, p.id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(PatientResultRow {
                patient: map_patient_row(&row, "patient_")?,
                result: map_result_row(&row)?,
            });
        }
        Ok(out)
    }

    async fn delete_result(&self, id: ResultId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM assessment_results WHERE id = ?1")
            .bind(id_to_i64("result_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
