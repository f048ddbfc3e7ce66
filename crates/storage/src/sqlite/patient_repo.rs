use assess_core::model::{PatientId, Subject};
use chrono::{DateTime, Utc};

use super::SqliteRepository;
use super::mapping::{conn, patient_id_from_i64};
use crate::repository::{PatientRepository, StorageError};

#[async_trait::async_trait]
impl PatientRepository for SqliteRepository {
    async fn create_patient(
        &self,
        subject: &Subject,
        registered_at: DateTime<Utc>,
    ) -> Result<PatientId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO patients (name, age, registered_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(&subject.name)
        .bind(i64::from(subject.age))
        .bind(registered_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        patient_id_from_i64(res.last_insert_rowid())
    }
}
