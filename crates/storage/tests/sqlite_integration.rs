use assess_core::model::{AgeBand, PatientId, ResultDraft, Subject};
use assess_core::time::fixed_now;
use chrono::Duration;
use storage::repository::{PatientRepository, ResultRepository, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn subject(name: &str, age: u8) -> Subject {
    Subject {
        name: name.into(),
        age,
    }
}

#[tokio::test]
async fn sqlite_roundtrip_patient_and_results() {
    let repo = connect("memdb_roundtrip").await;

    let id = repo
        .create_patient(&subject("Margaret Wilson", 72), fixed_now())
        .await
        .unwrap();
    let draft = ResultDraft::new(id, AgeBand::Elderly, 3, 5, fixed_now()).unwrap();
    let result_id = repo.save_result(&draft).await.unwrap();

    let rows = repo.list_results_with_patients().await.unwrap();
    assert_eq!(rows.len(), 1);
    let patient = &rows[0].patient;
    assert_eq!(patient.id, id);
    assert_eq!(patient.name, "Margaret Wilson");
    assert_eq!(patient.age, 72);
    assert_eq!(patient.registered_at, fixed_now());
    let result = rows[0].result.as_ref().expect("joined result");
    assert_eq!(result.id(), result_id);
    assert_eq!(result.band(), AgeBand::Elderly);
    assert_eq!(result.percentage(), 60.0);
    assert_eq!(result.completed_at(), fixed_now());
}

#[tokio::test]
async fn sqlite_lists_newest_first_with_unassessed_last() {
    let repo = connect("memdb_listing").await;
    let now = fixed_now();

    let robert = repo.create_patient(&subject("Robert Chen", 45), now).await.unwrap();
    let sarah = repo.create_patient(&subject("Sarah Johnson", 68), now).await.unwrap();
    let _michael = repo
        .create_patient(&subject("Michael Torres", 35), now)
        .await
        .unwrap();

    for (patient, score, hours) in [(robert, 4, 1), (sarah, 3, 3), (robert, 5, 2)] {
        let draft =
            ResultDraft::new(patient, AgeBand::Adult, score, 5, now + Duration::hours(hours))
                .unwrap();
        repo.save_result(&draft).await.unwrap();
    }

    let rows = repo.list_results_with_patients().await.unwrap();
    let shape: Vec<(&str, Option<u32>)> = rows
        .iter()
        .map(|r| (r.patient.name.as_str(), r.result.as_ref().map(|x| x.score())))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("Sarah Johnson", Some(3)),
            ("Robert Chen", Some(5)),
            ("Robert Chen", Some(4)),
            ("Michael Torres", None),
        ]
    );
}

#[tokio::test]
async fn sqlite_delete_removes_exactly_one_result() {
    let repo = connect("memdb_delete").await;
    let now = fixed_now();

    let a = repo.create_patient(&subject("Ann", 30), now).await.unwrap();
    let b = repo.create_patient(&subject("Bea", 31), now).await.unwrap();
    let doomed = repo
        .save_result(&ResultDraft::new(a, AgeBand::Adult, 1, 5, now).unwrap())
        .await
        .unwrap();
    repo.save_result(&ResultDraft::new(a, AgeBand::Adult, 2, 5, now).unwrap())
        .await
        .unwrap();
    repo.save_result(&ResultDraft::new(b, AgeBand::Adult, 5, 5, now).unwrap())
        .await
        .unwrap();

    repo.delete_result(doomed).await.unwrap();

    let rows = repo.list_results_with_patients().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.result.as_ref().map(|x| x.id()) != Some(doomed)));
    assert_eq!(rows.iter().filter(|r| r.patient.id == b).count(), 1);

    assert!(matches!(
        repo.delete_result(doomed).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_rejects_result_for_missing_patient() {
    let repo = connect("memdb_missing_patient").await;
    let draft = ResultDraft::new(PatientId::new(404), AgeBand::Youth, 1, 5, fixed_now()).unwrap();
    assert!(matches!(
        repo.save_result(&draft).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_connection_enforces_foreign_keys() {
    let repo = connect("memdb_pragmas").await;
    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(enabled, 1);
}
