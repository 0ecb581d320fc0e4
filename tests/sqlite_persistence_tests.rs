#![cfg(feature = "sqlite")]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use cleaning_schedule::{
    EventTrigger, NewCleaningTask, OccurrenceStore, PersistenceError, RecurrenceFrequency,
    RecurrenceSpec, ScheduleError, ScheduleOptions, SchedulePlanner, ScheduledOccurrence,
    SqliteOccurrenceStore, TaskCatalog, TaskDefinitionStore,
};
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn sqlite_store_round_trips_task_definitions() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteOccurrenceStore::new(file.path()).unwrap();

    let mut task = NewCleaningTask::new("Friteuses", RecurrenceFrequency::CustomIntervalDays(4))
        .with_action("Vidange et nettoyage des friteuses")
        .in_zone("CUISINE");
    task.details.responsible_role = Some("plongeur".into());
    let created = store.create_task(task).await.unwrap();
    store
        .create_task(NewCleaningTask::new(
            "Essuyage",
            RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachUse),
        ))
        .await
        .unwrap();

    // A second handle on the same file sees the committed rows.
    let reopened = SqliteOccurrenceStore::new(file.path()).unwrap();
    let loaded = reopened
        .find_task(created.id)
        .await
        .unwrap()
        .expect("task exists");
    assert_eq!(loaded, created);
    assert_eq!(loaded.frequency, RecurrenceFrequency::CustomIntervalDays(4));
    assert_eq!(loaded.details.responsible_role.as_deref(), Some("plongeur"));

    let all = reopened.list_tasks().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all[1].frequency,
        RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachUse)
    );
    assert!(reopened.find_task(999).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_store_skips_duplicates_and_rejects_unknown_tasks() {
    let store = SqliteOccurrenceStore::open_in_memory().unwrap();
    let task = store
        .create_task(NewCleaningTask::new("Sols", RecurrenceFrequency::Daily))
        .await
        .unwrap();

    let batch = vec![
        ScheduledOccurrence::new(task.id, d(2024, 1, 1)),
        ScheduledOccurrence::new(task.id, d(2024, 1, 2)),
    ];
    let first = store.insert_occurrences(&batch).await.unwrap();
    assert_eq!(first.committed, 2);
    assert!(first.is_complete());

    let mut retry = batch.clone();
    retry.push(ScheduledOccurrence::new(task.id, d(2024, 1, 3)));
    retry.push(ScheduledOccurrence::new(404, d(2024, 1, 3)));
    let second = store.insert_occurrences(&retry).await.unwrap();
    assert_eq!(second.requested, 4);
    assert_eq!(second.committed, 1);
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.rejected.len(), 1);
    assert_eq!(second.rejected[0].index, 3);
    assert!(!second.is_complete());

    let stored = store.occurrences_for_task(task.id).await.unwrap();
    let dates: Vec<_> = stored.iter().map(|o| o.scheduled_date).collect();
    assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)]);
}

#[tokio::test]
async fn deleting_a_task_cascades_to_its_occurrences() {
    let store = SqliteOccurrenceStore::open_in_memory().unwrap();
    let task = store
        .create_task(NewCleaningTask::new("Murs", RecurrenceFrequency::Monthly))
        .await
        .unwrap();
    store
        .insert_occurrences(&[ScheduledOccurrence::new(task.id, d(2024, 1, 15))])
        .await
        .unwrap();

    assert!(store.delete_task(task.id).await.unwrap());
    assert!(store.occurrences_for_task(task.id).await.unwrap().is_empty());
    assert!(!store.delete_task(task.id).await.unwrap());
}

#[tokio::test]
async fn planner_over_sqlite_stores_full_records() {
    let store = SqliteOccurrenceStore::open_in_memory().unwrap();
    let planner = SchedulePlanner::new(Arc::new(store.clone()));

    let options = ScheduleOptions {
        comments: Some("Contrôle HACCP".into()),
        is_compliant: Some(true),
        ..ScheduleOptions::default()
    };
    let report = planner
        .define_and_schedule(
            NewCleaningTask::new("Chambres froides", RecurrenceFrequency::Weekly),
            &RecurrenceSpec::count(d(2024, 1, 1), RecurrenceFrequency::Weekly, 4).unwrap(),
            &options,
        )
        .await
        .unwrap();
    assert_eq!(report.outcome.committed, 4);

    let stored = store.occurrences_for_task(report.task_id).await.unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[3].scheduled_date, d(2024, 1, 22));
    assert!(stored.iter().all(|o| o.is_compliant == Some(true)));
    assert!(stored.iter().all(|o| !o.is_completed && o.completion_date.is_none()));
    assert_eq!(stored[0].comments.as_deref(), Some("Contrôle HACCP"));

    // Scheduling the same spec again adds nothing.
    let again = planner
        .schedule_task(
            report.task_id,
            &RecurrenceSpec::count(d(2024, 1, 1), RecurrenceFrequency::Weekly, 4).unwrap(),
            &options,
        )
        .await
        .unwrap();
    assert_eq!(again.outcome.duplicates, 4);
    assert_eq!(store.occurrences_for_task(report.task_id).await.unwrap().len(), 4);
}

#[tokio::test]
async fn planner_over_sqlite_reports_unknown_task() {
    let store = SqliteOccurrenceStore::open_in_memory().unwrap();
    let planner = SchedulePlanner::new(Arc::new(store));
    let err = planner
        .schedule_task(
            7,
            &RecurrenceSpec::horizon(d(2024, 1, 1), RecurrenceFrequency::Daily, 3).unwrap(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownTask(7)));
}

#[tokio::test]
async fn timed_out_batch_leaves_commit_count_unknown() {
    let file = NamedTempFile::new().unwrap();
    let store = SqliteOccurrenceStore::new(file.path()).unwrap();
    let planner =
        SchedulePlanner::new(Arc::new(store.clone())).with_timeout(Duration::from_millis(200));
    let task = planner
        .define_task(NewCleaningTask::new("Chambre froide", RecurrenceFrequency::Daily))
        .await
        .unwrap();
    let spec = RecurrenceSpec::count(d(2024, 1, 1), RecurrenceFrequency::Daily, 10).unwrap();

    // Another writer holds the database lock past the planner's timeout.
    let locker = rusqlite::Connection::open(file.path()).unwrap();
    locker.execute_batch("BEGIN IMMEDIATE").unwrap();

    let err = planner
        .schedule_task(task.id, &spec, &ScheduleOptions::default())
        .await
        .unwrap_err();
    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert!(matches!(failure.source, PersistenceError::Timeout(_)));
    assert_eq!(failure.requested, 10);
    assert_eq!(failure.committed, None);
    assert!(!failure.definition_created);

    locker.execute_batch("COMMIT").unwrap();

    // The abandoned batch may still land; a retry settles the count either way.
    let patient = planner.clone().with_timeout(Duration::from_secs(10));
    let retry = patient
        .schedule_task(task.id, &spec, &ScheduleOptions::default())
        .await
        .unwrap();
    assert_eq!(retry.outcome.committed + retry.outcome.duplicates, 10);
    assert!(retry.outcome.is_complete());
    assert_eq!(store.occurrences_for_task(task.id).await.unwrap().len(), 10);
}
