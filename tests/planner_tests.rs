use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use cleaning_schedule::{
    Attribution, BatchMode, InMemoryStore, NewCleaningTask, PersistenceError, RecurrenceError,
    RecurrenceFrequency, RecurrenceRequest, RecurrenceSpec, ScheduleError, ScheduleOptions,
    SchedulePlanner,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn planner_with(store: &Arc<InMemoryStore>) -> SchedulePlanner {
    SchedulePlanner::new(store.clone())
}

fn weekly_spec() -> RecurrenceSpec {
    RecurrenceSpec::horizon(d(2024, 1, 1), RecurrenceFrequency::Weekly, 14).unwrap()
}

#[tokio::test]
async fn schedule_existing_task_writes_one_record_per_date() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);
    let task = planner
        .define_task(NewCleaningTask::new("Plan de travail", RecurrenceFrequency::Weekly))
        .await
        .unwrap();

    let options = ScheduleOptions {
        attribution: Attribution::new(Some("u1".into()), None),
        comments: Some("Essa".into()),
        is_compliant: None,
    };
    let report = planner
        .schedule_task(task.id, &weekly_spec(), &options)
        .await
        .unwrap();

    assert_eq!(report.dates, vec![d(2024, 1, 1), d(2024, 1, 8), d(2024, 1, 15)]);
    assert_eq!(report.outcome.committed, 3);
    assert!(report.outcome.is_complete());

    let stored = planner.occurrences(task.id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|o| o.user_id.as_deref() == Some("u1")));
    assert!(stored.iter().all(|o| o.comments.as_deref() == Some("Essa")));
}

#[tokio::test]
async fn scheduling_an_unknown_task_fails_without_writing() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);
    let err = planner
        .schedule_task(99, &weekly_spec(), &ScheduleOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownTask(99)));
    assert_eq!(store.occurrence_count(), 0);
}

#[tokio::test]
async fn failed_batch_reports_orphaned_definition() {
    let store = Arc::new(InMemoryStore::new());
    store.set_occurrence_writes_failing(true);
    let planner = planner_with(&store);

    let err = planner
        .define_and_schedule(
            NewCleaningTask::new("Hottes", RecurrenceFrequency::Weekly),
            &weekly_spec(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();

    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert!(failure.definition_created);
    assert_eq!(failure.requested, 3);
    assert_eq!(failure.committed, Some(0));
    assert!(matches!(failure.source, PersistenceError::Unavailable(_)));

    // The definition exists on its own until the caller decides.
    let orphan = planner.task(failure.task_id).await.unwrap();
    assert_eq!(orphan.name, "Hottes");

    assert!(planner.discard_task(failure.task_id).await.unwrap());
    assert!(planner.tasks().await.unwrap().is_empty());
    assert!(!planner.discard_task(failure.task_id).await.unwrap());
}

#[tokio::test]
async fn retry_after_failure_is_idempotent() {
    let store = Arc::new(InMemoryStore::new().with_mode(BatchMode::PerRow));
    let planner = planner_with(&store);
    store.set_occurrence_writes_failing(true);

    let err = planner
        .define_and_schedule(
            NewCleaningTask::new("Sols", RecurrenceFrequency::Daily),
            &RecurrenceSpec::count(d(2024, 1, 1), RecurrenceFrequency::Daily, 5).unwrap(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();
    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };

    store.set_occurrence_writes_failing(false);
    let spec = RecurrenceSpec::count(d(2024, 1, 1), RecurrenceFrequency::Daily, 5).unwrap();
    let first = planner
        .schedule_task(failure.task_id, &spec, &ScheduleOptions::default())
        .await
        .unwrap();
    assert_eq!(first.outcome.committed, 5);

    let second = planner
        .schedule_task(failure.task_id, &spec, &ScheduleOptions::default())
        .await
        .unwrap();
    assert_eq!(second.outcome.committed, 0);
    assert_eq!(second.outcome.duplicates, 5);
    assert!(second.outcome.is_complete());
    assert_eq!(store.occurrence_count(), 5);
}

#[tokio::test]
async fn per_row_store_reports_partial_write() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_mode(BatchMode::PerRow)
            .with_row_capacity(2),
    );
    let planner = planner_with(&store);

    let err = planner
        .define_and_schedule(
            NewCleaningTask::new("Échelles", RecurrenceFrequency::Weekly),
            &weekly_spec(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();

    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert_eq!(failure.requested, 3);
    assert_eq!(failure.committed, Some(2));
    assert!(failure.definition_created);
    assert!(failure.to_string().contains("stored 2/3"));
    assert_eq!(store.occurrence_count(), 2);
}

#[tokio::test]
async fn all_or_nothing_store_writes_nothing_on_failure() {
    let store = Arc::new(InMemoryStore::new().with_row_capacity(2));
    let planner = planner_with(&store);
    let task = planner
        .define_task(NewCleaningTask::new("Murs", RecurrenceFrequency::Weekly))
        .await
        .unwrap();

    let err = planner
        .schedule_task(task.id, &weekly_spec(), &ScheduleOptions::default())
        .await
        .unwrap_err();
    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert_eq!(failure.committed, Some(0));
    assert!(!failure.definition_created);
    assert_eq!(store.occurrence_count(), 0);
}

#[tokio::test]
async fn slow_store_hits_the_timeout() {
    let store = Arc::new(InMemoryStore::new().with_latency(Duration::from_millis(500)));
    let planner = planner_with(&store).with_timeout(Duration::from_millis(20));

    let err = planner
        .define_and_schedule(
            NewCleaningTask::new("Armoire froide", RecurrenceFrequency::Monthly),
            &RecurrenceSpec::count(d(2024, 1, 15), RecurrenceFrequency::Monthly, 3).unwrap(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();

    let ScheduleError::Write(failure) = err else {
        panic!("expected a write failure, got {err:?}");
    };
    assert!(matches!(failure.source, PersistenceError::Timeout(_)));
    assert!(failure.definition_created);
    assert_eq!(failure.committed, None);
    assert!(failure.to_string().starts_with("unknown how many of 3 occurrences"));
}

#[tokio::test]
async fn invalid_task_is_rejected_before_any_write() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);
    let err = planner
        .define_and_schedule(
            NewCleaningTask::new("   ", RecurrenceFrequency::Daily),
            &weekly_spec(),
            &ScheduleOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Task(_)));
    assert!(planner.tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn plan_zone_defines_every_predefined_task() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);

    let plan = planner
        .plan_zone("economat", d(2024, 1, 1), 30, &ScheduleOptions::default())
        .await
        .unwrap();

    assert_eq!(plan.tasks.len(), 4);
    let tasks = planner.tasks().await.unwrap();
    assert_eq!(tasks.len(), 4);
    assert!(tasks.iter().all(|t| t.details.zone_id.as_deref() == Some("ECONOMAT")));

    // One event-triggered task, two weekly (5 dates), one monthly (1 date).
    let event_triggered: Vec<_> = plan.tasks.iter().filter(|r| r.dates.is_empty()).collect();
    assert_eq!(event_triggered.len(), 1);
    assert_eq!(plan.occurrence_count(), 11);
    assert_eq!(store.occurrence_count(), 11);
}

#[tokio::test]
async fn plan_zone_caps_long_horizons() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);

    let plan = planner
        .plan_zone("ECONOMAT", d(2024, 1, 1), 400, &ScheduleOptions::default())
        .await
        .unwrap();

    assert_eq!(plan.horizon_days, 365);
    assert_eq!(plan.tasks.len(), 4);
    // 2024-01-01 through 2024-12-31: 53 Mondays for each weekly task, 12 firsts of the month.
    assert_eq!(plan.occurrence_count(), 53 + 53 + 12);
    assert_eq!(plan.tasks.last().map(|r| r.dates.last().copied()), Some(Some(d(2024, 12, 1))));
}

#[tokio::test]
async fn plan_zone_failure_keeps_completed_reports() {
    // Room for the first weekly task only.
    let store = Arc::new(InMemoryStore::new().with_row_capacity(7));
    let planner = planner_with(&store);

    let err = planner
        .plan_zone("ECONOMAT", d(2024, 1, 1), 30, &ScheduleOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("zone 'ECONOMAT' stopped after 2 task(s)"));

    let ScheduleError::Plan {
        zone,
        completed,
        failure,
    } = err
    else {
        panic!("expected a plan failure, got {err:?}");
    };
    assert_eq!(zone, "ECONOMAT");
    assert_eq!(completed.len(), 2);
    assert!(completed[0].dates.is_empty());
    assert_eq!(completed[1].outcome.committed, 5);

    let write = match *failure {
        ScheduleError::Write(write) => write,
        other => panic!("expected a write failure, got {other:?}"),
    };
    assert_eq!(write.task_id, 3);
    assert!(write.definition_created);
    assert_eq!(write.committed, Some(0));
    assert_eq!(planner.tasks().await.unwrap().len(), 3);
    assert_eq!(store.occurrence_count(), 5);
}

#[tokio::test]
async fn plan_zone_rejects_unknown_zone_and_bad_horizon() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);

    let err = planner
        .plan_zone("TERRASSE", d(2024, 1, 1), 30, &ScheduleOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownZone(_)));

    let err = planner
        .plan_zone("CUISINE", d(2024, 1, 1), 0, &ScheduleOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::Recurrence(RecurrenceError::HorizonOutOfRange(0))
    ));
    assert!(planner.tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn preview_does_not_touch_the_store() {
    let store = Arc::new(InMemoryStore::new());
    let planner = planner_with(&store);
    let dates = planner
        .preview_request(RecurrenceRequest::count(d(2024, 1, 1), "daily", 150))
        .unwrap();
    assert_eq!(dates.len(), 100);
    assert_eq!(store.occurrence_count(), 0);

    let err = planner
        .preview_request(RecurrenceRequest::count(d(2024, 1, 1), "daily", 0))
        .unwrap_err();
    assert!(matches!(
        err,
        ScheduleError::Recurrence(RecurrenceError::OccurrenceLimitOutOfRange(0))
    ));
    assert!(err.to_string().starts_with("invalid occurrence_limit:"));
}
