use chrono::NaiveDate;
use cleaning_schedule::{Attribution, ScheduledOccurrence, ScheduledTaskMaterializer};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn materialize_builds_one_open_record_per_date() {
    let materializer = ScheduledTaskMaterializer::new(Attribution::new(
        Some("user-7".into()),
        Some("emp-3".into()),
    ))
    .with_comments(Some("Bac à graisse".into()));
    let dates = [d(2024, 1, 1), d(2024, 1, 8)];

    let records = materializer.materialize(42, &dates);

    assert_eq!(records.len(), 2);
    for (record, date) in records.iter().zip(dates) {
        assert_eq!(record.task_id, 42);
        assert_eq!(record.scheduled_date, date);
        assert!(!record.is_completed);
        assert_eq!(record.is_compliant, None);
        assert_eq!(record.completion_date, None);
        assert_eq!(record.photo_url, None);
        assert_eq!(record.comments.as_deref(), Some("Bac à graisse"));
        assert_eq!(record.user_id.as_deref(), Some("user-7"));
        assert_eq!(record.employee_id.as_deref(), Some("emp-3"));
    }
}

#[test]
fn blank_comments_are_dropped() {
    let materializer =
        ScheduledTaskMaterializer::new(Attribution::default()).with_comments(Some("   ".into()));
    let records = materializer.materialize(1, &[d(2024, 2, 1)]);
    assert_eq!(records[0].comments, None);
}

#[test]
fn initial_compliance_is_copied_to_every_record() {
    let materializer = ScheduledTaskMaterializer::new(Attribution::default())
        .with_initial_compliance(Some(true));
    let records = materializer.materialize(5, &[d(2024, 2, 1), d(2024, 2, 2)]);
    assert!(records.iter().all(|r| r.is_compliant == Some(true)));
}

#[test]
fn materialize_keeps_duplicates_for_the_store_to_resolve() {
    let materializer = ScheduledTaskMaterializer::default();
    let date = d(2024, 3, 1);
    let records = materializer.materialize(9, &[date, date]);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
    assert_eq!(records[0], ScheduledOccurrence::new(9, date));
}

#[test]
fn empty_dates_give_empty_batch() {
    let records = ScheduledTaskMaterializer::default().materialize(1, &[]);
    assert!(records.is_empty());
}
