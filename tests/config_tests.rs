use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use cleaning_schedule::{PersistenceError, SchedulerConfig};
use tempfile::NamedTempFile;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_are_in_memory_with_ten_second_timeout() {
    let config = SchedulerConfig::default();
    assert_eq!(config.database_path, None);
    assert_eq!(config.persist_timeout(), Duration::from_secs(10));
    assert_eq!(config.http_addr, "0.0.0.0:3000");
}

#[test]
fn json_file_fills_missing_fields_with_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "database_path": "/var/lib/haccp/cleaning.db", "persist_timeout_ms": 2500 }}"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = SchedulerConfig::from_json_file(file.path()).unwrap();
    assert_eq!(
        config.database_path,
        Some(PathBuf::from("/var/lib/haccp/cleaning.db"))
    );
    assert_eq!(config.persist_timeout(), Duration::from_millis(2500));
    assert_eq!(config.default_horizon_days, 30);
}

#[test]
fn json_file_with_out_of_range_defaults_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "default_occurrence_limit": 500 }}"#).unwrap();
    file.flush().unwrap();

    let err = SchedulerConfig::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn environment_overrides_take_precedence() {
    let config = SchedulerConfig::default()
        .with_overrides(lookup(&[
            ("CLEANING_SCHEDULE_DB", "/tmp/cleaning.db"),
            ("CLEANING_SCHEDULE_HTTP_ADDR", "127.0.0.1:8080"),
            ("CLEANING_SCHEDULE_TIMEOUT_MS", "750"),
        ]))
        .unwrap();
    assert_eq!(config.database_path, Some(PathBuf::from("/tmp/cleaning.db")));
    assert_eq!(config.http_addr, "127.0.0.1:8080");
    assert_eq!(config.persist_timeout(), Duration::from_millis(750));
}

#[test]
fn invalid_timeout_override_is_rejected() {
    let err = SchedulerConfig::default()
        .with_overrides(lookup(&[("CLEANING_SCHEDULE_TIMEOUT_MS", "soon")]))
        .unwrap_err();
    assert!(err.to_string().contains("CLEANING_SCHEDULE_TIMEOUT_MS"));

    let err = SchedulerConfig::default()
        .with_overrides(lookup(&[("CLEANING_SCHEDULE_TIMEOUT_MS", "0")]))
        .unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn configured_planner_uses_the_database_file() {
    use chrono::NaiveDate;
    use cleaning_schedule::{NewCleaningTask, RecurrenceFrequency};

    let db = NamedTempFile::new().unwrap();
    let config = SchedulerConfig {
        database_path: Some(db.path().to_path_buf()),
        ..SchedulerConfig::default()
    };

    let planner = config.planner().unwrap();
    let task = planner
        .define_task(NewCleaningTask::new("Passe-plat", RecurrenceFrequency::Daily))
        .await
        .unwrap();

    let reopened = config.planner().unwrap();
    assert_eq!(reopened.task(task.id).await.unwrap().name, "Passe-plat");
    assert_eq!(reopened.timeout(), Duration::from_secs(10));
    assert!(
        reopened
            .preview(
                &cleaning_schedule::RecurrenceSpec::horizon(
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    RecurrenceFrequency::Daily,
                    1
                )
                .unwrap()
            )
            .is_ok()
    );
}
