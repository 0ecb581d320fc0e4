use super::{PersistenceError, PersistenceResult};
use crate::occurrence::ScheduledOccurrence;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct OccurrenceSnapshot {
    occurrences: Vec<ScheduledOccurrence>,
}

pub fn save_occurrences_to_json<P: AsRef<Path>>(
    occurrences: &[ScheduledOccurrence],
    path: P,
) -> PersistenceResult<()> {
    let snapshot = OccurrenceSnapshot {
        occurrences: occurrences.to_vec(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

pub fn load_occurrences_from_json<P: AsRef<Path>>(
    path: P,
) -> PersistenceResult<Vec<ScheduledOccurrence>> {
    let file = File::open(path)?;
    let snapshot: OccurrenceSnapshot = serde_json::from_reader(file)?;
    Ok(snapshot.occurrences)
}

#[derive(Default, Serialize, Deserialize)]
struct OccurrenceCsvRecord {
    task_id: i64,
    scheduled_date: String,
    is_completed: String,
    is_compliant: String,
    comments: String,
    completion_date: String,
    #[serde(default)]
    photo_url: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    employee_id: String,
}

impl From<&ScheduledOccurrence> for OccurrenceCsvRecord {
    fn from(occurrence: &ScheduledOccurrence) -> Self {
        Self {
            task_id: occurrence.task_id,
            scheduled_date: format_date(Some(occurrence.scheduled_date)),
            is_completed: occurrence.is_completed.to_string(),
            is_compliant: format_option_bool(occurrence.is_compliant),
            comments: occurrence.comments.clone().unwrap_or_default(),
            completion_date: format_date(occurrence.completion_date),
            photo_url: occurrence.photo_url.clone().unwrap_or_default(),
            user_id: occurrence.user_id.clone().unwrap_or_default(),
            employee_id: occurrence.employee_id.clone().unwrap_or_default(),
        }
    }
}

impl OccurrenceCsvRecord {
    fn into_occurrence(self) -> PersistenceResult<ScheduledOccurrence> {
        let scheduled_date = parse_date(&self.scheduled_date)?.ok_or_else(|| {
            PersistenceError::InvalidData(format!(
                "occurrence for task {} has no scheduled_date",
                self.task_id
            ))
        })?;
        Ok(ScheduledOccurrence {
            task_id: self.task_id,
            scheduled_date,
            is_completed: parse_bool(&self.is_completed)?.unwrap_or(false),
            is_compliant: parse_bool(&self.is_compliant)?,
            comments: non_empty(self.comments),
            completion_date: parse_date(&self.completion_date)?,
            photo_url: non_empty(self.photo_url),
            user_id: non_empty(self.user_id),
            employee_id: non_empty(self.employee_id),
        })
    }
}

pub fn save_occurrences_to_csv<P: AsRef<Path>>(
    occurrences: &[ScheduledOccurrence],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for occurrence in occurrences {
        writer.serialize(OccurrenceCsvRecord::from(occurrence))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_occurrences_from_csv<P: AsRef<Path>>(
    path: P,
) -> PersistenceResult<Vec<ScheduledOccurrence>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut occurrences = Vec::new();
    for record in reader.deserialize::<OccurrenceCsvRecord>() {
        occurrences.push(record?.into_occurrence()?);
    }

    if occurrences.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no occurrences".into(),
        ));
    }
    Ok(occurrences)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn format_option_bool(value: Option<bool>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_bool(input: &str) -> PersistenceResult<Option<bool>> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
