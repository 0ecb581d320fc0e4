//! SQLite-backed task catalog and occurrence store.
//!
//! Blocking rusqlite calls run on tokio's blocking pool. Occurrence batches are
//! written inside one transaction with `INSERT OR IGNORE`, so duplicates of an
//! existing `(task, date)` pair are skipped and other failing rows are reported
//! individually.

use super::{
    BatchOutcome, OccurrenceStore, PersistenceError, PersistenceResult, RejectedRow, TaskCatalog,
    TaskDefinitionStore,
};
use crate::occurrence::{ScheduledOccurrence, TaskId};
use crate::recurrence::RecurrenceFrequency;
use crate::task::{CleaningTaskDefinition, CleaningTaskDetails, NewCleaningTask};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const TASK_COLUMNS: &str = "id, name, action_to_perform, frequency, frequency_days, \
     cleaning_zone_id, cleaning_sub_zone_id, cleaning_product_id, cleaning_equipment_id, \
     cleaning_method_id, responsible_role, is_active";

const RECORD_COLUMNS: &str = "cleaning_task_id, scheduled_date, is_completed, is_compliant, \
     comments, completion_date, photo_url, user_id, employee_id";

#[derive(Clone)]
pub struct SqliteOccurrenceStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteOccurrenceStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS cleaning_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                action_to_perform TEXT NOT NULL,
                frequency TEXT NOT NULL,
                frequency_days INTEGER,
                cleaning_zone_id TEXT,
                cleaning_sub_zone_id TEXT,
                cleaning_product_id TEXT,
                cleaning_equipment_id TEXT,
                cleaning_method_id TEXT,
                responsible_role TEXT,
                is_active INTEGER NOT NULL DEFAULT 1
            );
            CREATE TABLE IF NOT EXISTS cleaning_records (
                id INTEGER PRIMARY KEY,
                cleaning_task_id INTEGER NOT NULL
                    REFERENCES cleaning_tasks(id) ON DELETE CASCADE,
                scheduled_date TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                is_compliant INTEGER,
                comments TEXT,
                completion_date TEXT,
                photo_url TEXT,
                user_id TEXT,
                employee_id TEXT,
                UNIQUE (cleaning_task_id, scheduled_date)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, work: F) -> PersistenceResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> PersistenceResult<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock();
            work(&mut guard)
        })
        .await?
    }

    fn task_from_row(row: &Row) -> rusqlite::Result<(TaskRow, CleaningTaskDetails)> {
        let task = TaskRow {
            id: row.get(0)?,
            name: row.get(1)?,
            action_to_perform: row.get(2)?,
            frequency: row.get(3)?,
            frequency_days: row.get(4)?,
            is_active: row.get(11)?,
        };
        let details = CleaningTaskDetails {
            zone_id: row.get(5)?,
            sub_zone_id: row.get(6)?,
            product_id: row.get(7)?,
            equipment_id: row.get(8)?,
            method_id: row.get(9)?,
            responsible_role: row.get(10)?,
        };
        Ok((task, details))
    }

    fn occurrence_from_row(row: &Row) -> rusqlite::Result<OccurrenceRow> {
        Ok(OccurrenceRow {
            task_id: row.get(0)?,
            scheduled_date: row.get(1)?,
            is_completed: row.get(2)?,
            is_compliant: row.get(3)?,
            comments: row.get(4)?,
            completion_date: row.get(5)?,
            photo_url: row.get(6)?,
            user_id: row.get(7)?,
            employee_id: row.get(8)?,
        })
    }
}

struct TaskRow {
    id: TaskId,
    name: String,
    action_to_perform: String,
    frequency: String,
    frequency_days: Option<i64>,
    is_active: bool,
}

impl TaskRow {
    fn into_definition(self, details: CleaningTaskDetails) -> PersistenceResult<CleaningTaskDefinition> {
        let frequency = RecurrenceFrequency::from_parts(&self.frequency, self.frequency_days)
            .map_err(|err| {
                PersistenceError::InvalidData(format!("task {} has {err}", self.id))
            })?;
        Ok(CleaningTaskDefinition {
            id: self.id,
            name: self.name,
            action_to_perform: self.action_to_perform,
            frequency,
            details,
            is_active: self.is_active,
        })
    }
}

struct OccurrenceRow {
    task_id: TaskId,
    scheduled_date: String,
    is_completed: bool,
    is_compliant: Option<bool>,
    comments: Option<String>,
    completion_date: Option<String>,
    photo_url: Option<String>,
    user_id: Option<String>,
    employee_id: Option<String>,
}

impl OccurrenceRow {
    fn into_occurrence(self) -> PersistenceResult<ScheduledOccurrence> {
        Ok(ScheduledOccurrence {
            task_id: self.task_id,
            scheduled_date: parse_date(&self.scheduled_date)?,
            is_completed: self.is_completed,
            is_compliant: self.is_compliant,
            comments: self.comments,
            completion_date: self.completion_date.as_deref().map(parse_date).transpose()?,
            photo_url: self.photo_url,
            user_id: self.user_id,
            employee_id: self.employee_id,
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(input: &str) -> PersistenceResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

#[async_trait]
impl TaskCatalog for SqliteOccurrenceStore {
    async fn find_task(&self, task_id: TaskId) -> PersistenceResult<Option<CleaningTaskDefinition>> {
        self.with_connection(move |conn| {
            let sql = format!("SELECT {TASK_COLUMNS} FROM cleaning_tasks WHERE id = ?1");
            let row = conn
                .query_row(&sql, params![task_id], Self::task_from_row)
                .optional()?;
            row.map(|(task, details)| task.into_definition(details))
                .transpose()
        })
        .await
    }

    async fn list_tasks(&self) -> PersistenceResult<Vec<CleaningTaskDefinition>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {TASK_COLUMNS} FROM cleaning_tasks ORDER BY id ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], Self::task_from_row)?;
            let mut tasks = Vec::new();
            for row in rows {
                let (task, details) = row?;
                tasks.push(task.into_definition(details)?);
            }
            Ok(tasks)
        })
        .await
    }
}

#[async_trait]
impl TaskDefinitionStore for SqliteOccurrenceStore {
    async fn create_task(&self, task: NewCleaningTask) -> PersistenceResult<CleaningTaskDefinition> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO cleaning_tasks (name, action_to_perform, frequency, frequency_days, \
                 cleaning_zone_id, cleaning_sub_zone_id, cleaning_product_id, \
                 cleaning_equipment_id, cleaning_method_id, responsible_role, is_active) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    task.name,
                    task.action_to_perform,
                    task.frequency.as_str(),
                    task.frequency.frequency_days(),
                    task.details.zone_id,
                    task.details.sub_zone_id,
                    task.details.product_id,
                    task.details.equipment_id,
                    task.details.method_id,
                    task.details.responsible_role,
                    task.is_active,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(task_id = id, "created task definition");
            Ok(task.into_definition(id))
        })
        .await
    }

    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<bool> {
        self.with_connection(move |conn| {
            let removed = conn.execute("DELETE FROM cleaning_tasks WHERE id = ?1", params![task_id])?;
            Ok(removed > 0)
        })
        .await
    }
}

#[async_trait]
impl OccurrenceStore for SqliteOccurrenceStore {
    async fn insert_occurrences(
        &self,
        records: &[ScheduledOccurrence],
    ) -> PersistenceResult<BatchOutcome> {
        let records = records.to_vec();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let mut outcome = BatchOutcome {
                requested: records.len(),
                ..BatchOutcome::default()
            };
            {
                let sql = format!(
                    "INSERT OR IGNORE INTO cleaning_records ({RECORD_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                );
                let mut stmt = tx.prepare(&sql)?;
                for (index, record) in records.iter().enumerate() {
                    let result = stmt.execute(params![
                        record.task_id,
                        format_date(record.scheduled_date),
                        record.is_completed,
                        record.is_compliant,
                        record.comments,
                        record.completion_date.map(format_date),
                        record.photo_url,
                        record.user_id,
                        record.employee_id,
                    ]);
                    match result {
                        Ok(0) => outcome.duplicates += 1,
                        Ok(_) => outcome.committed += 1,
                        Err(err) => outcome.rejected.push(RejectedRow {
                            index,
                            scheduled_date: record.scheduled_date,
                            reason: err.to_string(),
                        }),
                    }
                }
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn occurrences_for_task(
        &self,
        task_id: TaskId,
    ) -> PersistenceResult<Vec<ScheduledOccurrence>> {
        self.with_connection(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM cleaning_records \
                 WHERE cleaning_task_id = ?1 ORDER BY scheduled_date ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![task_id], Self::occurrence_from_row)?;
            let mut occurrences = Vec::new();
            for row in rows {
                occurrences.push(row?.into_occurrence()?);
            }
            Ok(occurrences)
        })
        .await
    }
}
