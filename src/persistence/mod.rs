use crate::occurrence::{ScheduledOccurrence, TaskId};
use crate::task::{CleaningTaskDefinition, NewCleaningTask};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
    Unavailable(String),
    Timeout(Duration),
    Join(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            PersistenceError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            PersistenceError::Timeout(limit) => {
                write!(f, "store call timed out after {} ms", limit.as_millis())
            }
            PersistenceError::Join(msg) => write!(f, "store worker failed: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<tokio::task::JoinError> for PersistenceError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// A row the store refused, identified by its position in the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub index: usize,
    pub scheduled_date: NaiveDate,
    pub reason: String,
}

/// Per-batch result of an occurrence insert.
///
/// All-or-nothing stores report either every row committed or an error.
/// Per-row stores may also list rejected rows. Rows already present for the
/// same task and date are counted as `duplicates`, so a retried batch is
/// complete once nothing is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub requested: usize,
    pub committed: usize,
    pub duplicates: usize,
    pub rejected: Vec<RejectedRow>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty() && self.committed + self.duplicates == self.requested
    }
}

/// Read side of the task definitions.
#[async_trait]
pub trait TaskCatalog: Send + Sync {
    async fn find_task(&self, task_id: TaskId) -> PersistenceResult<Option<CleaningTaskDefinition>>;
    async fn list_tasks(&self) -> PersistenceResult<Vec<CleaningTaskDefinition>>;
}

/// Write side of the task definitions.
#[async_trait]
pub trait TaskDefinitionStore: TaskCatalog {
    async fn create_task(&self, task: NewCleaningTask) -> PersistenceResult<CleaningTaskDefinition>;
    /// Removes a definition and its occurrences. Returns `false` when absent.
    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<bool>;
}

#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    async fn insert_occurrences(
        &self,
        records: &[ScheduledOccurrence],
    ) -> PersistenceResult<BatchOutcome>;

    /// Occurrences of one task ordered by scheduled date.
    async fn occurrences_for_task(
        &self,
        task_id: TaskId,
    ) -> PersistenceResult<Vec<ScheduledOccurrence>>;
}

/// Everything the scheduling workflows need from a backend.
pub trait ScheduleBackend: TaskDefinitionStore + OccurrenceStore {}

impl<T: TaskDefinitionStore + OccurrenceStore> ScheduleBackend for T {}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    load_occurrences_from_csv, load_occurrences_from_json, save_occurrences_to_csv,
    save_occurrences_to_json,
};
pub use memory::{BatchMode, InMemoryStore};
