use super::{
    BatchOutcome, OccurrenceStore, PersistenceError, PersistenceResult, RejectedRow, TaskCatalog,
    TaskDefinitionStore,
};
use crate::occurrence::{ScheduledOccurrence, TaskId};
use crate::task::{CleaningTaskDefinition, NewCleaningTask};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// How a store reacts to a batch it cannot fully accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Any bad row fails the whole batch and nothing is written.
    #[default]
    AllOrNothing,
    /// Good rows are written, bad rows are reported in the outcome.
    PerRow,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, CleaningTaskDefinition>,
    occurrences: BTreeMap<(TaskId, NaiveDate), ScheduledOccurrence>,
    occurrence_writes_failing: bool,
}

/// Process-local task catalog and occurrence store.
///
/// Occurrences are unique per `(task_id, scheduled_date)`. The row capacity,
/// latency and failure switch exist to exercise partial and failed writes.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    mode: BatchMode,
    row_capacity: Option<usize>,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: BatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Maximum number of occurrence rows the store will ever hold.
    pub fn with_row_capacity(mut self, capacity: usize) -> Self {
        self.row_capacity = Some(capacity);
        self
    }

    /// Delay applied to every occurrence write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every following occurrence write fail until switched back.
    pub fn set_occurrence_writes_failing(&self, failing: bool) {
        self.state.lock().occurrence_writes_failing = failing;
    }

    pub fn occurrence_count(&self) -> usize {
        self.state.lock().occurrences.len()
    }

    fn insert_per_row(
        &self,
        state: &mut MemoryState,
        records: &[ScheduledOccurrence],
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            requested: records.len(),
            ..BatchOutcome::default()
        };
        for (index, record) in records.iter().enumerate() {
            let key = (record.task_id, record.scheduled_date);
            let reason = if !state.tasks.contains_key(&record.task_id) {
                Some(format!("unknown task {}", record.task_id))
            } else if state.occurrences.contains_key(&key) {
                outcome.duplicates += 1;
                None
            } else if self.is_full(state.occurrences.len()) {
                Some("row capacity reached".to_string())
            } else {
                state.occurrences.insert(key, record.clone());
                outcome.committed += 1;
                None
            };
            if let Some(reason) = reason {
                outcome.rejected.push(RejectedRow {
                    index,
                    scheduled_date: record.scheduled_date,
                    reason,
                });
            }
        }
        outcome
    }

    fn insert_all_or_nothing(
        &self,
        state: &mut MemoryState,
        records: &[ScheduledOccurrence],
    ) -> PersistenceResult<BatchOutcome> {
        let mut fresh = HashSet::new();
        for record in records {
            if !state.tasks.contains_key(&record.task_id) {
                return Err(PersistenceError::InvalidData(format!(
                    "unknown task {}",
                    record.task_id
                )));
            }
            let key = (record.task_id, record.scheduled_date);
            if !state.occurrences.contains_key(&key) {
                fresh.insert(key);
            }
        }
        if let Some(capacity) = self.row_capacity {
            if state.occurrences.len() + fresh.len() > capacity {
                return Err(PersistenceError::Unavailable(
                    "row capacity reached".to_string(),
                ));
            }
        }

        let mut outcome = BatchOutcome {
            requested: records.len(),
            ..BatchOutcome::default()
        };
        for record in records {
            let key = (record.task_id, record.scheduled_date);
            if state.occurrences.contains_key(&key) {
                outcome.duplicates += 1;
            } else {
                state.occurrences.insert(key, record.clone());
                outcome.committed += 1;
            }
        }
        Ok(outcome)
    }

    fn is_full(&self, rows: usize) -> bool {
        self.row_capacity.is_some_and(|capacity| rows >= capacity)
    }
}

#[async_trait]
impl TaskCatalog for InMemoryStore {
    async fn find_task(&self, task_id: TaskId) -> PersistenceResult<Option<CleaningTaskDefinition>> {
        Ok(self.state.lock().tasks.get(&task_id).cloned())
    }

    async fn list_tasks(&self) -> PersistenceResult<Vec<CleaningTaskDefinition>> {
        Ok(self.state.lock().tasks.values().cloned().collect())
    }
}

#[async_trait]
impl TaskDefinitionStore for InMemoryStore {
    async fn create_task(&self, task: NewCleaningTask) -> PersistenceResult<CleaningTaskDefinition> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let definition = task.into_definition(state.next_id);
        state.tasks.insert(definition.id, definition.clone());
        Ok(definition)
    }

    async fn delete_task(&self, task_id: TaskId) -> PersistenceResult<bool> {
        let mut state = self.state.lock();
        if state.tasks.remove(&task_id).is_none() {
            return Ok(false);
        }
        state.occurrences.retain(|(id, _), _| *id != task_id);
        Ok(true)
    }
}

#[async_trait]
impl OccurrenceStore for InMemoryStore {
    async fn insert_occurrences(
        &self,
        records: &[ScheduledOccurrence],
    ) -> PersistenceResult<BatchOutcome> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock();
        if state.occurrence_writes_failing {
            return Err(PersistenceError::Unavailable(
                "occurrence writes are failing".to_string(),
            ));
        }
        match self.mode {
            BatchMode::PerRow => Ok(self.insert_per_row(&mut state, records)),
            BatchMode::AllOrNothing => self.insert_all_or_nothing(&mut state, records),
        }
    }

    async fn occurrences_for_task(
        &self,
        task_id: TaskId,
    ) -> PersistenceResult<Vec<ScheduledOccurrence>> {
        let state = self.state.lock();
        Ok(state
            .occurrences
            .iter()
            .filter(|((id, _), _)| *id == task_id)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
