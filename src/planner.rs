//! Scheduling workflows: generate dates, materialize records, persist them.
//!
//! Store calls are sequenced and each one is bounded by the planner's timeout.
//! Nothing is retried here. When a batch write fails after a task definition
//! was created, the error carries the new task id so the caller can retry the
//! batch (the store ignores rows it already holds) or delete the definition.

use crate::bounds::{MAX_HORIZON_DAYS, OccurrenceBoundGuard};
use crate::generator::{DateSequenceGenerator, GenerationError};
use crate::library::{self, PredefinedTask};
use crate::materializer::ScheduledTaskMaterializer;
use crate::occurrence::{Attribution, ScheduledOccurrence, TaskId};
use crate::persistence::{BatchOutcome, PersistenceError, PersistenceResult, ScheduleBackend};
use crate::recurrence::{RecurrenceFrequency, RecurrenceMode, RecurrenceRequest, RecurrenceSpec};
use crate::task::{CleaningTaskDefinition, NewCleaningTask};
use crate::validation::{self, RecurrenceError, TaskValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// A batch write that did not fully land.
#[derive(Debug)]
pub struct WriteFailure {
    pub task_id: TaskId,
    pub requested: usize,
    /// `None` when the store call timed out: the batch may still land later.
    pub committed: Option<usize>,
    /// The task definition was created by the same workflow and may now be orphaned.
    pub definition_created: bool,
    pub source: PersistenceError,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.committed {
            Some(committed) => write!(
                f,
                "stored {}/{} occurrences for task {}: {}",
                committed, self.requested, self.task_id, self.source
            )?,
            None => write!(
                f,
                "unknown how many of {} occurrences were stored for task {}: {}",
                self.requested, self.task_id, self.source
            )?,
        }
        if self.definition_created {
            write!(f, " (task definition {} was created)", self.task_id)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ScheduleError {
    Recurrence(RecurrenceError),
    Task(TaskValidationError),
    Generation(GenerationError),
    UnknownTask(TaskId),
    UnknownZone(String),
    /// A catalog read or a definition write failed; nothing was scheduled.
    Store(PersistenceError),
    Write(WriteFailure),
    /// A zone plan stopped part-way. `completed` holds the tasks handled before `failure`.
    Plan {
        zone: String,
        completed: Vec<ScheduleReport>,
        failure: Box<ScheduleError>,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Recurrence(err) => write!(f, "invalid {}: {err}", err.field()),
            ScheduleError::Task(err) => write!(f, "invalid task: {err}"),
            ScheduleError::Generation(err) => write!(f, "generation failed: {err}"),
            ScheduleError::UnknownTask(task_id) => write!(f, "task {task_id} not found"),
            ScheduleError::UnknownZone(zone) => write!(f, "no predefined tasks for zone '{zone}'"),
            ScheduleError::Store(err) => write!(f, "{err}"),
            ScheduleError::Write(failure) => write!(f, "{failure}"),
            ScheduleError::Plan {
                zone,
                completed,
                failure,
            } => write!(
                f,
                "zone '{zone}' stopped after {} task(s): {failure}",
                completed.len()
            ),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<RecurrenceError> for ScheduleError {
    fn from(value: RecurrenceError) -> Self {
        Self::Recurrence(value)
    }
}

impl From<TaskValidationError> for ScheduleError {
    fn from(value: TaskValidationError) -> Self {
        Self::Task(value)
    }
}

impl From<GenerationError> for ScheduleError {
    fn from(value: GenerationError) -> Self {
        Self::Generation(value)
    }
}

impl From<PersistenceError> for ScheduleError {
    fn from(value: PersistenceError) -> Self {
        Self::Store(value)
    }
}

/// What one scheduling action wrote for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub task_id: TaskId,
    pub dates: Vec<NaiveDate>,
    pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanReport {
    pub zone: String,
    pub start_date: NaiveDate,
    pub horizon_days: u32,
    pub tasks: Vec<ScheduleReport>,
}

impl PlanReport {
    pub fn occurrence_count(&self) -> usize {
        self.tasks.iter().map(|report| report.outcome.committed).sum()
    }
}

/// Options shared by every record of one scheduling action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    #[serde(default)]
    pub attribution: Attribution,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub is_compliant: Option<bool>,
}

impl ScheduleOptions {
    fn materializer(&self) -> ScheduledTaskMaterializer {
        ScheduledTaskMaterializer::new(self.attribution.clone())
            .with_comments(self.comments.clone())
            .with_initial_compliance(self.is_compliant)
    }
}

#[derive(Clone)]
pub struct SchedulePlanner {
    store: Arc<dyn ScheduleBackend>,
    generator: DateSequenceGenerator,
    timeout: Duration,
}

impl SchedulePlanner {
    pub fn new(store: Arc<dyn ScheduleBackend>) -> Self {
        Self {
            store,
            generator: DateSequenceGenerator::new(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Dates a spec would produce, without touching the store.
    pub fn preview(&self, spec: &RecurrenceSpec) -> Result<Vec<NaiveDate>, ScheduleError> {
        Ok(self.generator.generate(spec)?)
    }

    pub fn preview_request(
        &self,
        request: RecurrenceRequest,
    ) -> Result<Vec<NaiveDate>, ScheduleError> {
        let spec = request.into_spec()?;
        self.preview(&spec)
    }

    pub async fn task(&self, task_id: TaskId) -> Result<CleaningTaskDefinition, ScheduleError> {
        self.bounded(self.store.find_task(task_id))
            .await?
            .ok_or(ScheduleError::UnknownTask(task_id))
    }

    pub async fn tasks(&self) -> Result<Vec<CleaningTaskDefinition>, ScheduleError> {
        Ok(self.bounded(self.store.list_tasks()).await?)
    }

    pub async fn occurrences(
        &self,
        task_id: TaskId,
    ) -> Result<Vec<ScheduledOccurrence>, ScheduleError> {
        Ok(self.bounded(self.store.occurrences_for_task(task_id)).await?)
    }

    pub async fn define_task(
        &self,
        task: NewCleaningTask,
    ) -> Result<CleaningTaskDefinition, ScheduleError> {
        validation::validate_new_task(&task)?;
        let definition = self.bounded(self.store.create_task(task)).await?;
        info!(task_id = definition.id, name = %definition.name, "defined cleaning task");
        Ok(definition)
    }

    /// Schedule occurrences for an existing task.
    ///
    /// Safe to call again after a failed or partial write: rows the store
    /// already holds are counted as duplicates, not inserted twice.
    pub async fn schedule_task(
        &self,
        task_id: TaskId,
        spec: &RecurrenceSpec,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, ScheduleError> {
        self.task(task_id).await?;
        self.write_occurrences(task_id, spec, options, false).await
    }

    /// Define a task, then schedule its occurrences.
    ///
    /// The two writes are not transactional. If the batch fails the definition
    /// stays in place and [`ScheduleError::Write`] reports its id with
    /// `definition_created` set; see [`SchedulePlanner::discard_task`].
    pub async fn define_and_schedule(
        &self,
        task: NewCleaningTask,
        spec: &RecurrenceSpec,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, ScheduleError> {
        // Nothing is written for a spec that cannot be generated.
        self.generator.generate(spec)?;
        let definition = self.define_task(task).await?;
        self.write_occurrences(definition.id, spec, options, true)
            .await
    }

    /// Delete a task definition and its occurrences.
    pub async fn discard_task(&self, task_id: TaskId) -> Result<bool, ScheduleError> {
        let removed = self.bounded(self.store.delete_task(task_id)).await?;
        if removed {
            info!(task_id, "discarded task definition");
        }
        Ok(removed)
    }

    /// Define and schedule every predefined task of a library zone.
    ///
    /// The horizon is capped like any other request. Event-triggered tasks are
    /// defined but get no calendar occurrences. Stops at the first failure and
    /// returns [`ScheduleError::Plan`] with the reports of the tasks already
    /// handled.
    pub async fn plan_zone(
        &self,
        zone: &str,
        start_date: NaiveDate,
        horizon_days: u32,
        options: &ScheduleOptions,
    ) -> Result<PlanReport, ScheduleError> {
        let predefined = library::tasks_for_zone(zone);
        if predefined.is_empty() {
            return Err(ScheduleError::UnknownZone(zone.to_string()));
        }
        let clamped = OccurrenceBoundGuard.clamp_requested_horizon(i64::from(horizon_days));
        let horizon_days = u32::try_from(clamped).unwrap_or(MAX_HORIZON_DAYS);
        validation::validate_recurrence(
            &RecurrenceFrequency::Daily,
            &RecurrenceMode::Horizon { horizon_days },
        )?;

        let mut reports = Vec::with_capacity(predefined.len());
        for entry in predefined {
            match self.plan_entry(entry, start_date, horizon_days, options).await {
                Ok(report) => reports.push(report),
                Err(failure) => {
                    warn!(zone, completed = reports.len(), error = %failure, "zone plan stopped");
                    return Err(ScheduleError::Plan {
                        zone: zone.to_string(),
                        completed: reports,
                        failure: Box::new(failure),
                    });
                }
            }
        }

        let plan = PlanReport {
            zone: zone.to_string(),
            start_date,
            horizon_days,
            tasks: reports,
        };
        info!(
            zone,
            tasks = plan.tasks.len(),
            occurrences = plan.occurrence_count(),
            "planned zone"
        );
        Ok(plan)
    }

    async fn plan_entry(
        &self,
        entry: PredefinedTask,
        start_date: NaiveDate,
        horizon_days: u32,
        options: &ScheduleOptions,
    ) -> Result<ScheduleReport, ScheduleError> {
        match entry.frequency {
            RecurrenceFrequency::EventTriggered(_) => {
                let definition = self.define_task(entry.to_new_task()).await?;
                Ok(ScheduleReport {
                    task_id: definition.id,
                    dates: Vec::new(),
                    outcome: BatchOutcome::default(),
                })
            }
            frequency => {
                let spec = RecurrenceSpec::new(
                    start_date,
                    frequency,
                    RecurrenceMode::Horizon { horizon_days },
                )?;
                self.define_and_schedule(entry.to_new_task(), &spec, options)
                    .await
            }
        }
    }

    async fn write_occurrences(
        &self,
        task_id: TaskId,
        spec: &RecurrenceSpec,
        options: &ScheduleOptions,
        definition_created: bool,
    ) -> Result<ScheduleReport, ScheduleError> {
        let dates = self.generator.generate(spec)?;
        let records = options.materializer().materialize(task_id, &dates);
        let requested = records.len();

        if records.is_empty() {
            warn!(task_id, frequency = %spec.frequency(), "recurrence produced no dates");
            return Ok(ScheduleReport {
                task_id,
                dates,
                outcome: BatchOutcome::default(),
            });
        }

        let outcome = match self.bounded(self.store.insert_occurrences(&records)).await {
            Ok(outcome) => outcome,
            Err(source) => {
                warn!(task_id, requested, error = %source, "occurrence batch failed");
                // A timed-out call may still commit after this returns.
                let committed = match source {
                    PersistenceError::Timeout(_) => None,
                    _ => Some(0),
                };
                return Err(ScheduleError::Write(WriteFailure {
                    task_id,
                    requested,
                    committed,
                    definition_created,
                    source,
                }));
            }
        };

        if !outcome.rejected.is_empty() {
            warn!(
                task_id,
                requested,
                committed = outcome.committed,
                rejected = outcome.rejected.len(),
                "occurrence batch partially stored"
            );
            let first = &outcome.rejected[0];
            let source = PersistenceError::InvalidData(format!(
                "{} row(s) rejected, first on {}: {}",
                outcome.rejected.len(),
                first.scheduled_date,
                first.reason
            ));
            return Err(ScheduleError::Write(WriteFailure {
                task_id,
                requested,
                committed: Some(outcome.committed + outcome.duplicates),
                definition_created,
                source,
            }));
        }

        info!(
            task_id,
            committed = outcome.committed,
            duplicates = outcome.duplicates,
            "scheduled occurrences"
        );
        Ok(ScheduleReport {
            task_id,
            dates,
            outcome,
        })
    }

    async fn bounded<T, F>(&self, call: F) -> PersistenceResult<T>
    where
        F: Future<Output = PersistenceResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PersistenceError::Timeout(self.timeout))?
    }
}
