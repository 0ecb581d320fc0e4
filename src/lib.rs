pub mod bounds;
pub mod calendar;
pub mod config;
pub mod generator;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod library;
pub mod logging;
pub mod materializer;
pub mod occurrence;
pub mod persistence;
pub mod planner;
pub mod recurrence;
pub mod task;
pub(crate) mod validation;

pub use bounds::{MAX_HORIZON_DAYS, MAX_OCCURRENCES, OccurrenceBoundGuard};
pub use config::SchedulerConfig;
pub use generator::{DateSequenceGenerator, GenerationError, generate};
pub use library::PredefinedTask;
pub use materializer::ScheduledTaskMaterializer;
pub use occurrence::{Attribution, ScheduledOccurrence, TaskId};
pub use persistence::{
    BatchMode, BatchOutcome, InMemoryStore, OccurrenceStore, PersistenceError, PersistenceResult,
    RejectedRow, ScheduleBackend, TaskCatalog, TaskDefinitionStore,
};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteOccurrenceStore;
pub use planner::{
    PlanReport, ScheduleError, ScheduleOptions, SchedulePlanner, ScheduleReport, WriteFailure,
};
pub use recurrence::{
    EventTrigger, RecurrenceFrequency, RecurrenceMode, RecurrenceRequest, RecurrenceSpec,
};
pub use task::{CleaningTaskDefinition, CleaningTaskDetails, NewCleaningTask};
pub use validation::{RecurrenceError, TaskValidationError};
