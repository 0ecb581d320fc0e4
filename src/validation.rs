use crate::bounds::{MAX_HORIZON_DAYS, MAX_OCCURRENCES};
use crate::recurrence::{EventTrigger, RecurrenceFrequency, RecurrenceMode};
use crate::task::NewCleaningTask;
use std::fmt;

/// A recurrence description that cannot be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    MissingStartDate,
    UnknownFrequency(String),
    MissingInterval,
    NonPositiveInterval(i64),
    MissingMode,
    ConflictingModes,
    HorizonOutOfRange(i64),
    OccurrenceLimitOutOfRange(i64),
    EventTriggeredCount(EventTrigger),
}

impl RecurrenceError {
    /// Name of the caller-facing field that carries the bad value.
    pub fn field(&self) -> &'static str {
        match self {
            RecurrenceError::MissingStartDate => "start_date",
            RecurrenceError::UnknownFrequency(_) | RecurrenceError::EventTriggeredCount(_) => {
                "frequency"
            }
            RecurrenceError::MissingInterval | RecurrenceError::NonPositiveInterval(_) => {
                "custom_interval_days"
            }
            RecurrenceError::MissingMode | RecurrenceError::ConflictingModes => "mode",
            RecurrenceError::HorizonOutOfRange(_) => "horizon_days",
            RecurrenceError::OccurrenceLimitOutOfRange(_) => "occurrence_limit",
        }
    }
}

impl fmt::Display for RecurrenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceError::MissingStartDate => write!(f, "start_date is required"),
            RecurrenceError::UnknownFrequency(value) => {
                write!(f, "frequency '{value}' is not recognised")
            }
            RecurrenceError::MissingInterval => {
                write!(f, "custom_interval_days is required for a custom frequency")
            }
            RecurrenceError::NonPositiveInterval(days) => {
                write!(f, "custom_interval_days must be positive (got {days})")
            }
            RecurrenceError::MissingMode => {
                write!(f, "either horizon_days or occurrence_limit is required")
            }
            RecurrenceError::ConflictingModes => write!(
                f,
                "horizon_days and occurrence_limit cannot be combined in one recurrence"
            ),
            RecurrenceError::HorizonOutOfRange(days) => write!(
                f,
                "horizon_days must be between 1 and {MAX_HORIZON_DAYS} (got {days})"
            ),
            RecurrenceError::OccurrenceLimitOutOfRange(limit) => write!(
                f,
                "occurrence_limit must be between 1 and {MAX_OCCURRENCES} (got {limit})"
            ),
            RecurrenceError::EventTriggeredCount(trigger) => write!(
                f,
                "frequency {trigger} is event-triggered and cannot be expanded by occurrence count"
            ),
        }
    }
}

impl std::error::Error for RecurrenceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskValidationError {
    message: String,
}

impl TaskValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskValidationError {}

pub fn validate_recurrence(
    frequency: &RecurrenceFrequency,
    mode: &RecurrenceMode,
) -> Result<(), RecurrenceError> {
    if let RecurrenceFrequency::CustomIntervalDays(0) = frequency {
        return Err(RecurrenceError::NonPositiveInterval(0));
    }

    match *mode {
        RecurrenceMode::Horizon { horizon_days } => {
            if !(1..=MAX_HORIZON_DAYS).contains(&horizon_days) {
                return Err(RecurrenceError::HorizonOutOfRange(i64::from(horizon_days)));
            }
        }
        RecurrenceMode::Count { occurrence_limit } => {
            if !(1..=MAX_OCCURRENCES).contains(&occurrence_limit) {
                return Err(RecurrenceError::OccurrenceLimitOutOfRange(i64::from(
                    occurrence_limit,
                )));
            }
            if let RecurrenceFrequency::EventTriggered(trigger) = frequency {
                return Err(RecurrenceError::EventTriggeredCount(*trigger));
            }
        }
    }

    Ok(())
}

pub fn validate_new_task(task: &NewCleaningTask) -> Result<(), TaskValidationError> {
    if task.name.trim().is_empty() {
        return Err(TaskValidationError::new("task name must not be empty"));
    }

    if let RecurrenceFrequency::CustomIntervalDays(0) = task.frequency {
        return Err(TaskValidationError::new(format!(
            "task '{}' has a custom frequency without a positive frequency_days",
            task.name
        )));
    }

    if let Some(role) = &task.details.responsible_role {
        if role.trim().is_empty() {
            return Err(TaskValidationError::new(format!(
                "task '{}' has an empty responsible_role",
                task.name
            )));
        }
    }

    Ok(())
}
