use crate::bounds::OccurrenceBoundGuard;
use crate::validation::{self, RecurrenceError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Frequencies that are driven by kitchen events rather than the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTrigger {
    AfterEachUse,
    AfterEachService,
}

impl EventTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTrigger::AfterEachUse => "after_each_use",
            EventTrigger::AfterEachService => "after_each_service",
        }
    }
}

impl fmt::Display for EventTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a cleaning task recurs.
///
/// `EventTriggered` is recognised so that task definitions keep their
/// frequency, but it never expands into calendar dates: those tasks are
/// materialized by an external event, not by pre-generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
    CustomIntervalDays(u32),
    EventTriggered(EventTrigger),
}

impl RecurrenceFrequency {
    /// Stored frequency value. Custom intervals keep their day count in a
    /// separate `frequency_days` column, see [`RecurrenceFrequency::frequency_days`].
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Daily => "daily",
            RecurrenceFrequency::Weekly => "weekly",
            RecurrenceFrequency::Monthly => "monthly",
            RecurrenceFrequency::CustomIntervalDays(_) => "custom",
            RecurrenceFrequency::EventTriggered(trigger) => trigger.as_str(),
        }
    }

    pub fn frequency_days(&self) -> Option<u32> {
        match self {
            RecurrenceFrequency::CustomIntervalDays(days) => Some(*days),
            _ => None,
        }
    }

    pub fn is_calendar_based(&self) -> bool {
        !matches!(self, RecurrenceFrequency::EventTriggered(_))
    }

    /// Rebuild a frequency from its stored value and optional interval.
    ///
    /// Accepts the form values (`daily`, `weekly`, `monthly`, `custom`,
    /// `after_each_use`, `after_each_service`) and the catalog labels
    /// `quotidien`, `hebdomadaire` and `mensuel`.
    pub fn from_parts(value: &str, frequency_days: Option<i64>) -> Result<Self, RecurrenceError> {
        let normalized = value.trim().to_ascii_lowercase();
        let frequency = match normalized.as_str() {
            "daily" | "quotidien" => RecurrenceFrequency::Daily,
            "weekly" | "hebdomadaire" => RecurrenceFrequency::Weekly,
            "monthly" | "mensuel" => RecurrenceFrequency::Monthly,
            "after_each_use" => RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachUse),
            "after_each_service" => {
                RecurrenceFrequency::EventTriggered(EventTrigger::AfterEachService)
            }
            "custom" => {
                let days = frequency_days.ok_or(RecurrenceError::MissingInterval)?;
                if days <= 0 {
                    return Err(RecurrenceError::NonPositiveInterval(days));
                }
                let days =
                    u32::try_from(days).map_err(|_| RecurrenceError::NonPositiveInterval(days))?;
                RecurrenceFrequency::CustomIntervalDays(days)
            }
            _ => return Err(RecurrenceError::UnknownFrequency(value.to_string())),
        };
        Ok(frequency)
    }
}

impl fmt::Display for RecurrenceFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceFrequency::CustomIntervalDays(days) => write!(f, "custom:{days}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Parses `daily`, `weekly`, `monthly`, `after_each_use`, `after_each_service`
/// and `custom:<days>`.
impl FromStr for RecurrenceFrequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((kind, days)) => {
                let days = days
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| RecurrenceError::UnknownFrequency(s.to_string()))?;
                if !kind.trim().eq_ignore_ascii_case("custom") {
                    return Err(RecurrenceError::UnknownFrequency(s.to_string()));
                }
                Self::from_parts("custom", Some(days))
            }
            None => Self::from_parts(s, None),
        }
    }
}

/// Generation strategy. A spec carries exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecurrenceMode {
    /// Every matching day in `[start_date, start_date + horizon_days]`.
    Horizon { horizon_days: u32 },
    /// Exactly `occurrence_limit` dates, one per recurrence step.
    Count { occurrence_limit: u32 },
}

/// Validated recurrence description consumed by the date generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecurrenceSpec {
    start_date: NaiveDate,
    frequency: RecurrenceFrequency,
    mode: RecurrenceMode,
}

impl RecurrenceSpec {
    pub fn new(
        start_date: NaiveDate,
        frequency: RecurrenceFrequency,
        mode: RecurrenceMode,
    ) -> Result<Self, RecurrenceError> {
        validation::validate_recurrence(&frequency, &mode)?;
        Ok(Self {
            start_date,
            frequency,
            mode,
        })
    }

    pub fn horizon(
        start_date: NaiveDate,
        frequency: RecurrenceFrequency,
        horizon_days: u32,
    ) -> Result<Self, RecurrenceError> {
        Self::new(start_date, frequency, RecurrenceMode::Horizon { horizon_days })
    }

    pub fn count(
        start_date: NaiveDate,
        frequency: RecurrenceFrequency,
        occurrence_limit: u32,
    ) -> Result<Self, RecurrenceError> {
        Self::new(
            start_date,
            frequency,
            RecurrenceMode::Count { occurrence_limit },
        )
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn frequency(&self) -> RecurrenceFrequency {
        self.frequency
    }

    pub fn mode(&self) -> RecurrenceMode {
        self.mode
    }

    /// Same spec with the mode passed through the bound guard.
    pub(crate) fn with_mode(self, mode: RecurrenceMode) -> Self {
        Self { mode, ..self }
    }
}

/// Raw scheduling parameters as they arrive from a form or an API payload.
///
/// Numbers are signed so that out-of-range input can be reported by field
/// instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRequest {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_interval_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_limit: Option<i64>,
}

impl RecurrenceRequest {
    pub fn horizon(start_date: NaiveDate, frequency: impl Into<String>, horizon_days: i64) -> Self {
        Self {
            start_date: Some(start_date),
            frequency: frequency.into(),
            horizon_days: Some(horizon_days),
            ..Self::default()
        }
    }

    pub fn count(
        start_date: NaiveDate,
        frequency: impl Into<String>,
        occurrence_limit: i64,
    ) -> Self {
        Self {
            start_date: Some(start_date),
            frequency: frequency.into(),
            occurrence_limit: Some(occurrence_limit),
            ..Self::default()
        }
    }

    /// Clamp the requested bounds, then validate into a [`RecurrenceSpec`].
    pub fn into_spec(self) -> Result<RecurrenceSpec, RecurrenceError> {
        let start_date = self.start_date.ok_or(RecurrenceError::MissingStartDate)?;
        let frequency =
            RecurrenceFrequency::from_parts(&self.frequency, self.custom_interval_days)?;

        let guard = OccurrenceBoundGuard;
        let mode = match (self.horizon_days, self.occurrence_limit) {
            (Some(_), Some(_)) => return Err(RecurrenceError::ConflictingModes),
            (None, None) => return Err(RecurrenceError::MissingMode),
            (Some(requested), None) => {
                let horizon = guard.clamp_requested_horizon(requested);
                let horizon_days = u32::try_from(horizon)
                    .map_err(|_| RecurrenceError::HorizonOutOfRange(requested))?;
                RecurrenceMode::Horizon { horizon_days }
            }
            (None, Some(requested)) => {
                let limit = guard.clamp_requested_limit(requested);
                let occurrence_limit = u32::try_from(limit)
                    .map_err(|_| RecurrenceError::OccurrenceLimitOutOfRange(requested))?;
                RecurrenceMode::Count { occurrence_limit }
            }
        };

        RecurrenceSpec::new(start_date, frequency, mode)
    }
}

impl TryFrom<RecurrenceRequest> for RecurrenceSpec {
    type Error = RecurrenceError;

    fn try_from(request: RecurrenceRequest) -> Result<Self, Self::Error> {
        request.into_spec()
    }
}
