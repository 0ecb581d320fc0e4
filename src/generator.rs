//! Recurrence expansion.
//!
//! [`DateSequenceGenerator`] turns a [`RecurrenceSpec`] into an ordered list of
//! calendar dates. Horizon mode walks every day of the window and keeps the
//! days that match the frequency. Count mode steps from the start date a fixed
//! number of times without filtering.
//!
//! Monthly recurrences follow one rule in both modes: a month that does not
//! contain the start date's day of month is skipped. A series anchored on the
//! 31st therefore lands on the 31st of the long months only. In count mode the
//! generator keeps stepping until `occurrence_limit` dates exist, so a count
//! run is always a prefix of the corresponding horizon run.

use crate::bounds::OccurrenceBoundGuard;
use crate::calendar::{self, MonthStep};
use crate::recurrence::{EventTrigger, RecurrenceFrequency, RecurrenceMode, RecurrenceSpec};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// A step fell outside the representable calendar.
    CalendarOverflow { start: NaiveDate, step: u64 },
    /// Event-triggered frequencies have no calendar expansion in count mode.
    NotCalendarBased(EventTrigger),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::CalendarOverflow { start, step } => write!(
                f,
                "recurrence starting {start} overflows the calendar at step {step}"
            ),
            GenerationError::NotCalendarBased(trigger) => write!(
                f,
                "frequency {trigger} is triggered by events and has no calendar dates"
            ),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Pure recurrence expansion. Holds no state; every call works on its own spec.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateSequenceGenerator {
    guard: OccurrenceBoundGuard,
}

impl DateSequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self, spec: &RecurrenceSpec) -> Result<Vec<NaiveDate>, GenerationError> {
        let spec = self.guard.apply(spec);
        let start = spec.start_date();
        let frequency = spec.frequency();

        let dates = match spec.mode() {
            RecurrenceMode::Horizon { horizon_days } => {
                Self::horizon_dates(start, frequency, horizon_days)?
            }
            RecurrenceMode::Count { occurrence_limit } => {
                Self::count_dates(start, frequency, occurrence_limit)?
            }
        };

        debug!(
            %start,
            %frequency,
            generated = dates.len(),
            "expanded recurrence"
        );
        Ok(dates)
    }

    /// Expand independent specs in parallel. Results keep the input order.
    pub fn generate_many(
        &self,
        specs: &[RecurrenceSpec],
    ) -> Vec<Result<Vec<NaiveDate>, GenerationError>> {
        specs.par_iter().map(|spec| self.generate(spec)).collect()
    }

    fn horizon_dates(
        start: NaiveDate,
        frequency: RecurrenceFrequency,
        horizon_days: u32,
    ) -> Result<Vec<NaiveDate>, GenerationError> {
        if let RecurrenceFrequency::EventTriggered(trigger) = frequency {
            debug!(%trigger, "event-triggered frequency has no calendar dates");
            return Ok(Vec::new());
        }

        let end = calendar::add_days(start, u64::from(horizon_days)).ok_or(
            GenerationError::CalendarOverflow {
                start,
                step: u64::from(horizon_days),
            },
        )?;

        let mut dates = Vec::new();
        let mut current = start;
        loop {
            if Self::matches(frequency, start, current) {
                dates.push(current);
            }
            if current >= end {
                break;
            }
            // `current < end`, so the successor is representable.
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        Ok(dates)
    }

    fn matches(frequency: RecurrenceFrequency, start: NaiveDate, current: NaiveDate) -> bool {
        match frequency {
            RecurrenceFrequency::Daily => true,
            RecurrenceFrequency::Weekly => current.weekday() == start.weekday(),
            RecurrenceFrequency::Monthly => current.day() == start.day(),
            // Validation rejects a zero interval before a spec exists.
            RecurrenceFrequency::CustomIntervalDays(days) => {
                calendar::days_between(start, current) % i64::from(days) == 0
            }
            RecurrenceFrequency::EventTriggered(_) => false,
        }
    }

    fn count_dates(
        start: NaiveDate,
        frequency: RecurrenceFrequency,
        occurrence_limit: u32,
    ) -> Result<Vec<NaiveDate>, GenerationError> {
        match frequency {
            RecurrenceFrequency::Daily => Self::fixed_steps(start, 1, occurrence_limit),
            RecurrenceFrequency::Weekly => Self::fixed_steps(start, 7, occurrence_limit),
            RecurrenceFrequency::CustomIntervalDays(days) => {
                Self::fixed_steps(start, u64::from(days), occurrence_limit)
            }
            RecurrenceFrequency::Monthly => Self::monthly_steps(start, occurrence_limit),
            RecurrenceFrequency::EventTriggered(trigger) => {
                Err(GenerationError::NotCalendarBased(trigger))
            }
        }
    }

    fn fixed_steps(
        start: NaiveDate,
        step_days: u64,
        occurrence_limit: u32,
    ) -> Result<Vec<NaiveDate>, GenerationError> {
        (0..u64::from(occurrence_limit))
            .map(|i| {
                let offset = i * step_days;
                calendar::add_days(start, offset)
                    .ok_or(GenerationError::CalendarOverflow { start, step: i })
            })
            .collect()
    }

    fn monthly_steps(
        start: NaiveDate,
        occurrence_limit: u32,
    ) -> Result<Vec<NaiveDate>, GenerationError> {
        let target = occurrence_limit as usize;
        let mut dates = Vec::with_capacity(target);
        let mut offset: u32 = 0;
        while dates.len() < target {
            match calendar::same_day_months_after(start, offset) {
                MonthStep::Date(date) => dates.push(date),
                MonthStep::Missing { year, month } => {
                    debug!(%start, year, month, "skipping month without the anchor day");
                }
                MonthStep::Overflow => {
                    return Err(GenerationError::CalendarOverflow {
                        start,
                        step: u64::from(offset),
                    });
                }
            }
            offset += 1;
        }
        Ok(dates)
    }
}

/// Expand a single spec with a default generator.
pub fn generate(spec: &RecurrenceSpec) -> Result<Vec<NaiveDate>, GenerationError> {
    DateSequenceGenerator::new().generate(spec)
}
