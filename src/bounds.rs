use crate::recurrence::{RecurrenceMode, RecurrenceSpec};
use tracing::warn;

/// Largest number of occurrences a single count-mode run may produce.
pub const MAX_OCCURRENCES: u32 = 100;
/// Largest horizon, in days, a single horizon-mode run may walk.
pub const MAX_HORIZON_DAYS: u32 = 365;

/// Caps occurrence counts and horizons before any generation runs.
///
/// The caps bound the number of rows a single scheduling action can write.
/// The guard is applied to every spec handed to the generator, whether or not
/// it was validated beforehand.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OccurrenceBoundGuard;

impl OccurrenceBoundGuard {
    pub fn clamp_mode(&self, mode: RecurrenceMode) -> RecurrenceMode {
        match mode {
            RecurrenceMode::Horizon { horizon_days } if horizon_days > MAX_HORIZON_DAYS => {
                warn!(
                    requested = horizon_days,
                    cap = MAX_HORIZON_DAYS,
                    "clamping horizon_days"
                );
                RecurrenceMode::Horizon {
                    horizon_days: MAX_HORIZON_DAYS,
                }
            }
            RecurrenceMode::Count { occurrence_limit } if occurrence_limit > MAX_OCCURRENCES => {
                warn!(
                    requested = occurrence_limit,
                    cap = MAX_OCCURRENCES,
                    "clamping occurrence_limit"
                );
                RecurrenceMode::Count {
                    occurrence_limit: MAX_OCCURRENCES,
                }
            }
            other => other,
        }
    }

    pub fn apply(&self, spec: &RecurrenceSpec) -> RecurrenceSpec {
        spec.with_mode(self.clamp_mode(spec.mode()))
    }

    /// `min(requested, MAX_OCCURRENCES)`; lower bounds are left to validation.
    pub fn clamp_requested_limit(&self, requested: i64) -> i64 {
        if requested > i64::from(MAX_OCCURRENCES) {
            warn!(requested, cap = MAX_OCCURRENCES, "clamping occurrence_limit");
        }
        requested.min(i64::from(MAX_OCCURRENCES))
    }

    /// `min(requested, MAX_HORIZON_DAYS)`; lower bounds are left to validation.
    pub fn clamp_requested_horizon(&self, requested: i64) -> i64 {
        if requested > i64::from(MAX_HORIZON_DAYS) {
            warn!(requested, cap = MAX_HORIZON_DAYS, "clamping horizon_days");
        }
        requested.min(i64::from(MAX_HORIZON_DAYS))
    }
}
