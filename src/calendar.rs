use chrono::{Datelike, Days, NaiveDate};

/// Add a number of days, returning `None` past the representable calendar.
pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Outcome of moving an anchor date forward by whole calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStep {
    /// The target month has the anchor's day of month.
    Date(NaiveDate),
    /// The target month is shorter than the anchor's day (e.g. the 31st in April).
    Missing { year: i32, month: u32 },
    /// The target month lies outside the supported calendar range.
    Overflow,
}

/// The anchor's day of month, `months` calendar months later.
///
/// Days that do not exist in the target month are reported as
/// [`MonthStep::Missing`] instead of being clamped or rolled into the next month.
pub fn same_day_months_after(anchor: NaiveDate, months: u32) -> MonthStep {
    let Some((year, month)) = shift_month(anchor, months) else {
        return MonthStep::Overflow;
    };
    if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
        return MonthStep::Overflow;
    }
    match NaiveDate::from_ymd_opt(year, month, anchor.day()) {
        Some(date) => MonthStep::Date(date),
        None => MonthStep::Missing { year, month },
    }
}

/// Helper: (year, month) that lies `months` after the anchor's month
fn shift_month(anchor: NaiveDate, months: u32) -> Option<(i32, u32)> {
    let index = i64::from(anchor.year()) * 12 + i64::from(anchor.month0()) + i64::from(months);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month0 = u32::try_from(index.rem_euclid(12)).ok()?;
    Some((year, month0 + 1))
}
