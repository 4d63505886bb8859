//! Interval value stored as a combination of calendar months, whole days, and microseconds.

use crate::constants::NANOS_PER_MICRO;

/// Interval value stored as a combination of calendar months, whole days, and microseconds.
///
/// Months capture both month and year components (12 months == 1 year). Days represent
/// whole 24-hour periods and microseconds account for sub-day precision. The engine keeps
/// the three components apart; no normalization between them is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntervalValue {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl IntervalValue {
    pub const fn new(months: i32, days: i32, micros: i64) -> Self {
        Self {
            months,
            days,
            micros,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Nanosecond component as stored by Arrow's `IntervalMonthDayNano`.
    pub fn nanos(self) -> Option<i64> {
        self.micros.checked_mul(NANOS_PER_MICRO)
    }

    /// Build from Arrow month/day/nano parts, truncating sub-microsecond precision.
    pub const fn from_month_day_nano(months: i32, days: i32, nanos: i64) -> Self {
        Self::new(months, days, nanos / NANOS_PER_MICRO)
    }
}
