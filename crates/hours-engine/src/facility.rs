//! Query facade: one facility's hours and closed days answered together.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::closure::{parse_closures, ClosureParseResult};
use crate::error::{HoursError, Result};
use crate::holiday::HolidayOracle;
use crate::tristate::Tristate;
use crate::usage::{parse_usage, UsageParseResult};

/// Wall clock used by Japanese facility data.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;

/// Parsed hours and closed days of one facility.
///
/// Build once per facility record and query many times; both halves are
/// immutable.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use hours_engine::{FacilitySchedule, FixedHolidays};
///
/// let schedule = FacilitySchedule::parse(Some("9:00～17:00"), Some("月曜日"));
/// let oracle = FixedHolidays::none();
///
/// // 2026-04-13 is a Monday.
/// let monday = NaiveDate::from_ymd_opt(2026, 4, 13).unwrap().and_hms_opt(10, 0, 0).unwrap();
/// assert!(schedule.is_open(monday, true, &oracle));
/// assert!(!schedule.is_available(monday, true, &oracle));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilitySchedule {
    pub hours: UsageParseResult,
    pub closures: ClosureParseResult,
}

impl FacilitySchedule {
    pub fn parse(hours: Option<&str>, closed_days: Option<&str>) -> Self {
        Self {
            hours: parse_usage(hours),
            closures: parse_closures(closed_days),
        }
    }

    /// Whether the usage hours cover `at`. Closed days are not consulted.
    pub fn is_open(
        &self,
        at: NaiveDateTime,
        assume_unknown_closed: bool,
        oracle: &dyn HolidayOracle,
    ) -> bool {
        self.hours.is_open(at, assume_unknown_closed, oracle)
    }

    /// Whether `date` is a closed day.
    pub fn is_closed_on(&self, date: NaiveDate, oracle: &dyn HolidayOracle) -> Tristate {
        self.closures.is_closed_on(date, oracle)
    }

    /// Open at `at` and not a closed day. The closed-day check uses the
    /// calendar date of `at`.
    ///
    /// An unknown closed-day answer follows `assume_unknown_closed`, the same
    /// policy used for unknown hours.
    pub fn is_available(
        &self,
        at: NaiveDateTime,
        assume_unknown_closed: bool,
        oracle: &dyn HolidayOracle,
    ) -> bool {
        if !self.is_open(at, assume_unknown_closed, oracle) {
            return false;
        }
        let closed = self.is_closed_on(at.date(), oracle);
        !closed.unwrap_or(assume_unknown_closed)
    }

    /// [`is_open`](Self::is_open) for an absolute instant, read on the wall
    /// clock of `tz`.
    pub fn is_open_at(
        &self,
        instant: DateTime<Utc>,
        tz: Tz,
        assume_unknown_closed: bool,
        oracle: &dyn HolidayOracle,
    ) -> bool {
        self.is_open(local_time(instant, tz), assume_unknown_closed, oracle)
    }

    /// [`is_available`](Self::is_available) for an absolute instant, read on
    /// the wall clock of `tz`.
    pub fn is_available_at(
        &self,
        instant: DateTime<Utc>,
        tz: Tz,
        assume_unknown_closed: bool,
        oracle: &dyn HolidayOracle,
    ) -> bool {
        self.is_available(local_time(instant, tz), assume_unknown_closed, oracle)
    }
}

fn local_time(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Parse an IANA timezone name (`Asia/Tokyo`).
///
/// # Errors
///
/// Returns [`HoursError::InvalidTimezone`] for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| HoursError::InvalidTimezone(format!("'{}'", name)))
}
