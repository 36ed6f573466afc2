//! # hours-engine
//!
//! Deterministic availability for Japanese public facilities.
//!
//! Facility records carry free-form text for usage hours
//! (`月～金 9:00～21:00、土日祝 9:00～17:00`) and closed days
//! (`毎週月曜日(祝日の場合は翌日)、年末年始`). This crate turns both into
//! structured schedules and answers "is it open at T?" and "is D a closed
//! day?" with explicit handling of what the text leaves undetermined.
//!
//! ## Modules
//!
//! - [`usage`] — usage-hours text → time windows; open/closed/unknown at an instant
//! - [`closure`] — closed-days text → closure rules; closed/open/unknown on a date
//! - [`facility`] — facade combining both, with timezone-aware queries
//! - [`holiday`] — public-holiday oracle: fixed sets, cached HTTP lookup
//! - [`qualifier`] — weekday, holiday and month qualifiers shared by both parsers
//! - [`normalize`] — full-width → half-width text cleanup
//! - [`kanji`] — kanji numeral conversion
//! - [`tristate`] — yes / no / unknown answers
//! - [`config`] — holiday endpoint configuration
//! - [`error`] — Error types

pub mod closure;
pub mod config;
pub mod error;
pub mod facility;
pub mod holiday;
pub mod kanji;
pub mod normalize;
pub mod qualifier;
pub mod tristate;
pub mod usage;

pub use closure::{parse_closures, ClosureParseResult, ClosureRule, DateSpan, MonthDay};
pub use config::HolidayConfig;
pub use error::HoursError;
pub use facility::{parse_timezone, FacilitySchedule, DEFAULT_TIMEZONE};
pub use holiday::{
    parse_holiday_payload, CachedHolidayOracle, FixedHolidays, HolidayNames, HolidayOracle,
    HolidaySource,
};
#[cfg(feature = "http")]
pub use holiday::{HttpHolidayOracle, HttpHolidaySource};
pub use qualifier::{MonthRange, WeekdaySet};
pub use tristate::Tristate;
pub use usage::{parse_usage, TimeWindow, UsageParseResult};
