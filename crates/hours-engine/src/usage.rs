//! Usage-hours text → time windows, and "open at T?" over those windows.
//!
//! Handles the notations found in Japanese facility data:
//!
//! - plain ranges: `9:00～17:00`, `9時～17時半`, `9:00から17:00まで`
//! - weekday scoping: `月～金 9:00～21:00、土日祝 9:00～17:00`, `平日`,
//!   `日祝のみ`, `祝日を除く`
//! - seasons: `4月～10月 9:00～18:00`, `9:00～19:00(5～8月)`
//! - past midnight: `15:00～翌0:00`, `17:00～深夜2:00`, `18:00～25:00`
//! - open-ended: `9:00～日没`
//! - last admission: `(最終入場16:30)`, `受付は16:00まで`
//! - hotels: `IN 15:00 OUT 10:00`
//! - whole-text flags: `24時間`, `休館中`, `要問合せ`, `要予約`
//!
//! Parsing never fails. Text that matches nothing is kept in `notes`.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::holiday::HolidayOracle;
use crate::normalize::normalize;
use crate::qualifier::{
    clock_time, extract_days, extract_months, meaningful_remainder, minute_of_day, DayQualifier,
    HolidayMark, MonthRange, WeekdaySet,
};
use crate::tristate::Tristate;

// ── Data model ──────────────────────────────────────────────────────────────

/// One recurring opening window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start_time: NaiveTime,
    /// `None` when the text gives no fixed end (`～日没`).
    pub end_time: Option<NaiveTime>,
    /// The window ends on the following calendar day.
    pub crosses_midnight: bool,
    /// `None` means every day.
    pub days_of_week: Option<WeekdaySet>,
    /// Empty means all year.
    pub month_ranges: Vec<MonthRange>,
    /// Informational only; never affects evaluation.
    pub last_admission_time: Option<NaiveTime>,
    /// The window also applies on public holidays, whatever their weekday.
    pub includes_holidays: bool,
    pub notes: Vec<String>,
}

impl TimeWindow {
    /// An every-day window. Crossing midnight is inferred when `end <= start`.
    pub fn new(start_time: NaiveTime, end_time: Option<NaiveTime>) -> Self {
        let crosses_midnight =
            end_time.is_some_and(|end| minute_of_day(end) <= minute_of_day(start_time));
        Self {
            start_time,
            end_time,
            crosses_midnight,
            days_of_week: None,
            month_ranges: Vec::new(),
            last_admission_time: None,
            includes_holidays: true,
            notes: Vec::new(),
        }
    }

    /// Whether the window is in force on `date` (month, weekday and holiday
    /// scoping only; time of day is not considered).
    ///
    /// On a holiday only windows that include holidays apply, regardless of
    /// weekday.
    pub fn applies_on(&self, date: NaiveDate, oracle: &dyn HolidayOracle) -> bool {
        if !self.month_ranges.is_empty()
            && !self.month_ranges.iter().any(|r| r.includes(date.month()))
        {
            return false;
        }
        if oracle.is_holiday(date) {
            return self.includes_holidays;
        }
        self.days_of_week
            .is_none_or(|days| days.contains(date.weekday()))
    }

    /// Whether `at` falls inside the window: `[start, end)` on minute of day.
    ///
    /// The part of a cross-midnight window after 00:00 belongs to the
    /// previous day's window, so it applies when the previous day did.
    /// Without an end time the answer after the start is
    /// [`Tristate::Unknown`].
    pub fn contains(&self, at: NaiveDateTime, oracle: &dyn HolidayOracle) -> Tristate {
        let date = at.date();
        let minute = minute_of_day(at.time());
        let start = minute_of_day(self.start_time);

        let Some(end_time) = self.end_time else {
            if minute >= start && self.applies_on(date, oracle) {
                return Tristate::Unknown;
            }
            return Tristate::No;
        };
        let end = minute_of_day(end_time);

        if !self.crosses_midnight {
            return (start <= minute && minute < end && self.applies_on(date, oracle)).into();
        }

        if minute >= start && self.applies_on(date, oracle) {
            return Tristate::Yes;
        }
        let spill_over = minute < end
            && date
                .pred_opt()
                .is_some_and(|prev| self.applies_on(prev, oracle));
        spill_over.into()
    }
}

/// Everything recognized in one usage-hours string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageParseResult {
    pub raw: Option<String>,
    pub normalized: Option<String>,
    pub windows: Vec<TimeWindow>,
    /// Closed or permanently occupied; never open.
    pub is_closed: bool,
    /// Open around the clock.
    pub is_24_hours: bool,
    pub requires_inquiry: bool,
    pub requires_reservation: bool,
    /// No usable window could be read from the text.
    pub unknown_or_non_time: bool,
    pub check_in_time: Option<NaiveTime>,
    pub check_out_time: Option<NaiveTime>,
    pub notes: Vec<String>,
}

impl UsageParseResult {
    /// Same as [`parse_usage`].
    pub fn parse(raw: Option<&str>) -> Self {
        parse_usage(raw)
    }

    /// Tri-state answer for `at` (facility local time).
    ///
    /// Any window that is definitely open wins. Otherwise an indeterminate
    /// window, or the absence of windows, makes the answer unknown.
    pub fn open_state(&self, at: NaiveDateTime, oracle: &dyn HolidayOracle) -> Tristate {
        if self.is_closed {
            return Tristate::No;
        }
        if self.is_24_hours {
            return Tristate::Yes;
        }
        if self.windows.is_empty() {
            return Tristate::Unknown;
        }

        let mut unknown = false;
        for window in &self.windows {
            match window.contains(at, oracle) {
                Tristate::Yes => return Tristate::Yes,
                Tristate::Unknown => unknown = true,
                Tristate::No => {}
            }
        }
        if unknown {
            Tristate::Unknown
        } else {
            Tristate::No
        }
    }

    /// Whether the facility is open at `at`, resolving unknown answers with
    /// the caller's policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use hours_engine::{FixedHolidays, UsageParseResult};
    ///
    /// let hours = UsageParseResult::parse(Some("9:00～17:00"));
    /// let oracle = FixedHolidays::none();
    /// let day = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();
    ///
    /// assert!(hours.is_open(day.and_hms_opt(9, 0, 0).unwrap(), true, &oracle));
    /// assert!(!hours.is_open(day.and_hms_opt(17, 0, 0).unwrap(), true, &oracle));
    /// ```
    pub fn is_open(
        &self,
        at: NaiveDateTime,
        assume_unknown_closed: bool,
        oracle: &dyn HolidayOracle,
    ) -> bool {
        self.open_state(at, oracle).unwrap_or(!assume_unknown_closed)
    }
}

// ── Recognizers ─────────────────────────────────────────────────────────────

static TWENTY_FOUR_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:24時間|24h(?:ours)?|終日|常時開放)(前|以内)?").expect("invalid regex")
});

static FULLY_CLOSED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:現在|当面|当分|しばらく|一時|臨時)?(?:の間|は)?(?:全面)?",
        r"(?:休館|休業|休園|休場|休止|閉鎖|閉館|閉園|利用不可|使用不可|利用停止|使用停止|利用中止|使用中止|営業停止)",
        r"(?:中|しています|しております|となります|です)?$",
    ))
    .expect("invalid regex")
});

static ALWAYS_OCCUPIED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"常時(?:使用|占用|利用)中?|占用中|専用使用").expect("invalid regex")
});

pub(crate) static INQUIRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:要|お)?問い?合わ?せ(?:ください)?|要確認|要相談").expect("invalid regex")
});

/// Closure wording or an ordinal weekday in front of a range.
static CLOSURE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"休館|休園|休業|休場|休所|定休|お?休み|第\s*[1-5一二三四五]").expect("invalid regex")
});

static RESERVATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"要予約|予約制|予約が必要|予約必要|事前予約|完全予約").expect("invalid regex")
});

static CHECK_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:check[- ]?in|チェックイン|\bIN)\s*:?\s*([0-9]{1,2}):([0-9]{2})")
        .expect("invalid regex")
});

static CHECK_OUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:check[- ]?out|チェックアウト|\bOUT)\s*:?\s*([0-9]{1,2}):([0-9]{2})")
        .expect("invalid regex")
});

static LAST_ADMISSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:最終(?:入場|入館|入園|入室|受付|受入)|(?:入場|入館|入園|入室|受付)(?:は|締切)?)\s*:?\s*",
        r"(?P<h>[0-9]{1,2})(?::(?P<m>[0-9]{2})|時(?:(?P<m2>[0-9]{1,2})分|(?P<half>半))?)(?:まで)?",
    ))
    .expect("invalid regex")
});

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<sh>[0-9]{1,2})(?::(?P<sm>[0-9]{2})|時(?:(?P<sm2>[0-9]{1,2})分|(?P<shalf>半))?)",
        r"\s*(?:~|-|から)\s*",
        r"(?:(?P<sunset>日没|日の入り?)(?:まで)?",
        r"|(?P<marker>翌日?|深夜|夜中)?\s*",
        r"(?P<eh>[0-9]{1,2})(?::(?P<em>[0-9]{2})|時(?:(?P<em2>[0-9]{1,2})分|(?P<ehalf>半))?)(?:まで)?)",
    ))
    .expect("invalid regex")
});

const STATEMENT_SEPARATORS: &[char] = &['\n', ';', '。', '※'];
const SEGMENT_SEPARATORS: &[char] = &[',', '/', '、'];

// ── parse_usage ─────────────────────────────────────────────────────────────

/// Parse a usage-hours string.
///
/// Absent or blank input yields `unknown_or_non_time = true` and no windows.
/// Parsing the same input twice yields equal results.
///
/// # Examples
///
/// ```
/// use hours_engine::parse_usage;
///
/// let hours = parse_usage(Some("月～金 9:00～21:00、土日祝 9:00～17:00"));
/// assert_eq!(hours.windows.len(), 2);
/// assert!(hours.windows[1].includes_holidays);
///
/// let hotel = parse_usage(Some("IN 15:00 OUT 10:00"));
/// assert!(hotel.check_in_time.is_some());
/// assert!(hotel.windows.is_empty());
/// ```
pub fn parse_usage(raw: Option<&str>) -> UsageParseResult {
    let normalized = normalize(raw);
    let mut result = UsageParseResult {
        raw: raw.map(str::to_string),
        normalized: normalized.clone(),
        ..Default::default()
    };

    let Some(text) = normalized.filter(|t| !t.is_empty()) else {
        result.unknown_or_non_time = true;
        return result;
    };

    if is_twenty_four_hours(&text) {
        result.is_24_hours = true;
        return result;
    }

    let has_range = TIME_RANGE.is_match(&text);
    result.requires_inquiry = INQUIRY.is_match(&text);
    result.requires_reservation = RESERVATION.is_match(&text);

    if !has_range {
        let bare = text.trim_end_matches(['。', '.', ' ']);
        if FULLY_CLOSED.is_match(bare) || ALWAYS_OCCUPIED.is_match(bare) {
            result.is_closed = true;
            return result;
        }
    }

    let text = extract_check_in_out(&text, &mut result);

    if !has_range
        && (result.requires_inquiry
            || result.requires_reservation
            || result.check_in_time.is_some()
            || result.check_out_time.is_some())
    {
        result.unknown_or_non_time = true;
        return result;
    }

    for statement in split_top_level(&text, STATEMENT_SEPARATORS) {
        parse_statement(statement, &mut result);
    }

    if result.windows.is_empty() {
        result.unknown_or_non_time = true;
    }
    result
}

fn is_twenty_four_hours(text: &str) -> bool {
    TWENTY_FOUR_HOURS
        .captures_iter(text)
        .any(|caps| caps.get(1).is_none())
}

/// Record hotel check-in/out times and return the text without them.
fn extract_check_in_out(text: &str, result: &mut UsageParseResult) -> String {
    fn read(re: &Regex, s: &str) -> Option<NaiveTime> {
        let caps = re.captures(s)?;
        let (time, _) = clock_time(caps[1].parse().ok()?, caps[2].parse().ok()?)?;
        Some(time)
    }

    result.check_in_time = read(&CHECK_IN, text);
    result.check_out_time = read(&CHECK_OUT, text);

    let text = CHECK_IN.replace_all(text, " ");
    CHECK_OUT.replace_all(&text, " ").into_owned()
}

// ── Statements and segments ─────────────────────────────────────────────────

/// Qualifiers in force while walking one statement.
#[derive(Debug, Default)]
struct Scope {
    months: Vec<MonthRange>,
    days: Option<DayQualifier>,
    /// Days from a qualifier-only segment (`土、日 9:00～`), merged into the
    /// next prefix.
    pending: Option<DayQualifier>,
}

impl Scope {
    fn apply_to(&self, window: &mut TimeWindow) {
        window.month_ranges = self.months.clone();
        if let Some(days) = self.days {
            set_days(window, days);
        }
    }
}

/// Outcome of reading one segment.
#[derive(Debug)]
enum Segment {
    Empty,
    Windows(Vec<TimeWindow>),
    /// Only qualifiers; they scope the following segments.
    QualifierOnly,
    /// Nothing recognizable; kept verbatim.
    Unrecognized(String),
}

fn parse_statement(statement: &str, result: &mut UsageParseResult) {
    let mut scope = Scope::default();
    for segment in split_top_level(statement, SEGMENT_SEPARATORS) {
        match parse_segment(segment, &mut scope) {
            Segment::Windows(windows) => result.windows.extend(windows),
            Segment::Unrecognized(text) => {
                debug!(fragment = %text, "usage fragment kept as note");
                result.notes.push(text);
            }
            Segment::QualifierOnly | Segment::Empty => {}
        }
    }
}

fn parse_segment(segment: &str, scope: &mut Scope) -> Segment {
    let segment = segment.trim();
    if segment.is_empty() {
        return Segment::Empty;
    }

    let (last_admission, text) = extract_last_admission(segment);
    let ranges: Vec<Captures> = TIME_RANGE.captures_iter(&text).collect();

    if ranges.is_empty() {
        return match qualifier_only(&text) {
            Some((months, days)) => {
                if !months.is_empty() {
                    scope.months = months;
                }
                if let Some(days) = days {
                    scope.pending = Some(merge_days(scope.pending.take(), days));
                }
                Segment::QualifierOnly
            }
            None if last_admission.is_some() || meaningful_remainder(&text).is_none() => {
                Segment::Empty
            }
            None => Segment::Unrecognized(segment.to_string()),
        };
    }

    let mut windows: Vec<TimeWindow> = Vec::new();
    // Notes from ranges that did not yield a window.
    let mut stray = Vec::new();
    let mut cursor = 0;
    for caps in &ranges {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        // Already read as part of the previous range's parenthetical.
        if whole.start() < cursor {
            continue;
        }
        let mut notes = Vec::new();
        apply_prefix(&text[cursor..whole.start()], scope, &mut notes);

        let (postfix, consumed) = leading_parenthetical(&text[whole.end()..]);
        cursor = whole.end() + consumed;

        let Some(mut window) = window_from_captures(caps) else {
            stray.extend(notes);
            stray.push(whole.as_str().to_string());
            continue;
        };
        scope.apply_to(&mut window);
        if let Some(postfix) = postfix {
            let postfix = read_postfix(postfix);
            postfix.apply(&mut window);
            notes.extend(postfix.note);
        }
        window.notes = notes;
        windows.push(window);
    }

    let tail = read_postfix(&text[cursor..]);
    for window in &mut windows {
        tail.apply(window);
        window.last_admission_time = last_admission.or(window.last_admission_time);
    }
    if let Some(last) = windows.last_mut() {
        last.notes.extend(stray);
        last.notes.extend(tail.note);
    }

    if windows.is_empty() {
        Segment::Unrecognized(segment.to_string())
    } else {
        Segment::Windows(windows)
    }
}

/// Months and days of a segment made only of qualifiers.
fn qualifier_only(text: &str) -> Option<(Vec<MonthRange>, Option<DayQualifier>)> {
    let (months, rest) = extract_months(text);
    let (days, rest) = extract_days(&rest);
    let found = !months.is_empty() || days.is_some();
    (found && meaningful_remainder(&rest).is_none()).then_some((months, days))
}

/// Read qualifiers in front of a time range into the scope.
///
/// A prefix that talks about closures (`毎月第3水曜日休館`) says nothing
/// about the days the range applies to and is kept as a note.
fn apply_prefix(prefix: &str, scope: &mut Scope, notes: &mut Vec<String>) {
    if CLOSURE_MENTION.is_match(prefix) {
        notes.extend(meaningful_remainder(prefix));
        return;
    }
    let (months, rest) = extract_months(prefix);
    let (days, rest) = extract_days(&rest);
    if !months.is_empty() {
        scope.months = months;
    }
    let pending = scope.pending.take();
    match (pending, days) {
        (Some(pending), Some(days)) => scope.days = Some(merge_days(Some(pending), days)),
        (Some(only), None) | (None, Some(only)) => scope.days = Some(only),
        (None, None) => {}
    }
    notes.extend(meaningful_remainder(&rest));
}

/// Qualifiers written after a range (`9:00～19:00(5～8月)`).
struct Postfix {
    months: Vec<MonthRange>,
    days: Option<DayQualifier>,
    note: Option<String>,
}

impl Postfix {
    fn apply(&self, window: &mut TimeWindow) {
        if !self.months.is_empty() {
            window.month_ranges = self.months.clone();
        }
        if let Some(days) = self.days {
            set_days(window, days);
        }
    }
}

/// Qualifiers count only when the postfix is nothing but qualifiers.
/// `(月曜休館)` and `(12月~2月は16:00まで)` stay notes and leave the window
/// unscoped.
fn read_postfix(text: &str) -> Postfix {
    match qualifier_only(text) {
        Some((months, days)) => Postfix {
            months,
            days,
            note: None,
        },
        None => Postfix {
            months: Vec::new(),
            days: None,
            note: meaningful_remainder(text),
        },
    }
}

fn set_days(window: &mut TimeWindow, q: DayQualifier) {
    window.days_of_week = if !q.weekdays.is_empty() {
        Some(q.weekdays)
    } else if q.holidays == HolidayMark::Included && !q.every_day {
        // `祝日 10:00～16:00`: holidays only.
        Some(WeekdaySet::EMPTY)
    } else {
        None
    };
    window.includes_holidays = match q.holidays {
        HolidayMark::Included => true,
        HolidayMark::Excluded => false,
        HolidayMark::Unspecified => window.days_of_week.is_none(),
    };
}

fn merge_days(base: Option<DayQualifier>, next: DayQualifier) -> DayQualifier {
    let Some(base) = base else {
        return next;
    };
    DayQualifier {
        weekdays: base.weekdays.union(next.weekdays),
        holidays: match (base.holidays, next.holidays) {
            (HolidayMark::Unspecified, h) => h,
            (h, HolidayMark::Unspecified) => h,
            (_, h) => h,
        },
        every_day: base.every_day || next.every_day,
    }
}

fn window_from_captures(caps: &Captures) -> Option<TimeWindow> {
    let (start, _) = capture_time(caps, "sh", "sm", "sm2", "shalf")?;
    if caps.name("sunset").is_some() {
        return Some(TimeWindow::new(start, None));
    }
    let (end, end_rolled) = capture_time(caps, "eh", "em", "em2", "ehalf")?;
    let mut window = TimeWindow::new(start, Some(end));
    window.crosses_midnight |= end_rolled || caps.name("marker").is_some();
    Some(window)
}

fn capture_time(
    caps: &Captures,
    hour: &str,
    minute: &str,
    kanji_minute: &str,
    half: &str,
) -> Option<(NaiveTime, bool)> {
    let h: u32 = caps.name(hour)?.as_str().parse().ok()?;
    let m: u32 = match caps.name(minute).or_else(|| caps.name(kanji_minute)) {
        Some(m) => m.as_str().parse().ok()?,
        None if caps.name(half).is_some() => 30,
        None => 0,
    };
    clock_time(h, m)
}

/// Pull a last-admission time out of a segment.
///
/// `受付9:00～17:00` is a reception window, not a last admission, so a match
/// followed by a range separator is left alone.
fn extract_last_admission(segment: &str) -> (Option<NaiveTime>, String) {
    let mut found = None;
    let mut out = String::with_capacity(segment.len());
    let mut last = 0;

    for caps in LAST_ADMISSION.captures_iter(segment) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let after = segment[whole.end()..].trim_start();
        if after.starts_with(['~', '-']) || after.starts_with("から") {
            continue;
        }
        if let Some((time, _)) = capture_time(&caps, "h", "m", "m2", "half") {
            found = Some(time);
            out.push_str(&segment[last..whole.start()]);
            out.push(' ');
            last = whole.end();
        }
    }
    out.push_str(&segment[last..]);
    (found, out)
}

/// If `text` starts (after spaces) with a balanced parenthetical, return its
/// inner text and the number of bytes it spans.
fn leading_parenthetical(text: &str) -> (Option<&str>, usize) {
    let trimmed = text.trim_start();
    let offset = text.len() - trimmed.len();
    if !trimmed.starts_with('(') {
        return (None, 0);
    }
    let mut depth = 0usize;
    for (i, ch) in trimmed.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (Some(&trimmed[1..i]), offset + i + 1);
                }
            }
            _ => {}
        }
    }
    (None, 0)
}

/// Split on `separators` outside any bracket pair.
pub(crate) fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' | '[' | '「' | '【' => depth += 1,
            ')' | ']' | '」' | '】' => depth = (depth - 1).max(0),
            c if depth == 0 && separators.contains(&c) => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

// ── Tests ───────────────────────────────────────────────────────────────────
