//! Closed-days text → closure rules, and "closed on date D?" over those rules.
//!
//! Recognized notations:
//!
//! - weekly: `月曜日`, `月・火`, `月～金`, `土日祝`, `祝日`
//! - holiday adjustments: `(祝日の場合は翌日)`, `(祝日は開館)`, `(祝日を除く)`
//! - ordinal weekdays: `第3水曜日`, `第2・第4月曜日`, `第1,3水曜`
//! - monthly days: `毎月5日・20日`, `毎月5,20日`, `毎月十五日`
//! - absolute dates: `12/29～1/3`, `12月29日～1月3日`, `12/29～31`, `1/1`,
//!   `年末年始`
//! - flags: `年中無休`, `不定休`, `要問合せ`
//! - trailing `※` remarks, read for extra dates only

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::holiday::HolidayOracle;
use crate::kanji::kanji_to_number;
use crate::normalize::normalize;
use crate::qualifier::{
    extract_days, meaningful_remainder, weekday_from_kanji, HolidayMark, WeekdaySet,
};
use crate::tristate::Tristate;
use crate::usage::INQUIRY;

// ── Data model ──────────────────────────────────────────────────────────────

/// A calendar day independent of year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    /// Rejects days that never exist (`2/30`, `4/31`). `2/29` is accepted.
    pub fn new(month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(2024, month, day).map(|_| MonthDay { month, day })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthDay {
            month: date.month(),
            day: date.day(),
        }
    }
}

/// Inclusive span of calendar days; wraps past New Year when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateSpan {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl DateSpan {
    pub fn includes(&self, day: MonthDay) -> bool {
        if self.start <= self.end {
            self.start <= day && day <= self.end
        } else {
            day >= self.start || day <= self.end
        }
    }
}

/// One recurring or dated closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClosureRule {
    /// Closed on the listed weekdays. An empty set with
    /// `closes_on_holidays_too` closes on holidays only.
    Weekly {
        weekdays: WeekdaySet,
        closes_on_holidays_too: bool,
        shift_to_next_day_if_holiday: bool,
        exclude_holidays: bool,
    },
    /// Closed on fixed days of every month.
    MonthlyFixedDays {
        days: Vec<u32>,
        shift_to_next_day_if_holiday: bool,
    },
    /// Closed on the n-th weekday of every month (`第3水曜日`).
    MonthlyOrdinalWeekday {
        ordinals: Vec<u32>,
        weekday: Weekday,
        shift_to_next_day_if_holiday: bool,
    },
    /// Closed on calendar days every year.
    AbsoluteDates {
        exact_dates: Vec<MonthDay>,
        ranges: Vec<DateSpan>,
    },
}

impl ClosureRule {
    /// Evaluate this rule alone.
    ///
    /// With the shift flag a trigger day that is a holiday stays open and
    /// the day after it closes instead. Only the previous day is consulted,
    /// so a run of holidays shifts by one day.
    pub fn is_closed(&self, date: NaiveDate, oracle: &dyn HolidayOracle) -> Tristate {
        match self {
            ClosureRule::Weekly {
                weekdays,
                closes_on_holidays_too,
                shift_to_next_day_if_holiday,
                exclude_holidays,
            } => {
                let trigger = |d: NaiveDate| weekdays.contains(d.weekday());
                if *closes_on_holidays_too && oracle.is_holiday(date) {
                    return Tristate::Yes;
                }
                if *exclude_holidays && trigger(date) && oracle.is_holiday(date) {
                    return Tristate::No;
                }
                shifted(trigger, *shift_to_next_day_if_holiday, date, oracle)
            }
            ClosureRule::MonthlyFixedDays {
                days,
                shift_to_next_day_if_holiday,
            } => shifted(
                |d: NaiveDate| days.contains(&d.day()),
                *shift_to_next_day_if_holiday,
                date,
                oracle,
            ),
            ClosureRule::MonthlyOrdinalWeekday {
                ordinals,
                weekday,
                shift_to_next_day_if_holiday,
            } => shifted(
                |d: NaiveDate| d.weekday() == *weekday && ordinals.contains(&ordinal_in_month(d)),
                *shift_to_next_day_if_holiday,
                date,
                oracle,
            ),
            ClosureRule::AbsoluteDates { exact_dates, ranges } => {
                let day = MonthDay::of(date);
                (exact_dates.contains(&day) || ranges.iter().any(|r| r.includes(day))).into()
            }
        }
    }
}

fn shifted(
    trigger: impl Fn(NaiveDate) -> bool,
    shift: bool,
    date: NaiveDate,
    oracle: &dyn HolidayOracle,
) -> Tristate {
    if trigger(date) {
        return (!(shift && oracle.is_holiday(date))).into();
    }
    let carried = shift
        && date
            .pred_opt()
            .is_some_and(|prev| trigger(prev) && oracle.is_holiday(prev));
    carried.into()
}

/// 1 for days 1–7, 2 for 8–14, and so on.
fn ordinal_in_month(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// Everything recognized in one closed-days string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClosureParseResult {
    pub raw: Option<String>,
    pub normalized: Option<String>,
    pub rules: Vec<ClosureRule>,
    /// `年中無休`, `なし` and the like.
    pub no_regular_closures: bool,
    /// `不定休`, `臨時休館` and the like.
    pub irregular_or_unknown: bool,
    pub requires_inquiry: bool,
    pub notes: Vec<String>,
}

impl ClosureParseResult {
    /// Same as [`parse_closures`].
    pub fn parse(raw: Option<&str>) -> Self {
        parse_closures(raw)
    }

    /// Whether the facility is closed all day on `date`.
    ///
    /// Any rule saying yes wins. Rules, once present, take precedence over
    /// the "no regular closures" flag. Irregular closures with no rule give
    /// [`Tristate::Unknown`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use hours_engine::{parse_closures, FixedHolidays, Tristate};
    ///
    /// let closures = parse_closures(Some("第3水曜日"));
    /// let oracle = FixedHolidays::none();
    /// let day = |d| NaiveDate::from_ymd_opt(2026, 4, d).unwrap();
    ///
    /// assert_eq!(closures.is_closed_on(day(15), &oracle), Tristate::Yes);
    /// assert_eq!(closures.is_closed_on(day(8), &oracle), Tristate::No);
    /// ```
    pub fn is_closed_on(&self, date: NaiveDate, oracle: &dyn HolidayOracle) -> Tristate {
        let mut any_no = false;
        for rule in &self.rules {
            match rule.is_closed(date, oracle) {
                Tristate::Yes => return Tristate::Yes,
                Tristate::No => any_no = true,
                Tristate::Unknown => {}
            }
        }
        if any_no || (self.rules.is_empty() && self.no_regular_closures) {
            return Tristate::No;
        }
        if self.irregular_or_unknown {
            return Tristate::Unknown;
        }
        Tristate::No
    }
}

// ── Recognizers ─────────────────────────────────────────────────────────────

static NO_CLOSURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"年中無休|無休",
        r"|(?:定休日|休館日|休業日|休園日|休み)は?(?:なし|無し|ありません)",
        r"|^(?:なし|無し)$",
    ))
    .expect("invalid regex")
});

static IRREGULAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"不定休日?|不定期(?:休館|休業|休園)?",
        r"|臨時(?:休館|休業|休園|休)?日?",
        r"|施設により異なる|施設による|時期により異なる",
    ))
    .expect("invalid regex")
});

static SHIFT_TO_NEXT_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\(?(?:祝祭日|祝休日|祝日|休日|祝)(?:・振替休日)?",
        r"(?:の|に|と)?(?:あたる|当たる|重なる)?(?:場合|とき|時)は?[,、]?",
        r"(?:(?:開館|開園|開場|営業|開所)し(?:て)?[,、]?)?(?:その)?",
        r"翌(?:日|平日|開館日)(?:に振替|休館|休業|休園|休み)?\)?",
    ))
    .expect("invalid regex")
});

static HOLIDAY_EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\(?(?:祝祭日|祝休日|祝日|休日|祝)(?:の場合|のとき|の時|と重なる場合|にあたる場合)?",
        r"は(?:開館|開園|開場|営業|開所)(?:します|いたします)?\)?",
    ))
    .expect("invalid regex")
});

/// `祝日の翌日` is a closure we cannot express as a rule; kept as a note.
static DAY_AFTER_HOLIDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:祝祭日|祝休日|祝日|休日|祝)の翌日").expect("invalid regex")
});

static DATE_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"([0-9]{1,2})(?:/|月)([0-9]{1,2})日?\s*~\s*",
        r"(?:([0-9]{1,2})(?:/|月))?([0-9]{1,2})日?",
    ))
    .expect("invalid regex")
});

static SINGLE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})(?:/|月)([0-9]{1,2})日?").expect("invalid regex"));

static YEAR_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"年末年始").expect("invalid regex"));

static LABELS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"定休日|休館日|休園日|休業日|休所日|休場日|点検日|整備日|清掃日|毎週")
        .expect("invalid regex")
});

static ORDINAL_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"第([1-5一二三四五](?:\s*(?:[・,、]|と|及び)\s*第?[1-5一二三四五])*)",
        r"\s*([月火水木金土日])(?:曜日|曜)?",
    ))
    .expect("invalid regex")
});

static MONTHLY_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"毎月\s*((?:[0-9]{1,2}|[〇一二三四五六七八九十]{1,3})日?",
        r"(?:\s*(?:[・,、]|と|及び)\s*(?:[0-9]{1,2}|[〇一二三四五六七八九十]{1,3})日?)*)",
    ))
    .expect("invalid regex")
});

static BARE_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2}日(?:\s*(?:[・,、]|と)\s*[0-9]{1,2}日)*)").expect("invalid regex")
});

static DAY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,2}|[〇一二三四五六七八九十]{1,3}").expect("invalid regex"));

/// Words that only say "closed" once the schedule has been extracted.
static CLOSURE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"お?休み|休館|休業|休園|休場|休所|閉館|閉園|定休|あり|有り|です|となります|など|毎月")
        .expect("invalid regex")
});

/// Default span of `年末年始` when no dates are given.
const YEAR_END_SPAN: DateSpan = DateSpan {
    start: MonthDay { month: 12, day: 29 },
    end: MonthDay { month: 1, day: 3 },
};

// ── parse_closures ──────────────────────────────────────────────────────────

/// Parse a closed-days string.
///
/// # Examples
///
/// ```
/// use hours_engine::parse_closures;
///
/// let closures = parse_closures(Some("月曜日(祝日の場合は翌日)、年末年始"));
/// assert_eq!(closures.rules.len(), 2);
///
/// let always_open = parse_closures(Some("年中無休"));
/// assert!(always_open.no_regular_closures);
/// assert!(always_open.rules.is_empty());
/// ```
pub fn parse_closures(raw: Option<&str>) -> ClosureParseResult {
    let normalized = normalize(raw);
    let mut result = ClosureParseResult {
        raw: raw.map(str::to_string),
        normalized: normalized.clone(),
        ..Default::default()
    };
    let Some(text) = normalized.filter(|t| !t.is_empty()) else {
        return result;
    };

    let mut clauses = text.split('※');
    let main = clauses.next().unwrap_or_default();
    let remarks: Vec<&str> = clauses.collect();

    result.no_regular_closures = NO_CLOSURES.is_match(&text);
    result.irregular_or_unknown = IRREGULAR.is_match(&text);
    result.requires_inquiry = INQUIRY.is_match(&text);

    parse_main(main, &mut result);

    for remark in remarks {
        let (rule, rest) = extract_absolute(remark);
        result.rules.extend(rule);
        if let Some(note) = meaningful_remainder(&CLOSURE_WORDS.replace_all(&rest, " ")) {
            push_note(&mut result, note);
        }
    }

    result
}

fn parse_main(main: &str, result: &mut ClosureParseResult) {
    let shift = SHIFT_TO_NEXT_DAY.is_match(main);
    let mut text = SHIFT_TO_NEXT_DAY.replace_all(main, " ").into_owned();

    let excluded = HOLIDAY_EXCLUSION.is_match(&text);
    text = HOLIDAY_EXCLUSION.replace_all(&text, " ").into_owned();

    let mut notes = Vec::new();
    if let Some(m) = DAY_AFTER_HOLIDAY.find(&text) {
        notes.push(m.as_str().to_string());
    }
    text = DAY_AFTER_HOLIDAY.replace_all(&text, " ").into_owned();

    for re in [&*NO_CLOSURES, &*IRREGULAR, &*INQUIRY] {
        text = re.replace_all(&text, " ").into_owned();
    }

    let (absolute, rest) = extract_absolute(&text);
    text = LABELS.replace_all(&rest, " ").into_owned();

    let mut rules: Vec<ClosureRule> = Vec::new();

    for caps in ORDINAL_WEEKDAY.captures_iter(&text) {
        let ordinals = sorted_unique(caps[1].chars().filter_map(|c| {
            kanji_to_number(c.encode_utf8(&mut [0; 4])).filter(|n| (1..=5).contains(n))
        }));
        let weekday = caps[2].chars().next().and_then(weekday_from_kanji);
        if let (false, Some(weekday)) = (ordinals.is_empty(), weekday) {
            rules.push(ClosureRule::MonthlyOrdinalWeekday {
                ordinals,
                weekday,
                shift_to_next_day_if_holiday: shift,
            });
        }
    }
    text = ORDINAL_WEEKDAY.replace_all(&text, " ").into_owned();

    let mut days = Vec::new();
    for caps in MONTHLY_DAYS.captures_iter(&text) {
        days.extend(day_numbers(&caps[1]));
    }
    text = MONTHLY_DAYS.replace_all(&text, " ").into_owned();
    for caps in BARE_DAYS.captures_iter(&text) {
        days.extend(day_numbers(&caps[1]));
    }
    text = BARE_DAYS.replace_all(&text, " ").into_owned();
    let days = sorted_unique(days);
    if !days.is_empty() {
        rules.push(ClosureRule::MonthlyFixedDays {
            days,
            shift_to_next_day_if_holiday: shift,
        });
    }

    let (qualifier, rest) = extract_days(&text);
    if let Some(q) = qualifier {
        let closes_on_holidays_too = q.holidays == HolidayMark::Included;
        if !q.weekdays.is_empty() || closes_on_holidays_too {
            rules.insert(
                0,
                ClosureRule::Weekly {
                    weekdays: q.weekdays,
                    closes_on_holidays_too,
                    shift_to_next_day_if_holiday: shift,
                    exclude_holidays: excluded || q.holidays == HolidayMark::Excluded,
                },
            );
        }
    }

    rules.extend(absolute);
    result.rules.extend(rules);

    let leftover = CLOSURE_WORDS.replace_all(&rest, " ");
    notes.extend(meaningful_remainder(&leftover));
    for note in notes {
        push_note(result, note);
    }
}

/// Pull absolute dates, date spans and `年末年始` out of `text`.
fn extract_absolute(text: &str) -> (Option<ClosureRule>, String) {
    let mut ranges = Vec::new();
    let mut exact_dates = Vec::new();

    for caps in DATE_SPAN.captures_iter(text) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let (Some(sm), Some(sd), Some(ed)) = (num(1), num(2), num(4)) else {
            continue;
        };
        let em = num(3).unwrap_or(sm);
        if let (Some(start), Some(end)) = (MonthDay::new(sm, sd), MonthDay::new(em, ed)) {
            ranges.push(DateSpan { start, end });
        }
    }
    let rest = DATE_SPAN.replace_all(text, " ");

    for caps in SINGLE_DATE.captures_iter(&rest) {
        let month = caps[1].parse().ok();
        let day = caps[2].parse().ok();
        if let Some(date) = month.zip(day).and_then(|(m, d)| MonthDay::new(m, d)) {
            exact_dates.push(date);
        }
    }
    let rest = SINGLE_DATE.replace_all(&rest, " ");

    if YEAR_END.is_match(&rest) && ranges.is_empty() && exact_dates.is_empty() {
        ranges.push(YEAR_END_SPAN);
    }
    let rest = YEAR_END.replace_all(&rest, " ").into_owned();

    let rule = (!ranges.is_empty() || !exact_dates.is_empty())
        .then_some(ClosureRule::AbsoluteDates { exact_dates, ranges });
    (rule, rest)
}

fn day_numbers(list: &str) -> Vec<u32> {
    DAY_NUMBER
        .find_iter(list)
        .filter_map(|m| kanji_to_number(m.as_str()))
        .filter(|d| (1..=31).contains(d))
        .collect()
}

fn sorted_unique(values: impl IntoIterator<Item = u32>) -> Vec<u32> {
    let mut values: Vec<u32> = values.into_iter().collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn push_note(result: &mut ClosureParseResult, note: String) {
    debug!(fragment = %note, "closure fragment kept as note");
    result.notes.push(note);
}

// ── Tests ───────────────────────────────────────────────────────────────────
