//! Qualifiers shared by the usage-hours and closed-days parsers.
//!
//! Both kinds of text scope their statements the same way: weekday sets
//! (`月～金`, `土日`, `平日`), holiday inclusion or exclusion (`祝日`,
//! `祝日を除く`) and month ranges (`4月～10月`). The extractors here find a
//! qualifier, remove the matched text and hand back the remainder so the
//! caller can keep recognizing what is left.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{NaiveTime, Weekday};
use regex::{Captures, Regex};
use serde::{Serialize, Serializer};

// ── WeekdaySet ──────────────────────────────────────────────────────────────

/// A set of weekdays stored as a 7-bit mask (bit 0 = Monday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    /// Monday through Friday (`平日`).
    pub const WEEKDAYS: WeekdaySet = WeekdaySet(0b001_1111);
    /// Saturday and Sunday (`土日`, `週末`).
    pub const WEEKEND: WeekdaySet = WeekdaySet(0b110_0000);
    pub const ALL: WeekdaySet = WeekdaySet(0b111_1111);

    pub fn single(day: Weekday) -> Self {
        WeekdaySet(1 << day.num_days_from_monday())
    }

    /// Inclusive range that wraps past Sunday: `range(Fri, Mon)` is
    /// Fri, Sat, Sun, Mon.
    pub fn range(from: Weekday, to: Weekday) -> Self {
        let mut set = WeekdaySet::EMPTY;
        let mut day = from;
        loop {
            set.insert(day);
            if day == to {
                return set;
            }
            day = day.succ();
        }
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn union(self, other: WeekdaySet) -> WeekdaySet {
        WeekdaySet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_WEEKDAYS.iter().copied().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Map a single weekday kanji to its weekday.
pub fn weekday_from_kanji(ch: char) -> Option<Weekday> {
    match ch {
        '月' => Some(Weekday::Mon),
        '火' => Some(Weekday::Tue),
        '水' => Some(Weekday::Wed),
        '木' => Some(Weekday::Thu),
        '金' => Some(Weekday::Fri),
        '土' => Some(Weekday::Sat),
        '日' => Some(Weekday::Sun),
        _ => None,
    }
}

// ── MonthRange ──────────────────────────────────────────────────────────────

/// An inclusive range of months that may wrap past December.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MonthRange {
    pub start_month: u32,
    pub end_month: u32,
}

impl MonthRange {
    /// Build a range, rejecting months outside 1..=12.
    pub fn new(start_month: u32, end_month: u32) -> Option<Self> {
        let valid = |m: u32| (1..=12).contains(&m);
        (valid(start_month) && valid(end_month)).then_some(MonthRange {
            start_month,
            end_month,
        })
    }

    pub fn single(month: u32) -> Option<Self> {
        Self::new(month, month)
    }

    /// Whether `month` falls in the range; `11→4` includes 12 and 1.
    pub fn includes(&self, month: u32) -> bool {
        if self.start_month <= self.end_month {
            (self.start_month..=self.end_month).contains(&month)
        } else {
            month >= self.start_month || month <= self.end_month
        }
    }
}

// ── Day qualifiers ──────────────────────────────────────────────────────────

/// What a fragment says about public holidays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HolidayMark {
    /// No holiday token present.
    #[default]
    Unspecified,
    /// `祝`, `祝日`, `祝祭日`, `休日`.
    Included,
    /// `祝日を除く`, `祝日除く`.
    Excluded,
}

/// Weekday and holiday scoping recognized in a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayQualifier {
    pub weekdays: WeekdaySet,
    pub holidays: HolidayMark,
    /// `毎日` / `全日`: explicitly every day.
    pub every_day: bool,
}

static HOLIDAY_EXCLUDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:祝祭日|祝休日|祝日|休日|祝)(?:・休日)?を?除く").expect("invalid regex")
});

static SUNDAY_HOLIDAY_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"日(?:曜日|曜)?[・,]?(?:祝祭日|祝休日|祝日|祝)のみ").expect("invalid regex")
});

static WEEKDAY_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"平日|週末|毎日|全日").expect("invalid regex"));

static HOLIDAY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"祝祭日|祝休日|祝日|休日|祝").expect("invalid regex"));

static WEEKDAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([月火水木金土日])(?:曜日|曜)?\s*~\s*([月火水木金土日])(?:曜日|曜)?")
        .expect("invalid regex")
});

static WEEKDAY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([月火水木金土日])(?:曜日|曜)?").expect("invalid regex"));

/// Find weekday and holiday qualifiers in `text`.
///
/// Returns the qualifier (if any token matched) and `text` with every
/// matched token removed. Callers must strip month and date expressions
/// first. A weekday kanji counts only when it stands on its own, so the
/// `月` of `毎月` and the `日` of `翌日` are left in the remainder.
pub fn extract_days(text: &str) -> (Option<DayQualifier>, String) {
    let mut q = DayQualifier::default();
    let mut found = false;
    let mut rest = text.to_string();

    if HOLIDAY_EXCLUDED.is_match(&rest) {
        q.holidays = HolidayMark::Excluded;
        rest = HOLIDAY_EXCLUDED.replace_all(&rest, " ").into_owned();
        found = true;
    }

    if SUNDAY_HOLIDAY_ONLY.is_match(&rest) {
        q.weekdays.insert(Weekday::Sun);
        q.holidays = HolidayMark::Included;
        rest = SUNDAY_HOLIDAY_ONLY.replace_all(&rest, " ").into_owned();
        found = true;
    }

    for m in WEEKDAY_SHORTHAND.find_iter(&rest) {
        match m.as_str() {
            "平日" => q.weekdays = q.weekdays.union(WeekdaySet::WEEKDAYS),
            "週末" => q.weekdays = q.weekdays.union(WeekdaySet::WEEKEND),
            _ => q.every_day = true,
        }
        found = true;
    }
    rest = WEEKDAY_SHORTHAND.replace_all(&rest, " ").into_owned();

    if HOLIDAY_TOKEN.is_match(&rest) {
        if q.holidays == HolidayMark::Unspecified {
            q.holidays = HolidayMark::Included;
        }
        rest = HOLIDAY_TOKEN.replace_all(&rest, " ").into_owned();
        found = true;
    }

    rest = take_standalone(&WEEKDAY_RANGE, &rest, |caps| {
        let from = first_char(&caps[1]).and_then(weekday_from_kanji);
        let to = first_char(&caps[2]).and_then(weekday_from_kanji);
        let (Some(from), Some(to)) = (from, to) else {
            return false;
        };
        q.weekdays = q.weekdays.union(WeekdaySet::range(from, to));
        found = true;
        true
    });

    rest = take_standalone(&WEEKDAY_TOKEN, &rest, |caps| {
        let Some(day) = first_char(&caps[1]).and_then(weekday_from_kanji) else {
            return false;
        };
        q.weekdays.insert(day);
        found = true;
        true
    });

    (found.then_some(q), rest)
}

/// May precede a weekday kanji.
const BEFORE_WEEKDAY: &str = "・,、/:;()~-週はとやび";
/// May follow a weekday kanji written without `曜`.
const AFTER_BARE_WEEKDAY: &str = "・,、/:;()~-はとやのにも及休祝";

/// Whether the match at `span` names a weekday rather than sitting inside a
/// word such as `毎月`, `月末`, `翌日` or `末日`.
fn is_standalone(text: &str, span: Range<usize>) -> bool {
    let is_weekday = |c: char| weekday_from_kanji(c).is_some();
    let before_ok = text[..span.start]
        .chars()
        .next_back()
        .is_none_or(|c| c.is_whitespace() || is_weekday(c) || BEFORE_WEEKDAY.contains(c));
    let spelled_out = text[..span.end].ends_with('曜') || text[..span.end].ends_with("曜日");
    let after_ok = spelled_out
        || text[span.end..].chars().next().is_none_or(|c| {
            c.is_whitespace()
                || c.is_ascii_digit()
                || is_weekday(c)
                || AFTER_BARE_WEEKDAY.contains(c)
        });
    before_ok && after_ok
}

/// Blank out every standalone match of `re` that `accept` takes; other
/// matches stay in the text.
fn take_standalone(re: &Regex, text: &str, mut accept: impl FnMut(&Captures) -> bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if is_standalone(text, whole.range()) && accept(&caps) {
            out.push_str(&text[last..whole.start()]);
            out.push(' ');
            last = whole.end();
        }
    }
    out.push_str(&text[last..]);
    out
}

fn first_char(s: &str) -> Option<char> {
    s.chars().next()
}

// ── Month qualifiers ────────────────────────────────────────────────────────

static MONTH_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]{1,2})月?\s*~\s*([0-9]{1,2})月(?:末)?(?:まで)?").expect("invalid regex")
});

static MONTH_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{1,2})月([0-9]{1,2}日)?").expect("invalid regex"));

/// Find month ranges (`4月~10月`, `11~3月`, `8月`) in `text`.
///
/// A month immediately followed by a day (`5月5日`) is a date, not a month
/// qualifier, and is left in place.
pub fn extract_months(text: &str) -> (Vec<MonthRange>, String) {
    let mut ranges = Vec::new();

    for caps in MONTH_SPAN.captures_iter(text) {
        let start = caps[1].parse().ok();
        let end = caps[2].parse().ok();
        if let Some(range) = start.zip(end).and_then(|(s, e)| MonthRange::new(s, e)) {
            ranges.push(range);
        }
    }
    let rest = MONTH_SPAN.replace_all(text, " ").into_owned();

    let mut out = String::with_capacity(rest.len());
    let mut last = 0;
    for caps in MONTH_SINGLE.captures_iter(&rest) {
        if caps.get(2).is_some() {
            continue;
        }
        let Some(range) = caps[1].parse().ok().and_then(MonthRange::single) else {
            continue;
        };
        ranges.push(range);
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&rest[last..whole.start]);
        out.push(' ');
        last = whole.end;
    }
    out.push_str(&rest[last..]);

    (ranges, out)
}

// ── Time of day ─────────────────────────────────────────────────────────────

/// Build a clock time from an hour/minute pair as written in facility text.
///
/// Hours 24–47 (`24:00`, `25:30`) are folded back into the day; the flag
/// reports that the written time belongs to the following day.
pub fn clock_time(hour: u32, minute: u32) -> Option<(NaiveTime, bool)> {
    if minute > 59 || hour > 47 {
        return None;
    }
    let rolled = hour >= 24;
    let time = NaiveTime::from_hms_opt(hour % 24, minute, 0)?;
    Some((time, rolled))
}

/// Minutes since midnight.
pub fn minute_of_day(time: NaiveTime) -> u32 {
    use chrono::Timelike;
    time.hour() * 60 + time.minute()
}

// ── Remainders ──────────────────────────────────────────────────────────────

/// Characters and words that carry no meaning once qualifiers are removed.
const FILLER: &[&str] = &[
    "及び", "および", "ならびに", "のみ", "毎週", "曜日", "は", "と", "の", "・", "、", "。", ",",
    "/", ":", ";", "(", ")", "[", "]", "「", "」", "【", "】", "&", "-", "~", "※", " ",
];

/// The trimmed remainder of a fragment if anything meaningful is left.
pub fn meaningful_remainder(text: &str) -> Option<String> {
    let mut probe = text.to_string();
    for filler in FILLER {
        probe = probe.replace(filler, "");
    }
    if probe.trim().is_empty() {
        return None;
    }
    let trimmed = text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '/' | '、' | '・' | ':' | ';' | '。')
    });
    Some(collapse_spaces(trimmed))
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── WeekdaySet ──────────────────────────────────────────────────────

    #[test]
    fn test_weekday_range_plain() {
        let set = WeekdaySet::range(Weekday::Mon, Weekday::Fri);
        assert_eq!(set, WeekdaySet::WEEKDAYS);
    }

    #[test]
    fn test_weekday_range_wraps() {
        let set = WeekdaySet::range(Weekday::Fri, Weekday::Mon);
        let days: Vec<_> = set.iter().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Fri, Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_weekday_set_serializes_as_list() {
        let set: WeekdaySet = [Weekday::Sat, Weekday::Sun].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Sat","Sun"]"#);
    }

    // ── MonthRange ──────────────────────────────────────────────────────

    #[test]
    fn test_month_range_plain() {
        let r = MonthRange::new(4, 10).unwrap();
        assert!(r.includes(4));
        assert!(r.includes(10));
        assert!(!r.includes(3));
        assert!(!r.includes(11));
    }

    #[test]
    fn test_month_range_wraps() {
        let r = MonthRange::new(11, 4).unwrap();
        for m in [11, 12, 1, 2, 3, 4] {
            assert!(r.includes(m), "month {m}");
        }
        for m in 5..=10 {
            assert!(!r.includes(m), "month {m}");
        }
    }

    #[test]
    fn test_month_range_rejects_invalid() {
        assert!(MonthRange::new(0, 4).is_none());
        assert!(MonthRange::new(4, 13).is_none());
    }

    // ── extract_days ────────────────────────────────────────────────────

    #[test]
    fn test_extract_weekday_range() {
        let (q, rest) = extract_days("月~土");
        let q = q.unwrap();
        assert_eq!(q.weekdays, WeekdaySet::range(Weekday::Mon, Weekday::Sat));
        assert_eq!(q.holidays, HolidayMark::Unspecified);
        assert!(rest.trim().is_empty());
    }

    #[test]
    fn test_extract_weekend_and_holidays() {
        let (q, _) = extract_days("土日祝");
        let q = q.unwrap();
        assert_eq!(q.weekdays, WeekdaySet::WEEKEND);
        assert_eq!(q.holidays, HolidayMark::Included);
    }

    #[test]
    fn test_extract_weekday_names_with_suffix() {
        let (q, _) = extract_days("月曜日・水曜・金");
        let days: Vec<_> = q.unwrap().weekdays.iter().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn test_extract_sunday_dont_count_youbi_suffix() {
        let (q, _) = extract_days("月曜日");
        assert_eq!(q.unwrap().weekdays, WeekdaySet::single(Weekday::Mon));
    }

    #[test]
    fn test_extract_heijitsu() {
        let (q, _) = extract_days("平日");
        assert_eq!(q.unwrap().weekdays, WeekdaySet::WEEKDAYS);
    }

    #[test]
    fn test_extract_sunday_holiday_only() {
        let (q, rest) = extract_days("日祝のみ");
        let q = q.unwrap();
        assert_eq!(q.weekdays, WeekdaySet::single(Weekday::Sun));
        assert_eq!(q.holidays, HolidayMark::Included);
        assert!(meaningful_remainder(&rest).is_none());
    }

    #[test]
    fn test_extract_holiday_excluded() {
        let (q, _) = extract_days("平日(祝日を除く)");
        let q = q.unwrap();
        assert_eq!(q.weekdays, WeekdaySet::WEEKDAYS);
        assert_eq!(q.holidays, HolidayMark::Excluded);
    }

    #[test]
    fn test_extract_every_day() {
        let (q, _) = extract_days("毎日");
        let q = q.unwrap();
        assert!(q.every_day);
        assert!(q.weekdays.is_empty());
    }

    #[test]
    fn test_month_and_day_words_are_not_weekdays() {
        for text in ["毎月", "月末", "翌日", "末日", "毎月末日", "最終月曜日", "日没"] {
            let (q, rest) = extract_days(text);
            assert!(q.is_none(), "{text}: {q:?}");
            assert_eq!(rest, text);
        }
    }

    #[test]
    fn test_weekday_kept_beside_month_words() {
        let (q, rest) = extract_days("毎月 月・木");
        let days: Vec<_> = q.unwrap().weekdays.iter().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Thu]);
        assert!(rest.contains("毎月"));

        let (q, _) = extract_days("し、翌日休館 火曜日");
        assert_eq!(q.unwrap().weekdays, WeekdaySet::single(Weekday::Tue));
    }

    #[test]
    fn test_extract_nothing() {
        let (q, rest) = extract_days("プール");
        assert!(q.is_none());
        assert_eq!(rest, "プール");
    }

    // ── extract_months ──────────────────────────────────────────────────

    #[test]
    fn test_extract_month_span() {
        let (ranges, rest) = extract_months("4月~10月 平日");
        assert_eq!(ranges, vec![MonthRange::new(4, 10).unwrap()]);
        assert_eq!(rest.trim(), "平日");
    }

    #[test]
    fn test_extract_month_span_short_form() {
        let (ranges, _) = extract_months("(5~10月)");
        assert_eq!(ranges, vec![MonthRange::new(5, 10).unwrap()]);
    }

    #[test]
    fn test_extract_single_month_but_not_date() {
        let (ranges, rest) = extract_months("8月");
        assert_eq!(ranges, vec![MonthRange::single(8).unwrap()]);
        assert!(rest.trim().is_empty());

        let (ranges, rest) = extract_months("5月5日");
        assert!(ranges.is_empty());
        assert_eq!(rest, "5月5日");
    }

    // ── clock_time ──────────────────────────────────────────────────────

    #[test]
    fn test_clock_time_folds_late_hours() {
        let (t, rolled) = clock_time(24, 0).unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert!(rolled);

        let (t, rolled) = clock_time(9, 30).unwrap();
        assert_eq!(minute_of_day(t), 570);
        assert!(!rolled);

        assert!(clock_time(9, 60).is_none());
    }

    #[test]
    fn test_meaningful_remainder() {
        assert_eq!(meaningful_remainder(" ・(), "), None);
        assert_eq!(meaningful_remainder(" 雨天中止 ").as_deref(), Some("雨天中止"));
    }
}
