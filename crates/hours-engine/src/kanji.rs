//! Kanji numeral conversion for day-of-month values (`十五日`, `二十日`).

/// Value of a single kanji digit.
const DIGITS: &[(char, u32)] = &[
    ('〇', 0),
    ('零', 0),
    ('一', 1),
    ('二', 2),
    ('三', 3),
    ('四', 4),
    ('五', 5),
    ('六', 6),
    ('七', 7),
    ('八', 8),
    ('九', 9),
];

/// Positional units, largest first.
const UNITS: &[(char, u32)] = &[('百', 100), ('十', 10)];

/// Convert a kanji (or ASCII) numeral to an integer.
///
/// Handles both the positional form (`二十五`, `十`, `百二`) and the
/// digit-by-digit form (`二五`, `三〇`). ASCII digits pass straight through.
/// Returns `None` for empty input or any character outside the tables.
///
/// # Examples
///
/// ```
/// use hours_engine::kanji::kanji_to_number;
///
/// assert_eq!(kanji_to_number("十五"), Some(15));
/// assert_eq!(kanji_to_number("二十"), Some(20));
/// assert_eq!(kanji_to_number("三十一"), Some(31));
/// assert_eq!(kanji_to_number("12"), Some(12));
/// assert_eq!(kanji_to_number("第"), None);
/// ```
pub fn kanji_to_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }

    let mut total = 0u32;
    // Digit waiting for a unit, or a trailing ones digit.
    let mut pending: Option<u32> = None;
    let mut has_unit = false;

    for ch in s.chars() {
        if let Some(&(_, unit)) = UNITS.iter().find(|(c, _)| *c == ch) {
            total += pending.take().unwrap_or(1) * unit;
            has_unit = true;
        } else if let Some(&(_, digit)) = DIGITS.iter().find(|(c, _)| *c == ch) {
            pending = Some(match pending {
                // Digit-by-digit form ("二五") only makes sense without units.
                Some(prev) if !has_unit => prev.checked_mul(10)?.checked_add(digit)?,
                Some(_) => return None,
                None => digit,
            });
        } else {
            return None;
        }
    }

    Some(total + pending.unwrap_or(0))
}
