//! Text cleanup shared by both parsers.
//!
//! Facility data mixes full-width and half-width forms freely
//! (`９：００～１７：００`, `9:00〜17:00`, `9:00~17:00`). Everything downstream
//! matches against the half-width form produced here.

/// Normalize a raw hours or closed-days string.
///
/// - Full-width ASCII (U+FF01–U+FF5E) becomes half-width.
/// - The range glyphs `〜` (U+301C) and `～` (U+FF5E) become `~`.
/// - The ideographic space and any whitespace run collapse to one space, or
///   to one line break when the run contains one (line breaks separate
///   statements).
/// - Spaces around `,` and `/` are removed; the ends are trimmed.
///
/// Total: `None` in gives `None` out, anything else gives `Some`.
///
/// # Examples
///
/// ```
/// use hours_engine::normalize::normalize;
///
/// assert_eq!(
///     normalize(Some("９：００〜１７：００ ／ 土日")).as_deref(),
///     Some("9:00~17:00/土日")
/// );
/// assert_eq!(normalize(None), None);
/// ```
pub fn normalize(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_str)
}

/// Normalize a present string. See [`normalize`].
pub fn normalize_str(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    // Pending whitespace run: None, a space, or a line break.
    let mut run: Option<char> = None;
    for ch in raw.chars().map(to_half_width) {
        if ch.is_whitespace() {
            run = match (run, ch) {
                (Some('\n'), _) | (_, '\n') => Some('\n'),
                _ => Some(' '),
            };
            continue;
        }
        if let Some(sep) = run.take() {
            collapsed.push(sep);
        }
        collapsed.push(ch);
    }

    // Drop spaces adjacent to list separators.
    let mut result = String::with_capacity(collapsed.len());
    let chars: Vec<char> = collapsed.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        if ch == ' ' {
            let before = i.checked_sub(1).map(|j| chars[j]);
            let after = chars.get(i + 1).copied();
            if matches!(before, Some(',' | '/')) || matches!(after, Some(',' | '/')) {
                continue;
            }
        }
        result.push(ch);
    }
    result.trim_matches(|c: char| c == ' ' || c == '\n').to_string()
}

fn to_half_width(ch: char) -> char {
    match ch {
        '\u{301C}' | '\u{FF5E}' => '~',
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5D}' => char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch),
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_width_digits_and_colon() {
        assert_eq!(normalize_str("９：００"), "9:00");
    }

    #[test]
    fn test_tilde_glyphs_unified() {
        assert_eq!(normalize_str("9:00〜17:00"), "9:00~17:00");
        assert_eq!(normalize_str("9:00～17:00"), "9:00~17:00");
        assert_eq!(normalize_str("9:00~17:00"), "9:00~17:00");
    }

    #[test]
    fn test_full_width_parens_and_slash() {
        assert_eq!(normalize_str("（５～１０月）"), "(5~10月)");
        assert_eq!(normalize_str("月 ／ 火"), "月/火");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(normalize_str("  月～金\u{3000}\u{3000}9:00～17:00 \n"), "月~金 9:00~17:00");
    }

    #[test]
    fn test_line_breaks_kept_once() {
        assert_eq!(
            normalize_str("平日 9:00～21:00 \r\n\n 土日 9:00～17:00"),
            "平日 9:00~21:00\n土日 9:00~17:00"
        );
    }

    #[test]
    fn test_space_around_comma_removed() {
        assert_eq!(normalize_str("5日 , 20日"), "5日,20日");
        assert_eq!(normalize_str("5日，20日"), "5日,20日");
    }

    #[test]
    fn test_japanese_text_untouched() {
        assert_eq!(normalize_str("祝日の場合は翌日"), "祝日の場合は翌日");
        assert_eq!(normalize_str("年末年始、第3水曜日"), "年末年始、第3水曜日");
    }

    #[test]
    fn test_absent_input_stays_absent() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")).as_deref(), Some(""));
    }
}
