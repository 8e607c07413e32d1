//! Raw date string → validated calendar date.
//!
//! Patterns are tried in a fixed order and the first structural match wins,
//! even when a later pattern would also have validated. `"12/08"` therefore
//! always reads as December 2008 (`MM/YY`), never as a truncated `DD/MM`.

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Default slack, in years, before a two-digit year rolls back a century.
pub const DEFAULT_CENTURY_WINDOW: i32 = 10;

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2100;

/// A validated calendar date. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParsedDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl ParsedDate {
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

/// Field layout of one accepted pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// MM/YYYY
    MonthYear4,
    /// MM/YY
    MonthYear2,
    /// DD/MM/YY
    DayMonthYear2,
    /// DD/MM/YYYY
    DayMonthYear4,
    /// YYYY/MM/DD
    YearMonthDay,
    /// DDMMYY
    CompactDayMonthYear,
    /// MMYY
    CompactMonthYear,
}

impl Layout {
    /// Capture group indices of (day, month, year). Day None means the first.
    fn groups(self) -> (Option<usize>, usize, usize) {
        match self {
            Layout::MonthYear4 | Layout::MonthYear2 | Layout::CompactMonthYear => (None, 1, 2),
            Layout::DayMonthYear2 | Layout::DayMonthYear4 | Layout::CompactDayMonthYear => {
                (Some(1), 2, 3)
            }
            Layout::YearMonthDay => (Some(3), 2, 1),
        }
    }
}

fn patterns() -> &'static [(Regex, Layout)] {
    static PATTERNS: OnceLock<Vec<(Regex, Layout)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"^(\d{1,2})/(\d{4})$", Layout::MonthYear4),
            (r"^(\d{1,2})/(\d{2})$", Layout::MonthYear2),
            (r"^(\d{1,2})/(\d{1,2})/(\d{2})$", Layout::DayMonthYear2),
            (r"^(\d{1,2})/(\d{1,2})/(\d{4})$", Layout::DayMonthYear4),
            (r"^(\d{4})/(\d{1,2})/(\d{1,2})$", Layout::YearMonthDay),
            (r"^(\d{2})(\d{2})(\d{2})$", Layout::CompactDayMonthYear),
            (r"^(\d{2})(\d{2})$", Layout::CompactMonthYear),
        ]
        .into_iter()
        .map(|(pattern, layout)| (Regex::new(pattern).expect("date pattern is valid"), layout))
        .collect()
    })
}

/// Strips whitespace and anything that is not a digit or `/ . -`, then
/// normalizes every separator to `/`.
pub fn clean_date_string(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '/' | '.' | '-'))
        .map(|c| if c == '.' || c == '-' { '/' } else { c })
        .collect()
}

/// Expands a two-digit year relative to `current_year`.
///
/// Years beyond `current_year % 100 + window` belong to the previous century.
pub fn normalize_two_digit_year(year: i32, current_year: i32, window: i32) -> i32 {
    let century = (current_year / 100) * 100;
    let two_digit_year = current_year % 100;

    if year > two_digit_year + window {
        century - 100 + year
    } else {
        century + year
    }
}

/// Parses a raw date string against the local clock's current year.
pub fn parse_date(s: &str) -> Option<ParsedDate> {
    parse_date_with(s, Local::now().year(), DEFAULT_CENTURY_WINDOW)
}

/// Parses a raw date string. Returns None for anything malformed, out of
/// range or not on the calendar.
pub fn parse_date_with(s: &str, current_year: i32, century_window: i32) -> Option<ParsedDate> {
    let cleaned = clean_date_string(s);

    let (caps, layout) = patterns()
        .iter()
        .find_map(|(re, layout)| re.captures(&cleaned).map(|caps| (caps, *layout)))?;

    let (day_group, month_group, year_group) = layout.groups();
    let field = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());

    let month = field(month_group)?;
    let day = match day_group {
        Some(idx) => field(idx)?,
        None => 1,
    };
    let year_text = caps.get(year_group)?.as_str();
    let raw_year = year_text.parse::<i32>().ok()?;
    let year = if year_text.len() == 2 {
        normalize_two_digit_year(raw_year, current_year, century_window)
    } else {
        raw_year
    };

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }

    // from_ymd_opt rejects impossible days instead of rolling them over
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(ParsedDate {
        year: date.year(),
        month: date.month(),
        day: date.day(),
    })
}

/// Parses every string, keeping only the successes.
pub fn parse_dates<S: AsRef<str>>(strings: &[S]) -> Vec<NaiveDate> {
    parse_dates_with(strings, Local::now().year(), DEFAULT_CENTURY_WINDOW)
}

pub fn parse_dates_with<S: AsRef<str>>(strings: &[S], current_year: i32, century_window: i32) -> Vec<NaiveDate> {
    strings
        .iter()
        .filter_map(|s| parse_date_with(s.as_ref(), current_year, century_window))
        .filter_map(ParsedDate::to_naive_date)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEAR: i32 = 2025;

    fn parse(s: &str) -> Option<(i32, u32, u32)> {
        parse_date_with(s, YEAR, DEFAULT_CENTURY_WINDOW).map(|d| (d.year, d.month, d.day))
    }

    #[test]
    fn test_clean_date_string() {
        assert_eq!(clean_date_string(" 12.08-26 "), "12/08/26");
        assert_eq!(clean_date_string("EXP: 12 / 08 / 2026"), "12/08/2026");
        assert_eq!(clean_date_string("abc"), "");
    }

    #[test]
    fn test_each_pattern() {
        assert_eq!(parse("05/2027"), Some((2027, 5, 1)), "MM/YYYY");
        assert_eq!(parse("05/27"), Some((2027, 5, 1)), "MM/YY");
        assert_eq!(parse("12/08/26"), Some((2026, 8, 12)), "DD/MM/YY");
        assert_eq!(parse("1/2/27"), Some((2027, 2, 1)), "D/M/YY");
        assert_eq!(parse("12/08/2026"), Some((2026, 8, 12)), "DD/MM/YYYY");
        assert_eq!(parse("2027/05/10"), Some((2027, 5, 10)), "YYYY/MM/DD");
        assert_eq!(parse("300924"), Some((2024, 9, 30)), "DDMMYY");
        assert_eq!(parse("0527"), Some((2027, 5, 1)), "MMYY");
    }

    #[test]
    fn test_separators_are_normalized() {
        assert_eq!(parse("12.08.2026"), Some((2026, 8, 12)));
        assert_eq!(parse("12-08-26"), Some((2026, 8, 12)));
        assert_eq!(parse("2027-05-10"), Some((2027, 5, 10)));
    }

    #[test]
    fn test_pattern_order_decides_ambiguity() {
        // MM/YY is tried before anything with a day
        assert_eq!(parse("12/08"), Some((2008, 12, 1)));
    }

    #[test]
    fn test_out_of_range_components() {
        assert_eq!(parse("13/2027"), None, "month 13");
        assert_eq!(parse("00/27"), None, "month 0");
        assert_eq!(parse("32/01/27"), None, "day 32");
        assert_eq!(parse("00/01/27"), None, "day 0");
        assert_eq!(parse("01/01/1999"), None, "year before 2000");
        assert_eq!(parse("2101/01/01"), None, "year after 2100");
    }

    #[test]
    fn test_impossible_calendar_dates() {
        assert_eq!(parse("31/02/24"), None);
        assert_eq!(parse("30/02/2028"), None);
        assert_eq!(parse("31/04/27"), None);
        assert_eq!(parse("29/02/23"), None, "2023 is not a leap year");
        assert_eq!(parse("29/02/24"), Some((2024, 2, 29)));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("hello"), None);
        assert_eq!(parse("1/2/3/4"), None);
        assert_eq!(parse("12345"), None);
        assert_eq!(parse("///"), None);
    }

    #[test]
    fn test_two_digit_year_century_boundary() {
        // twoDigitYear = 25, boundary = 35
        assert_eq!(normalize_two_digit_year(35, 2025, 10), 2035);
        assert_eq!(normalize_two_digit_year(36, 2025, 10), 1936);
        assert_eq!(normalize_two_digit_year(80, 2025, 10), 1980);
        assert_eq!(normalize_two_digit_year(0, 2025, 10), 2000);
        assert_eq!(normalize_two_digit_year(24, 2025, 10), 2024);
    }

    #[test]
    fn test_century_boundary_through_parser() {
        assert_eq!(parse("01/01/35"), Some((2035, 1, 1)));
        // Rolls back to 1936, which is outside the accepted range
        assert_eq!(parse("01/01/36"), None);
    }

    #[test]
    fn test_boundary_moves_with_current_year() {
        assert_eq!(
            parse_date_with("01/01/36", 2026, DEFAULT_CENTURY_WINDOW).map(|d| d.year),
            Some(2036)
        );
        assert_eq!(
            parse_date_with("01/01/99", 2095, DEFAULT_CENTURY_WINDOW).map(|d| d.year),
            Some(2099)
        );
    }

    #[test]
    fn test_parsed_dates_order_chronologically() {
        let june = parse_date_with("01/06/27", 2025, 10).unwrap();
        let mid_january = parse_date_with("15/01/27", 2025, 10).unwrap();
        let next_new_year = parse_date_with("01/01/28", 2025, 10).unwrap();
        let december = parse_date_with("02/12/26", 2025, 10).unwrap();

        assert!(mid_january < june);
        assert!(december < next_new_year);
        assert_eq!(
            [june, mid_january, next_new_year, december].iter().min(),
            Some(&december)
        );
    }

    #[test]
    fn test_parse_dates_keeps_successes() {
        let dates = parse_dates_with(&["12/08/26", "garbage", "31/02/24", "300924"], YEAR, DEFAULT_CENTURY_WINDOW);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 8, 12).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
            ]
        );
    }
}
