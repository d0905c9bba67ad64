use crate::model::{Cell, ParseOutcome};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::sync::LazyLock;

/// Day 0 of spreadsheet date serials.
pub const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial a spreadsheet can hold (9999-12-31).
pub const SERIAL_MAX: f64 = 2_958_465.0;

/// Numeric cells in this range are taken for date serials when a column has
/// no text dates at all (roughly 1954 to 2119).
pub const DATE_SERIAL_PLAUSIBLE: RangeInclusive<f64> = 20_000.0..=80_000.0;

/// Years a spreadsheet date cell can hold. Parsed dates outside it are
/// malformed.
pub const SPREADSHEET_YEARS: RangeInclusive<i32> = 1900..=9999;

static NUMERIC_LOOKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?[$€]?\s*[-+]?[\d.,\s]*\d[\d.,\s]*$").expect("numeric pattern compiles")
});

/// Normalize a number written with any thousands/decimal convention into a
/// plain `1234.56` form.
///
/// Handles formats like:
/// - "1.234,56" -> "1234.56"
/// - "1,234.56" -> "1234.56"
/// - "$ 12.000" -> "12000"
/// - "12,5" -> "12.5"
/// - "" or "abc" -> ""
pub fn normalize_number(text: &str) -> String {
    clean_number(text).unwrap_or_default()
}

/// Parse a number with the same rules as [`normalize_number`], keeping the
/// difference between a blank input and one that could not be read.
pub fn parse_number(text: &str) -> ParseOutcome<Decimal> {
    if text.trim().is_empty() {
        return ParseOutcome::Absent;
    }
    match clean_number(text).and_then(|s| Decimal::from_str(&s).ok()) {
        Some(d) => ParseOutcome::Parsed(d),
        None => ParseOutcome::Malformed(format!("not a number: '{}'", text.trim())),
    }
}

/// True for cells that only hold a number with separators, sign and currency
/// marks, e.g. `"$ 12.000"` or `"-1.234,5"`. Dates and codes are excluded.
pub fn looks_numeric(text: &str) -> bool {
    let t = text.trim();
    !t.is_empty() && NUMERIC_LOOKING.is_match(t)
}

fn clean_number(text: &str) -> Option<String> {
    let kept: Vec<char> = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if !kept.iter().any(char::is_ascii_digit) {
        return None;
    }

    let last_comma = kept.iter().rposition(|&c| c == ',');
    let last_period = kept.iter().rposition(|&c| c == '.');

    let cleaned: String = match (last_comma, last_period) {
        (Some(comma), Some(period)) => {
            // Rightmost separator is the decimal one
            let (decimal_pos, thousands) = if comma > period {
                (comma, '.')
            } else {
                (period, ',')
            };
            kept.iter()
                .enumerate()
                .filter(|&(_, &c)| c != thousands)
                .map(|(i, &c)| if i == decimal_pos { '.' } else { c })
                .collect()
        }
        (Some(comma), None) => {
            let trailing = kept.len() - comma - 1;
            let decimal = (1..=2).contains(&trailing)
                && kept[comma + 1..].iter().all(char::is_ascii_digit);
            kept.iter()
                .enumerate()
                .filter_map(|(i, &c)| match c {
                    ',' if decimal && i == comma => Some('.'),
                    ',' => None,
                    _ => Some(c),
                })
                .collect()
        }
        (None, Some(_)) => strip_thousands_periods(&kept),
        (None, None) => kept.iter().collect(),
    };

    Decimal::from_str(&cleaned).ok().map(|_| cleaned)
}

/// Drop periods followed by exactly three digits and then the end or another period.
fn strip_thousands_periods(chars: &[char]) -> String {
    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| {
            if c != '.' {
                return true;
            }
            let group = &chars[i + 1..];
            let is_thousands = group.len() >= 3
                && group[..3].iter().all(char::is_ascii_digit)
                && group.get(3).map_or(true, |&n| n == '.');
            !is_thousands
        })
        .map(|(_, &c)| c)
        .collect()
}

/// Parse a cell as a calendar date.
///
/// Accepts native date cells, spreadsheet serials and text in `dd/mm/yy`,
/// `dd/mm/yyyy`, `yyyy/mm/dd` or `yyyy-mm-dd` form (see [`parse_date_text`]).
pub fn parse_date(cell: &Cell) -> ParseOutcome<NaiveDate> {
    let outcome = match cell {
        Cell::Empty => ParseOutcome::Absent,
        Cell::Date(dt) => ParseOutcome::Parsed(dt.date()),
        Cell::Number(n) => match serial_to_date(*n) {
            Some(d) => ParseOutcome::Parsed(d),
            None => ParseOutcome::Malformed(format!("{n} is not a date serial")),
        },
        Cell::Text(s) => parse_date_text(s),
        Cell::Bool(b) => ParseOutcome::Malformed(format!("{b} is not a date")),
    };
    within_spreadsheet_years(outcome)
}

/// Parse date text, day-first when ambiguous.
///
/// Separators `/`, `-` and `.` are accepted, a trailing time part is
/// ignored, two-digit years map 00-68 to 20xx and 69-99 to 19xx. When the
/// day-first reading is not a valid date the month-first reading is tried.
pub fn parse_date_text(text: &str) -> ParseOutcome<NaiveDate> {
    let t = text.trim();
    if t.is_empty() {
        return ParseOutcome::Absent;
    }

    let date_part = t.split([' ', 'T']).next().unwrap_or(t);
    let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
    let malformed = || ParseOutcome::Malformed(format!("not a date: '{t}'"));

    if parts.len() != 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return malformed();
    }

    let nums: Vec<u32> = match parts.iter().map(|p| p.parse::<u32>()).collect() {
        Ok(n) => n,
        Err(_) => return malformed(),
    };

    let parsed = if parts[0].len() == 4 {
        NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2])
    } else {
        let year = match parts[2].len() {
            2 if nums[2] <= 68 => 2000 + nums[2] as i32,
            2 => 1900 + nums[2] as i32,
            4 => nums[2] as i32,
            _ => return malformed(),
        };
        NaiveDate::from_ymd_opt(year, nums[1], nums[0])
            .or_else(|| NaiveDate::from_ymd_opt(year, nums[0], nums[1]))
    };

    parsed
        .map(|d| within_spreadsheet_years(ParseOutcome::Parsed(d)))
        .unwrap_or_else(malformed)
}

fn within_spreadsheet_years(outcome: ParseOutcome<NaiveDate>) -> ParseOutcome<NaiveDate> {
    match outcome {
        ParseOutcome::Parsed(d) if !SPREADSHEET_YEARS.contains(&d.year()) => {
            ParseOutcome::Malformed(format!("year {} is outside {SPREADSHEET_YEARS:?}", d.year()))
        }
        other => other,
    }
}

/// Convert a spreadsheet serial (days since 1899-12-30) to a date. The
/// fractional part is the time of day and is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=SERIAL_MAX).contains(&serial) {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
}

/// Like [`serial_to_date`] but keeps the time of day.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let date = serial_to_date(serial)?;
    let secs = (serial.fract() * 86_400.0).round() as u32;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs.min(86_399), 0)?;
    Some(date.and_time(time))
}

pub fn is_plausible_serial(n: f64) -> bool {
    n.is_finite() && DATE_SERIAL_PLAUSIBLE.contains(&n)
}

/// Keep only ASCII digits.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_european_thousands_and_decimal() {
        assert_eq!(normalize_number("1.234,56"), "1234.56");
    }

    #[test]
    fn test_us_thousands_and_decimal() {
        assert_eq!(normalize_number("1,234.56"), "1234.56");
    }

    #[test]
    fn test_currency_with_period_thousands() {
        assert_eq!(normalize_number("$ 12.000"), "12000");
        assert_eq!(normalize_number("$1.234.567"), "1234567");
    }

    #[test]
    fn test_empty_is_empty() {
        assert_eq!(normalize_number(""), "");
        assert_eq!(normalize_number("   "), "");
    }

    #[test]
    fn test_comma_decimal_with_two_digits() {
        assert_eq!(normalize_number("12,5"), "12.5");
        assert_eq!(normalize_number("1234,56"), "1234.56");
    }

    #[test]
    fn test_comma_thousands() {
        assert_eq!(normalize_number("45,000"), "45000");
        assert_eq!(normalize_number("1,234,567"), "1234567");
    }

    #[test]
    fn test_period_decimal_kept() {
        assert_eq!(normalize_number("1.5"), "1.5");
        assert_eq!(normalize_number("-3.25"), "-3.25");
    }

    #[test]
    fn test_unparseable_is_empty() {
        assert_eq!(normalize_number("abc"), "");
        assert_eq!(normalize_number("-"), "");
        assert_eq!(normalize_number("1-2"), "");
    }

    #[test]
    fn test_parse_number_outcomes() {
        assert_eq!(parse_number("1.234,56"), ParseOutcome::Parsed(dec!(1234.56)));
        assert_eq!(parse_number(" "), ParseOutcome::Absent);
        assert!(matches!(parse_number("n/a"), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_looks_numeric() {
        assert!(looks_numeric("$ 12.000"));
        assert!(looks_numeric("-1.234,5"));
        assert!(looks_numeric("45 000"));
        assert!(!looks_numeric("05/01/2023"));
        assert!(!looks_numeric("Resina 2"));
        assert!(!looks_numeric("$"));
    }

    #[test]
    fn test_serial_44927_is_new_year_2023() {
        assert_eq!(serial_to_date(44927.0), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date(&Cell::Number(44927.0)), ParseOutcome::Parsed(ymd(2023, 1, 1)));
    }

    #[test]
    fn test_serial_keeps_time() {
        let dt = serial_to_datetime(44927.5).unwrap();
        assert_eq!(dt.date(), ymd(2023, 1, 1));
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }

    #[test]
    fn test_serial_out_of_range() {
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(f64::NAN), None);
        assert!(matches!(parse_date(&Cell::Number(3001234567.0)), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_day_first_forms() {
        assert_eq!(parse_date_text("05/01/2023"), ParseOutcome::Parsed(ymd(2023, 1, 5)));
        assert_eq!(parse_date_text("05/01/23"), ParseOutcome::Parsed(ymd(2023, 1, 5)));
        assert_eq!(parse_date_text("31-12-99"), ParseOutcome::Parsed(ymd(1999, 12, 31)));
        assert_eq!(parse_date_text("5.1.2023"), ParseOutcome::Parsed(ymd(2023, 1, 5)));
    }

    #[test]
    fn test_year_first_forms() {
        assert_eq!(parse_date_text("2023/01/05"), ParseOutcome::Parsed(ymd(2023, 1, 5)));
        assert_eq!(parse_date_text("2023-01-05"), ParseOutcome::Parsed(ymd(2023, 1, 5)));
        assert_eq!(
            parse_date_text("2023-01-05 08:30:00"),
            ParseOutcome::Parsed(ymd(2023, 1, 5))
        );
        assert_eq!(
            parse_date_text("2023-01-05T08:30"),
            ParseOutcome::Parsed(ymd(2023, 1, 5))
        );
    }

    #[test]
    fn test_month_first_fallback() {
        assert_eq!(parse_date_text("12/25/2023"), ParseOutcome::Parsed(ymd(2023, 12, 25)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date_text(""), ParseOutcome::Absent);
        assert_eq!(parse_date(&Cell::Empty), ParseOutcome::Absent);
        assert!(matches!(parse_date_text("mañana"), ParseOutcome::Malformed(_)));
        assert!(matches!(parse_date_text("32/13/2023"), ParseOutcome::Malformed(_)));
        assert!(matches!(parse_date_text("3001234567"), ParseOutcome::Malformed(_)));
    }

    #[test]
    fn test_years_outside_spreadsheet_range() {
        assert!(matches!(parse_date_text("06/01/0023"), ParseOutcome::Malformed(_)));
        assert!(matches!(parse_date_text("01/01/1899"), ParseOutcome::Malformed(_)));
        assert!(matches!(parse_date_text("0023-01-06"), ParseOutcome::Malformed(_)));
        assert!(matches!(parse_date(&Cell::Number(1.0)), ParseOutcome::Malformed(_)));
        assert_eq!(parse_date_text("01/01/1900"), ParseOutcome::Parsed(ymd(1900, 1, 1)));
    }

    #[test]
    fn test_plausible_serial() {
        assert!(is_plausible_serial(44927.0));
        assert!(!is_plausible_serial(3.0));
        assert!(!is_plausible_serial(3001234567.0));
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("1.234.567-8"), "12345678");
    }
}
