//! Report date parsing.
//!
//! Turns strings like "yesterday", "2 days ago" or "2026-10-01" into the
//! ISO 8601 calendar dates stored on reports.

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the local timezone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a human-readable date into a `YYYY-MM-DD` string.
///
/// Supports:
/// - ISO dates: "2026-10-17" (passed through)
/// - Datetimes: "2026-10-17 12:00:00" (time dropped)
/// - Relative past: "2 days ago", "1 week ago"
/// - Relative future: "in 2 days", "in 1 week"
/// - Named: "today", "yesterday", "tomorrow"
///
/// Returns None if the string cannot be parsed.
pub fn parse_report_date(input: &str) -> Option<String> {
    parse_relative_to(input, Local::now().naive_local()).map(format_date)
}

/// Parse a stored report date. Accepts a bare date or an RFC 3339 timestamp.
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_relative_to(input: &str, now: NaiveDateTime) -> Option<NaiveDate> {
    let input = input.trim().to_lowercase();

    if let Ok(date) = NaiveDate::parse_from_str(&input, DATE_FORMAT) {
        return Some(date);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(&input, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    match input.as_str() {
        "now" | "today" => return Some(now.date()),
        "yesterday" => return Some((now - Duration::days(1)).date()),
        "tomorrow" => return Some((now + Duration::days(1)).date()),
        _ => {}
    }

    if let Some(duration) = parse_ago(&input) {
        return now.checked_sub_signed(duration).map(|dt| dt.date());
    }

    if let Some(duration) = parse_in_future(&input) {
        return now.checked_add_signed(duration).map(|dt| dt.date());
    }

    None
}

/// Parse "X unit(s) ago" pattern
fn parse_ago(input: &str) -> Option<Duration> {
    let without_ago = input.trim().strip_suffix(" ago")?;
    parse_duration(without_ago)
}

/// Parse "in X unit(s)" pattern
fn parse_in_future(input: &str) -> Option<Duration> {
    let without_in = input.trim().strip_prefix("in ")?;
    parse_duration(without_in)
}

/// Parse a duration like "2 days", "1 week", "3d"
fn parse_duration(input: &str) -> Option<Duration> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    if parts.len() == 2 {
        let num: i64 = parts[0].parse().ok()?;
        return unit_to_duration(parts[1], num);
    }

    if parts.len() == 1 {
        let s = parts[0];
        let num_end = s.chars().take_while(|c| c.is_ascii_digit()).count();
        if num_end > 0 && num_end < s.len() {
            let num: i64 = s[..num_end].parse().ok()?;
            return unit_to_duration(&s[num_end..], num);
        }
    }

    None
}

/// Out-of-range amounts give None.
fn unit_to_duration(unit: &str, num: i64) -> Option<Duration> {
    let unit = unit.trim_end_matches('s');
    match unit {
        "hour" | "hr" | "h" => Duration::try_hours(num),
        "day" | "d" => Duration::try_days(num),
        "week" | "wk" | "w" => Duration::try_weeks(num),
        "month" | "mon" => Duration::try_days(num.checked_mul(30)?), // Approximate
        "year" | "yr" | "y" => Duration::try_days(num.checked_mul(365)?), // Approximate
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, DATE_FORMAT)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn parse(input: &str) -> Option<String> {
        parse_relative_to(input, noon("2026-10-17")).map(format_date)
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(parse("2026-01-28"), Some("2026-01-28".to_string()));
        assert_eq!(parse("2026-01-28 23:10:00"), Some("2026-01-28".to_string()));
    }

    #[test]
    fn test_named_dates() {
        assert_eq!(parse("today"), Some("2026-10-17".to_string()));
        assert_eq!(parse("Yesterday"), Some("2026-10-16".to_string()));
        assert_eq!(parse("tomorrow"), Some("2026-10-18".to_string()));
    }

    #[test]
    fn test_relative() {
        assert_eq!(parse("2 days ago"), Some("2026-10-15".to_string()));
        assert_eq!(parse("1 week ago"), Some("2026-10-10".to_string()));
        assert_eq!(parse("3d ago"), Some("2026-10-14".to_string()));
        assert_eq!(parse("in 2 weeks"), Some("2026-10-31".to_string()));
    }

    #[test]
    fn test_invalid() {
        assert!(parse("not a date").is_none());
        assert!(parse("2026-13-01").is_none());
        assert!(parse("5 fortnights ago").is_none());
    }

    #[test]
    fn test_huge_amounts_are_rejected() {
        assert!(parse("999999999999999 weeks ago").is_none());
        assert!(parse("999999999999999999 months ago").is_none());
        assert!(parse("in 999999999999999999 years").is_none());
        assert!(parse("99999999999999999999 days ago").is_none());
        assert!(parse("in 99999999 days").is_none());
        assert!(parse_report_date("999999999999999 weeks ago").is_none());
    }

    #[test]
    fn test_parse_iso_date_accepts_timestamps() {
        assert_eq!(
            parse_iso_date("2026-10-17T08:30:00.000Z"),
            NaiveDate::from_ymd_opt(2026, 10, 17)
        );
        assert_eq!(parse_iso_date(" 2026-10-17 "), NaiveDate::from_ymd_opt(2026, 10, 17));
        assert_eq!(parse_iso_date("17/10/2026"), None);
    }
}
