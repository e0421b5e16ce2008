use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Dates outside this year range are treated as missing when sorting.
pub const MIN_SORT_YEAR: i32 = 1970;
pub const MAX_SORT_YEAR: i32 = 2038;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

/// Best-effort parse of a date string found in a feed or page.
///
/// Accepts RFC 3339, RFC 2822 and a handful of common layouts. Values without
/// an offset are taken as UTC; bare dates as midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Parses `raw` and keeps it only if its year lies in the sortable range.
pub fn parse_sortable(raw: &str) -> Option<DateTime<Utc>> {
    parse_date(raw).filter(|dt| (MIN_SORT_YEAR..=MAX_SORT_YEAR).contains(&dt.year()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(raw: &str) -> Option<(i32, u32, u32)> {
        parse_date(raw).map(|dt| (dt.year(), dt.month(), dt.day()))
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(ymd("2023-06-01T12:00:00Z"), Some((2023, 6, 1)));
        assert_eq!(ymd("2023-06-01T23:30:00-05:00"), Some((2023, 6, 2)));
    }

    #[test]
    fn test_parse_rfc2822() {
        assert_eq!(ymd("Thu, 01 Jun 2023 10:00:00 GMT"), Some((2023, 6, 1)));
        assert_eq!(ymd("Fri, 01 Jan 2021 00:00:00 +0000"), Some((2021, 1, 1)));
    }

    #[test]
    fn test_parse_common_layouts() {
        assert_eq!(ymd("2021-01-01"), Some((2021, 1, 1)));
        assert_eq!(ymd("2021-01-01 08:15:00"), Some((2021, 1, 1)));
        assert_eq!(ymd("1 May 2023"), Some((2023, 5, 1)));
        assert_eq!(ymd("March 3, 2024"), Some((2024, 3, 3)));
        assert_eq!(ymd("  2022/12/31 "), Some((2022, 12, 31)));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("32/13/2020"), None);
    }

    #[test]
    fn test_sortable_year_window() {
        assert!(parse_sortable("1970-01-01").is_some());
        assert!(parse_sortable("2038-12-31").is_some());
        assert!(parse_sortable("1969-12-31").is_none());
        assert!(parse_sortable("2039-01-01").is_none());
    }
}
