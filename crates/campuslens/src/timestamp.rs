//! Best-effort parsing of free-text event timestamps.
//!
//! Activity timestamps are imported verbatim and arrive in several layouts.
//! [`parse_event_timestamp`] tries each known layout in order and the first
//! one that parses wins. Values matching none of them are kept and ordered
//! after every parsed value by [`SortKey`].

use chrono::NaiveDateTime;

/// Accepted layouts, in the order they are tried.
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Parse a timestamp using the first matching layout.
#[must_use]
pub fn parse_event_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

/// Ordering key for a raw timestamp.
///
/// Parsed values compare chronologically; all unparsed values (including
/// missing ones) compare equal to each other and greater than any parsed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    /// A timestamp in one of the known layouts.
    Parsed(NaiveDateTime),
    /// Missing or unrecognized.
    Unparsed,
}

impl SortKey {
    /// Build the key for an optional raw timestamp.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Self {
        raw.and_then(parse_event_timestamp)
            .map_or(Self::Unparsed, Self::Parsed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_iso_with_seconds() {
        assert_eq!(
            parse_event_timestamp("2024-01-05 09:30:15"),
            Some(at(2024, 1, 5, 9, 30, 15))
        );
    }

    #[test]
    fn test_parse_iso_without_seconds() {
        assert_eq!(
            parse_event_timestamp("2024-01-05 09:30"),
            Some(at(2024, 1, 5, 9, 30, 0))
        );
    }

    #[test]
    fn test_parse_day_first_with_seconds() {
        assert_eq!(
            parse_event_timestamp("05-01-2024 09:30:15"),
            Some(at(2024, 1, 5, 9, 30, 15))
        );
    }

    #[test]
    fn test_parse_day_first_without_seconds() {
        assert_eq!(
            parse_event_timestamp("05-01-2024 09:30"),
            Some(at(2024, 1, 5, 9, 30, 0))
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(parse_event_timestamp("  2024-01-05 09:30  ").is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_event_timestamp(""), None);
        assert_eq!(parse_event_timestamp("yesterday"), None);
        assert_eq!(parse_event_timestamp("2024-01-05"), None);
        assert_eq!(parse_event_timestamp("2024-13-05 09:30"), None);
    }

    #[test]
    fn test_sort_key_orders_chronologically() {
        let earlier = SortKey::from_raw(Some("05-01-2024 09:30"));
        let later = SortKey::from_raw(Some("2024-01-05 10:00:00"));
        assert!(earlier < later);
    }

    #[test]
    fn test_sort_key_unparsed_sorts_last() {
        let parsed = SortKey::from_raw(Some("2999-12-31 23:59:59"));
        assert!(parsed < SortKey::from_raw(Some("not a date")));
        assert!(parsed < SortKey::from_raw(None));
        assert_eq!(
            SortKey::from_raw(Some("junk")),
            SortKey::from_raw(None)
        );
    }
}
