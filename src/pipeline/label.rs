use std::fmt::Display;

use chrono::{DateTime, TimeZone};

/// `D/M/YYYY H:MMAM|PM`, no padding on day, month or hour.
pub const LABEL_FORMAT: &str = "%-d/%-m/%Y %-I:%M%p";

/// Characters any rendered label can contain.
pub const LABEL_CHARSET: &str = "0123456789/: AMP";

/// Timestamp label for a capture that started at `at`.
pub fn format_label<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(LABEL_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> String {
        format_label(&Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
    }

    #[test]
    fn test_afternoon_label() {
        assert_eq!(at(2024, 1, 3, 14, 5), "3/1/2024 2:05PM");
    }

    #[test]
    fn test_midnight_and_noon() {
        assert_eq!(at(2023, 12, 25, 0, 0), "25/12/2023 12:00AM");
        assert_eq!(at(2023, 12, 25, 12, 30), "25/12/2023 12:30PM");
    }

    #[test]
    fn test_morning_label() {
        assert_eq!(at(2024, 10, 9, 9, 59), "9/10/2024 9:59AM");
    }

    #[test]
    fn test_labels_only_use_charset() {
        let label = at(2024, 11, 28, 23, 47);
        assert!(label.chars().all(|c| LABEL_CHARSET.contains(c)));
    }
}
