//! `DATE` header formatting.

use chrono::{DateTime, Utc};

/// Formats `at` the way HTTP `Date` headers are written:
/// `Dow, DD Mon YYYY HH:MM:SS GMT`.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use ssdp_core::protocol::date::http_date;
///
/// let at = Utc.with_ymd_and_hms(2011, 3, 6, 9, 5, 7).unwrap();
/// assert_eq!(http_date(at), "Sun, 06 Mar 2011 09:05:07 GMT");
/// ```
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// [`http_date`] for the current instant.
pub fn http_date_now() -> String {
    http_date(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_http_date_pads_day_and_time_fields() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(http_date(at), "Tue, 02 Jan 2024 03:04:05 GMT");
    }

    #[test]
    fn test_http_date_now_ends_with_gmt() {
        assert!(http_date_now().ends_with(" GMT"));
    }
}
