// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions around time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hifitime::Epoch;

use crate::constants::{
    BAD_CLOCK_DRIFT_PER_DAY, BAD_CLOCK_OFFSET, BAD_CLOCK_REFERENCE, BAD_CLOCK_WINDOW,
    SECONDS_PER_DAY,
};

/// Parse a UTC date string like "2016-04-15T00:12:23.5" (a space may be used
/// instead of the "T", and the time may be omitted entirely) into whole Unix
/// seconds and microseconds.
pub fn parse_utc_date(s: &str) -> Option<(i64, i64)> {
    let s = s.trim();
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    let dt = naive.and_utc();
    Some((dt.timestamp(), i64::from(dt.timestamp_subsec_micros())))
}

/// Format whole Unix seconds as "%Y-%m-%d %H:%M:%S" (UTC).
pub fn format_utc_date(unix_seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(unix_seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Convert a Unix time into an [Epoch].
pub fn epoch_from_unix(unix_seconds: f64) -> Epoch {
    Epoch::from_unix_seconds(unix_seconds)
}

/// Files recorded between 2012-10-01 and 2012-11-06 carry a DAQ clock that ran
/// ahead of true time by an amount that grew linearly. If `unix_seconds` falls
/// in that window, the corrected time is returned.
pub fn correct_bad_clock(unix_seconds: i64) -> Option<i64> {
    let (start, end) = BAD_CLOCK_WINDOW;
    if unix_seconds > start && unix_seconds < end {
        // Whole days only.
        let days = (unix_seconds - BAD_CLOCK_REFERENCE) / SECONDS_PER_DAY;
        let dt = BAD_CLOCK_OFFSET + days as f64 * BAD_CLOCK_DRIFT_PER_DAY;
        Some((unix_seconds as f64 - dt) as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_date_with_fraction() {
        let (s, us) = parse_utc_date("2016-04-15T00:12:23.5").unwrap();
        assert_eq!(s, 1460679143);
        assert_eq!(us, 500000);
    }

    #[test]
    fn test_parse_utc_date_variants() {
        assert_eq!(
            parse_utc_date("2016-04-15 00:12:23"),
            Some((1460679143, 0))
        );
        assert_eq!(parse_utc_date("2016-04-15"), Some((1460678400, 0)));
        assert_eq!(parse_utc_date("yesterday"), None);
        assert_eq!(parse_utc_date(""), None);
    }

    #[test]
    fn test_format_utc_date() {
        assert_eq!(
            format_utc_date(1460679143).as_deref(),
            Some("2016-04-15 00:12:23")
        );
    }

    #[test]
    fn test_epoch_from_unix() {
        let e = epoch_from_unix(1460678400.0);
        let diff = e - Epoch::from_gregorian_utc_at_midnight(2016, 4, 15);
        assert!(diff.to_seconds().abs() < 1e-6);
    }

    #[test]
    fn test_bad_clock_correction() {
        // At the reference time, only the fixed offset applies.
        assert_eq!(correct_bad_clock(1351753823), Some(1351753823 - 711));
        // Two whole days later: 711 + 2 * 21.5 = 754.
        assert_eq!(
            correct_bad_clock(1351753823 + 2 * 86400 + 100),
            Some(1351753823 + 2 * 86400 + 100 - 754)
        );
        // A partial day before the reference truncates towards zero.
        assert_eq!(correct_bad_clock(1351753823 - 100), Some(1351753823 - 100 - 711));
        assert_eq!(correct_bad_clock(1349049600), None);
        assert_eq!(correct_bad_clock(1460679143), None);
    }
}
