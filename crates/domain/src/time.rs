//! Time and timestamp helpers.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// UTC timestamp used for forecast samples, event times and run bookkeeping.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// The instant at which `date` starts in `tz`.
///
/// When midnight falls in a DST gap the first valid instant of the day is
/// used, and when it is ambiguous the earliest one.
#[must_use]
pub fn local_midnight(tz: Tz, date: NaiveDate) -> Timestamp {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST jump: shift past the gap.
        None => tz
            .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
            .earliest()
            .map_or_else(|| midnight.and_utc(), |local| local.with_timezone(&Utc)),
    }
}

/// The local calendar date following the one `at` falls on in `tz`.
#[must_use]
pub fn next_local_date(tz: Tz, at: Timestamp) -> NaiveDate {
    let today = at.with_timezone(&tz).date_naive();
    today.checked_add_days(Days::new(1)).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_convert_local_midnight_to_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let ts = local_midnight(chrono_tz::Europe::Amsterdam, date);
        assert_eq!(ts.to_rfc3339(), "2024-01-14T23:00:00+00:00");
    }

    #[test]
    fn should_return_next_local_date_when_utc_date_lags() {
        let at = "2024-06-30T22:30:00Z".parse::<Timestamp>().unwrap();
        let next = next_local_date(chrono_tz::Europe::Amsterdam, at);
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
    }
}
