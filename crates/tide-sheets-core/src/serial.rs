//! Excel serial date conversion
//!
//! Excel stores dates as day counts from an epoch: the 1900 system (serial
//! 1 = 1900-01-01) or the 1904 system (serial 0 = 1904-01-01). The 1900
//! system contains a phantom 1900-02-29 (serial 60), which every date after
//! 1900-02-28 must compensate for. Time of day is the fractional part.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch_1900() -> NaiveDate {
    // Serial 1 = 1900-01-01, so day zero is 1899-12-31; after the phantom
    // leap day the effective day zero becomes 1899-12-30.
    NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()
}

fn epoch_1904() -> NaiveDate {
    NaiveDate::from_ymd_opt(1904, 1, 1).unwrap()
}

fn leap_bug_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 3, 1).unwrap()
}

/// Convert a date/time to an Excel serial number.
pub fn datetime_to_serial(dt: NaiveDateTime, date_1904: bool) -> f64 {
    let date = dt.date();
    let days = if date_1904 {
        (date - epoch_1904()).num_days() as f64
    } else {
        let mut days = (date - epoch_1900()).num_days() as f64;
        if date >= leap_bug_cutoff() {
            days += 1.0; // account for the phantom 1900-02-29
        }
        days
    };

    let seconds = dt.time().num_seconds_from_midnight() as f64
        + dt.time().nanosecond() as f64 / 1_000_000_000.0;

    days + seconds / SECONDS_PER_DAY
}

/// Convert an Excel serial number back to a date/time.
///
/// Returns `None` for serials outside the representable range. Serial 60 in
/// the 1900 system (the phantom leap day) maps to 1900-02-28.
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = serial.trunc() as i64;
    let frac = serial.fract();

    let date = if date_1904 {
        epoch_1904().checked_add_signed(Duration::days(days))?
    } else {
        let adjusted = if days >= 60 { days - 1 } else { days };
        epoch_1900().checked_add_signed(Duration::days(adjusted))?
    };

    let total_seconds = (frac * SECONDS_PER_DAY).round() as i64;
    // Rounding can land exactly on midnight of the next day
    let (date, total_seconds) = if total_seconds >= 86_400 {
        (date.checked_add_signed(Duration::days(1))?, 0)
    } else {
        (date, total_seconds)
    };
    let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(total_seconds as u32, 0)?;

    Some(NaiveDateTime::new(date, time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_1900_epoch() {
        assert_eq!(datetime_to_serial(dt(1900, 1, 1, 0, 0, 0), false), 1.0);
        assert_eq!(datetime_to_serial(dt(1900, 2, 28, 0, 0, 0), false), 59.0);
        // The phantom leap day pushes everything after Feb 1900 up by one
        assert_eq!(datetime_to_serial(dt(1900, 3, 1, 0, 0, 0), false), 61.0);
        assert_eq!(datetime_to_serial(dt(2023, 6, 15, 0, 0, 0), false), 45092.0);
    }

    #[test]
    fn test_1904_epoch() {
        assert_eq!(datetime_to_serial(dt(1904, 1, 1, 0, 0, 0), true), 0.0);
        assert_eq!(datetime_to_serial(dt(1904, 1, 2, 0, 0, 0), true), 1.0);
    }

    #[test]
    fn test_time_fraction() {
        let serial = datetime_to_serial(dt(2023, 6, 15, 12, 0, 0), false);
        assert!((serial - 45092.5).abs() < 1e-9);
    }

    #[test]
    fn test_roundtrip() {
        for value in [
            dt(1900, 1, 1, 0, 0, 0),
            dt(1999, 12, 31, 23, 59, 59),
            dt(2023, 6, 15, 12, 30, 45),
            dt(2100, 1, 1, 6, 0, 0),
        ] {
            let serial = datetime_to_serial(value, false);
            assert_eq!(serial_to_datetime(serial, false), Some(value));
        }
    }

    #[test]
    fn test_roundtrip_1904() {
        let value = dt(2023, 6, 15, 8, 15, 0);
        let serial = datetime_to_serial(value, true);
        assert_eq!(serial_to_datetime(serial, true), Some(value));
    }

    #[test]
    fn test_phantom_leap_day() {
        // Serial 60 is 1900-02-29, which never existed
        assert_eq!(
            serial_to_datetime(60.0, false),
            Some(dt(1900, 2, 28, 0, 0, 0))
        );
        assert_eq!(
            serial_to_datetime(61.0, false),
            Some(dt(1900, 3, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_invalid_serials() {
        assert_eq!(serial_to_datetime(-1.0, false), None);
        assert_eq!(serial_to_datetime(f64::NAN, false), None);
        assert_eq!(serial_to_datetime(f64::INFINITY, false), None);
    }
}
