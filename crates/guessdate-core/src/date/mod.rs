pub mod estimate;

use chrono::{DateTime, Local, NaiveDateTime};

pub use estimate::{earliest_record, FileTimes};

/// EXIF `DateTime`-style layout: `YYYY:MM:DD HH:mm:ss`.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Convert epoch milliseconds to local wall-clock time.
/// EXIF datetimes carry no zone, so the local view is what gets written.
pub fn local_datetime(millis: i64) -> Option<NaiveDateTime> {
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(&Local).naive_local())
}

pub fn format_exif_datetime(dt: &NaiveDateTime) -> String {
    dt.format(EXIF_DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_format_zero_padded() {
        let dt = NaiveDate::from_ymd_opt(2022, 3, 5)
            .unwrap()
            .and_hms_opt(7, 4, 9)
            .unwrap();
        assert_eq!(format_exif_datetime(&dt), "2022:03:05 07:04:09");
    }

    #[test]
    fn test_local_datetime_matches_chrono_local() {
        let millis = 1_700_000_000_000;
        let expected = DateTime::from_timestamp(1_700_000_000, 0)
            .unwrap()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(local_datetime(millis), Some(expected));
    }

    #[test]
    fn test_local_datetime_drops_sub_second() {
        let a = local_datetime(1_700_000_000_999).unwrap();
        let b = local_datetime(1_700_000_000_000).unwrap();
        assert_eq!(format_exif_datetime(&a), format_exif_datetime(&b));
    }
}
