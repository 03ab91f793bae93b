use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Month, OffsetDateTime};

/// Capture date of a record, kept as the zero-padded strings that end up in
/// mirror paths.
///
/// Cameras name their records `YYYYMMDD...`, so the date is read from fixed
/// offsets of the filename: `[0:4)` year, `[4:6)` month and `[6:8)` day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl RecordDate {
    /// Builds a date from its path components, rejecting anything that is not
    /// a zero-padded calendar date.
    ///
    /// ```
    /// use camsync_mirror::RecordDate;
    /// assert!(RecordDate::new("2024", "02", "29").is_ok());
    /// assert!(RecordDate::new("2023", "02", "29").is_err());
    /// assert!(RecordDate::new("2024", "2", "9").is_err());
    /// ```
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Result<Self> {
        let date = Self { year: year.into(), month: month.into(), day: day.into() };
        let shaped = [(&date.year, 4), (&date.month, 2), (&date.day, 2)]
            .iter()
            .all(|(part, len)| part.len() == *len && part.bytes().all(|b| b.is_ascii_digit()));
        if !shaped || date.to_date().is_none() {
            exn::bail!(ErrorKind::InvalidDate(date.to_string()));
        }
        Ok(date)
    }

    /// Extracts the capture date encoded in a record filename.
    ///
    /// ```
    /// use camsync_mirror::RecordDate;
    /// let date = RecordDate::from_filename("20240517101500_010.h264").unwrap();
    /// assert_eq!((date.year.as_str(), date.month.as_str(), date.day.as_str()), ("2024", "05", "17"));
    /// assert!(RecordDate::from_filename("snapshot.jpg").is_err());
    /// ```
    pub fn from_filename(filename: &str) -> Result<Self> {
        let invalid = || ErrorKind::InvalidRecordName(filename.to_string());
        // ASCII-only prefix keeps the fixed-offset slicing on char boundaries.
        let prefix = filename.get(..8).filter(|p| p.is_ascii()).ok_or_raise(invalid)?;
        Self::new(&prefix[0..4], &prefix[4..6], &prefix[6..8]).or_raise(invalid)
    }

    /// Today's date in UTC.
    pub fn today() -> Self {
        Self::from(OffsetDateTime::now_utc().date())
    }

    fn to_date(&self) -> Option<Date> {
        let year: i32 = self.year.parse().ok()?;
        let month: u8 = self.month.parse().ok()?;
        let day: u8 = self.day.parse().ok()?;
        Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()
    }
}

impl From<Date> for RecordDate {
    fn from(date: Date) -> Self {
        Self {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", u8::from(date.month())),
            day: format!("{:02}", date.day()),
        }
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("20240517101500_010.h264", "2024", "05", "17")]
    #[case("20231231", "2023", "12", "31")]
    #[case("20240229_alarm.jpg", "2024", "02", "29")]
    fn test_from_filename(#[case] filename: &str, #[case] year: &str, #[case] month: &str, #[case] day: &str) {
        let date = RecordDate::from_filename(filename).unwrap();
        assert_eq!(date, RecordDate { year: year.into(), month: month.into(), day: day.into() });
    }

    #[rstest]
    #[case("")]
    #[case("2024051")]
    #[case("record_20240517.h264")]
    #[case("2024-05-17.h264")]
    #[case("20241317_000000.h264")]
    #[case("20230229_000000.h264")]
    #[case("2024ééé7")]
    fn test_from_filename_rejects(#[case] filename: &str) {
        let err = RecordDate::from_filename(filename).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRecordName(name) if name == filename));
    }

    #[test]
    fn test_from_date_pads() {
        let date = Date::from_calendar_date(2024, Month::March, 5).unwrap();
        let record = RecordDate::from(date);
        assert_eq!(record.to_string(), "2024-03-05");
    }

    #[test]
    fn test_today_is_valid() {
        let today = RecordDate::today();
        assert!(RecordDate::new(today.year.clone(), today.month.clone(), today.day.clone()).is_ok());
    }
}
