use crate::error::{ReportError, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A calendar month, written `YYYY-MM`.
///
/// Ordering is chronological: by year, then month. Years are limited to
/// `0000..=9999` so every key formats as exactly four digits and parses back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    year: i32,
    month: u32,
}

pub const MIN_YEAR: i32 = 0;
pub const MAX_YEAR: i32 = 9999;

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(ReportError::InvalidPeriod(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    /// Parses a strict `YYYY-MM` string (4-digit year, 2-digit month).
    ///
    /// Surrounding whitespace is rejected; callers reading raw cells trim first.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();

        let well_formed = bytes.len() == 7
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[4] == b'-'
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(ReportError::InvalidPeriod(s.to_string()));
        }

        let year: i32 = s[..4]
            .parse()
            .map_err(|_| ReportError::InvalidPeriod(s.to_string()))?;
        let month: u32 = s[5..]
            .parse()
            .map_err(|_| ReportError::InvalidPeriod(s.to_string()))?;

        if !(1..=12).contains(&month) {
            return Err(ReportError::InvalidPeriod(s.to_string()));
        }

        Ok(Self { year, month })
    }

    /// Derives the period from a file name such as `2024-01.csv`.
    pub fn from_file_stem(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ReportError::InvalidPeriod(path.display().to_string()))?;
        Self::parse(stem)
    }

    pub fn from_date(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shifts by `months` calendar months; negative values go backwards.
    ///
    /// The result may fall outside `MIN_YEAR..=MAX_YEAR`. Such a key still
    /// orders correctly but does not format as `YYYY-MM`; use
    /// [`PeriodKey::checked_offset`] when the result must stay in range.
    pub fn offset(&self, months: i32) -> Self {
        let index = self.month_index() + i64::from(months);
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Like [`PeriodKey::offset`], but `None` when the year leaves the
    /// four-digit range.
    pub fn checked_offset(&self, months: i32) -> Option<Self> {
        let shifted = self.offset(months);
        (MIN_YEAR..=MAX_YEAR)
            .contains(&shifted.year)
            .then_some(shifted)
    }

    pub fn format(&self) -> String {
        self.to_string()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.offset(1)
            .first_day()?
            .checked_sub_days(Days::new(1))
    }

    fn month_index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

/// Signed number of months from `start` to `end`.
pub fn months_between(start: PeriodKey, end: PeriodKey) -> i64 {
    end.month_index() - start.month_index()
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = ReportError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PeriodKey> for String {
    fn from(period: PeriodKey) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PeriodKey {
        PeriodKey::parse(s).unwrap()
    }

    #[test]
    fn test_round_trip() {
        for s in ["2024-01", "2023-12", "1999-07", "0001-10", "2024-10"] {
            assert_eq!(p(s).format(), s);
        }
    }

    #[test]
    fn test_offset_crosses_year_boundaries() {
        assert_eq!(p("2024-01").offset(-13).format(), "2022-12");
        assert_eq!(p("2024-03").offset(-1).format(), "2024-02");
        assert_eq!(p("2024-02").offset(-11).format(), "2023-03");
        assert_eq!(p("2023-12").offset(1).format(), "2024-01");
        assert_eq!(p("2023-06").offset(30).format(), "2025-12");
        assert_eq!(p("2023-06").offset(0), p("2023-06"));
    }

    #[test]
    fn test_rejects_malformed_strings() {
        for s in ["2024-13", "2024-00", "2024-1", "24-01", "2024/01", "2024-01-01", "", "abcd-ef"] {
            assert!(
                matches!(PeriodKey::parse(s), Err(ReportError::InvalidPeriod(_))),
                "expected {:?} to be rejected",
                s
            );
        }
        assert!(PeriodKey::new(2024, 13).is_err());
    }

    #[test]
    fn test_parse_does_not_trim() {
        for s in [" 2024-01", "2024-01 ", " 2024-01 ", "\t2024-01"] {
            assert!(PeriodKey::parse(s).is_err(), "expected {:?} to be rejected", s);
        }
    }

    #[test]
    fn test_year_range_is_four_digits() {
        assert!(PeriodKey::new(-1, 5).is_err());
        assert!(PeriodKey::new(10000, 1).is_err());
        assert_eq!(PeriodKey::new(0, 5).unwrap().format(), "0000-05");

        assert_eq!(p("0000-05").checked_offset(-13), None);
        assert_eq!(p("9999-12").checked_offset(1), None);
        assert_eq!(p("0001-01").checked_offset(-12), Some(p("0000-01")));

        // Unchecked offsets still order correctly below year 0
        let below = p("0000-05").offset(-13);
        assert!(below < p("0000-01"));
        assert_eq!(months_between(below, p("0000-05")), 13);
    }

    #[test]
    fn test_ordering_is_chronological() {
        assert!(p("2023-12") < p("2024-01"));
        assert!(p("2024-02") > p("2024-01"));
        assert_eq!(months_between(p("2022-12"), p("2024-01")), 13);
        assert_eq!(months_between(p("2024-01"), p("2022-12")), -13);
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(
            p("2024-02").last_day(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            p("2023-12").last_day(),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        let date = NaiveDate::from_ymd_opt(2023, 4, 17).unwrap();
        assert_eq!(PeriodKey::from_date(date).unwrap(), p("2023-04"));
    }

    #[test]
    fn test_from_file_stem() {
        assert_eq!(
            PeriodKey::from_file_stem("exports/split/2024-03.xlsx").unwrap(),
            p("2024-03")
        );
        assert!(PeriodKey::from_file_stem("exports/march.csv").is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&p("2024-05")).unwrap();
        assert_eq!(json, "\"2024-05\"");
        let back: PeriodKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p("2024-05"));
        assert!(serde_json::from_str::<PeriodKey>("\"2024-5\"").is_err());
    }
}
