//! Resampling period definitions.
//!
//! This module defines [`Period`], the coarse buckets a daily series can be
//! resampled into. Buckets are labelled with their last calendar day so a
//! monthly resample of a daily series lines up with month-end dated series
//! such as consumer price indices.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PriceError;

/// Number of monthly observations in a year; the default return lookback.
pub const ANNUAL_PERIODS: usize = 12;

/// Bucket size for resampling a series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Weeks ending on Sunday.
    Weekly,
    /// Calendar months.
    #[default]
    Monthly,
    /// Calendar quarters.
    Quarterly,
    /// Calendar years.
    Annual,
}

impl Period {
    /// Returns the last calendar day of the bucket containing `date`.
    #[must_use]
    pub fn bucket_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => {
                let to_sunday = 6 - u64::from(date.weekday().num_days_from_monday());
                date.checked_add_days(Days::new(to_sunday))
                    .unwrap_or(NaiveDate::MAX)
            }
            Self::Monthly => month_end(date.year(), date.month()),
            Self::Quarterly => month_end(date.year(), date.month0() / 3 * 3 + 3),
            Self::Annual => month_end(date.year(), 12),
        }
    }

    /// Short code used on the command line and in settings.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
            Self::Annual => "A",
        }
    }
}

/// Last day of `month` (1-12) in `year`.
fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Period {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "week" | "weekly" => Ok(Self::Weekly),
            "m" | "month" | "monthly" => Ok(Self::Monthly),
            "q" | "quarter" | "quarterly" => Ok(Self::Quarterly),
            "a" | "y" | "year" | "annual" | "yearly" => Ok(Self::Annual),
            other => Err(PriceError::InvalidParameter(format!(
                "Unknown period: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_bucket_end() {
        assert_eq!(Period::Monthly.bucket_end(date(2017, 9, 1)), date(2017, 9, 30));
        assert_eq!(Period::Monthly.bucket_end(date(2016, 2, 10)), date(2016, 2, 29));
        assert_eq!(Period::Monthly.bucket_end(date(2017, 12, 5)), date(2017, 12, 31));
    }

    #[test]
    fn test_weekly_bucket_end_is_sunday() {
        // 2017-09-01 is a Friday
        assert_eq!(Period::Weekly.bucket_end(date(2017, 9, 1)), date(2017, 9, 3));
        assert_eq!(Period::Weekly.bucket_end(date(2017, 9, 3)), date(2017, 9, 3));
    }

    #[test]
    fn test_quarterly_and_annual_bucket_end() {
        assert_eq!(Period::Quarterly.bucket_end(date(2017, 2, 14)), date(2017, 3, 31));
        assert_eq!(Period::Quarterly.bucket_end(date(2017, 11, 1)), date(2017, 12, 31));
        assert_eq!(Period::Annual.bucket_end(date(2017, 6, 30)), date(2017, 12, 31));
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("M".parse::<Period>().unwrap(), Period::Monthly);
        assert_eq!("annual".parse::<Period>().unwrap(), Period::Annual);
        assert!("daily".parse::<Period>().is_err());
    }
}
