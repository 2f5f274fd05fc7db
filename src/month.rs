//! Calendar month used to key budgets and summaries.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");
const MONTH_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]");

/// A calendar month, stored as the first day of that month.
///
/// Budgets are defined per month and the backend expects months written as
/// `YYYY-MM-01`, which is how a [Month] is displayed and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(Date);

impl Month {
    /// Create the month `month` (1-12) of `year`.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `month` is not in 1-12 or `year` is out
    /// of range.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        let invalid = || Error::InvalidMonth(format!("{year:04}-{month:02}"));
        let month = time::Month::try_from(month).map_err(|_| invalid())?;
        let date = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;

        Ok(Self(date))
    }

    /// The month containing `date`.
    pub fn of(date: Date) -> Self {
        // Day 1 exists in every month.
        Self(date.replace_day(1).unwrap_or(date))
    }

    /// The current month in local time, or UTC if the local offset is unknown.
    pub fn current() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::of(now.date())
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        self.0
    }

    /// Whether `date` falls in this month.
    pub fn contains(&self, date: Date) -> bool {
        date.year() == self.0.year() && date.month() == self.0.month()
    }

    /// The month formatted as `YYYY-MM`, the form used in query strings.
    pub fn query_value(&self) -> String {
        self.0
            .format(MONTH_FORMAT)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_date(self.0))
    }
}

impl FromStr for Month {
    type Err = Error;

    /// Parse `YYYY-MM` or `YYYY-MM-DD`. The day, if present, is validated and
    /// then discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let date = match Date::parse(text, DATE_FORMAT) {
            Ok(date) => date,
            Err(_) => Date::parse(&format!("{text}-01"), DATE_FORMAT)
                .map_err(|_| Error::InvalidMonth(s.to_owned()))?,
        };

        Ok(Self::of(date))
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
/// Returns [Error::InvalidDate] if `text` is not a valid calendar date.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(text.to_owned()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

// Serde adapter for `YYYY-MM-DD` dates.
time::serde::format_description!(
    pub(crate) iso_date,
    Date,
    "[year]-[month]-[day]"
);
