use crate::hosting::HostingError;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Longest window accepted, about ten years
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// A lookback range of whole UTC calendar days, ending now.
///
/// The first day starts at midnight UTC and the last day is the current one, so the
/// window always covers exactly `days` calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    days: u32,
}

impl TimeWindow {
    /// The window of `days` calendar days whose last day contains `now`.
    pub fn ending_at(now: DateTime<Utc>, days: u32) -> Result<Self, HostingError> {
        if days == 0 {
            return Err(HostingError::invalid_argument("the number of days must be greater than zero"));
        }

        if days > MAX_WINDOW_DAYS {
            return Err(HostingError::invalid_argument(format!(
                "a window of {days} days is too long, at most {MAX_WINDOW_DAYS} days are supported"
            )));
        }

        let first_day = now
            .date_naive()
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| HostingError::invalid_argument(format!("a window of {days} days reaches before the supported date range")))?;

        Ok(Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            end: now,
            days,
        })
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub const fn days(&self) -> u32 {
        self.days
    }

    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Offset of `timestamp`'s UTC date from the first day, if it falls inside the window
    #[must_use]
    pub fn day_index(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        if !self.contains(timestamp) {
            return None;
        }

        let offset = (timestamp.date_naive() - self.first_day()).num_days();
        usize::try_from(offset).ok()
    }

    /// Every calendar date of the window, oldest first
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.first_day().iter_days().take(self.days as usize)
    }
}
