//! Calendar windows in the reporting timezone.

use chrono::{DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;
use std::fmt;

/// A closed interval `[start, end]` with second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Window {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// True when `self` ends strictly before `other` begins.
    pub fn precedes(&self, other: &Window) -> bool {
        self.end < other.start
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format("%d.%m.%Y %H:%M:%S"),
            self.end.format("%d.%m.%Y %H:%M:%S")
        )
    }
}

/// Window covering a whole civil month before the reference month.
///
/// `offset` 0 is the month immediately preceding `reference`'s month,
/// 1 the month before that, and so on.
pub fn month_window(reference: DateTime<FixedOffset>, offset: u32) -> Window {
    let tz = *reference.offset();
    let first_of_reference = reference
        .date_naive()
        .with_day(1)
        .expect("day 1 exists in every month");
    let start = first_of_reference
        .checked_sub_months(Months::new(offset + 1))
        .expect("month arithmetic stays within chrono's range");
    let next = start
        .checked_add_months(Months::new(1))
        .expect("month arithmetic stays within chrono's range");

    Window {
        start: local_midnight(start, tz),
        end: local_midnight(next, tz) - TimeDelta::seconds(1),
    }
}

/// Seven civil days ending with the reference date, inclusive.
pub fn rolling_week_window(reference: DateTime<FixedOffset>) -> Window {
    let tz = *reference.offset();
    let today = reference.date_naive();
    let week_start = today - Days::new(6);
    let tomorrow = today + Days::new(1);

    Window {
        start: local_midnight(week_start, tz),
        end: local_midnight(tomorrow, tz) - TimeDelta::seconds(1),
    }
}

fn local_midnight(date: NaiveDate, tz: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - TimeDelta::seconds(tz.local_minus_utc() as i64);
    DateTime::from_naive_utc_and_offset(utc, tz)
}
