//! Countdown engine: remaining time until the event, as a pure function of two instants.

use serde::Serialize;
use thiserror::Error;
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, error::Parse,
    format_description::BorrowedFormatItem, macros::format_description,
};

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_MINUTE: i64 = 60;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day].[month].[year]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");
const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");

/// Remaining time until the event, floored to whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountdownState {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl CountdownState {
    pub const ZERO: CountdownState = CountdownState {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn is_finished(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Compute the countdown at `now` towards `target`. Pinned at zero once the target passed.
pub fn tick(now: OffsetDateTime, target: OffsetDateTime) -> CountdownState {
    let remaining = (target - now).whole_seconds();
    if remaining <= 0 {
        return CountdownState::ZERO;
    }

    CountdownState {
        days: (remaining / SECONDS_PER_DAY) as u64,
        hours: (remaining % SECONDS_PER_DAY / SECONDS_PER_HOUR) as u64,
        minutes: (remaining % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u64,
        seconds: (remaining % SECONDS_PER_MINUTE) as u64,
    }
}

/// Errors raised while turning configured date/time fields into an instant.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid event date `{value}` (expected DD.MM.YYYY)")]
    Date {
        value: String,
        #[source]
        source: Parse,
    },
    #[error("invalid event time `{value}` (expected HH:MM)")]
    Time {
        value: String,
        #[source]
        source: Parse,
    },
    #[error("invalid UTC offset `{value}` (expected ±HH:MM)")]
    Offset {
        value: String,
        #[source]
        source: Parse,
    },
}

/// Interpret `date` (`DD.MM.YYYY`) and `time_of_day` (`HH:MM`) at `offset`.
pub fn event_target(
    date: &str,
    time_of_day: &str,
    offset: UtcOffset,
) -> Result<OffsetDateTime, ScheduleError> {
    let day = Date::parse(date, DATE_FORMAT).map_err(|source| ScheduleError::Date {
        value: date.to_string(),
        source,
    })?;
    let clock = Time::parse(time_of_day, TIME_FORMAT).map_err(|source| ScheduleError::Time {
        value: time_of_day.to_string(),
        source,
    })?;
    Ok(PrimitiveDateTime::new(day, clock).assume_offset(offset))
}

/// Parse a `±HH:MM` offset.
pub fn parse_offset(value: &str) -> Result<UtcOffset, ScheduleError> {
    UtcOffset::parse(value, OFFSET_FORMAT).map_err(|source| ScheduleError::Offset {
        value: value.to_string(),
        source,
    })
}
