//! Calendar arithmetic on plain dates.
//!
//! Every function here works on [Date], which carries no time of day and no
//! offset. Stepping to "next month" or "next Monday" therefore cannot drift by
//! a day around daylight saving transitions the way timestamp arithmetic in a
//! local timezone can.

use time::{Date, Duration, Month, Weekday, macros::format_description};

use crate::Error;

/// The year and month that follow `month` of `year`, rolling December into
/// January of the next year.
pub fn following_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::December => (year + 1, Month::January),
        month => (year, month.next()),
    }
}

/// The year and month that precede `month` of `year`, rolling January back
/// into December of the previous year.
pub fn preceding_month(year: i32, month: Month) -> (i32, Month) {
    match month {
        Month::January => (year - 1, Month::December),
        month => (year, month.previous()),
    }
}

/// The number of days in `month` of `year`.
///
/// This is the day before the first of the following month, so leap years
/// fall out of the calendar itself rather than a lookup table.
pub fn days_in_month(year: i32, month: Month) -> u8 {
    let (next_year, next_month) = following_month(year, month);

    Date::from_calendar_date(next_year, next_month, 1)
        .ok()
        .and_then(|first_of_next_month| first_of_next_month.previous_day())
        .map(|last_day| last_day.day())
        // The following month is only unrepresentable for December of the last supported year.
        .unwrap_or(31)
}

/// Clamp `day` into `[1, days_in_month(year, month)]`.
///
/// The result is always a valid day of that month, e.g. the 31st becomes the
/// 30th in April and the 29th in February 2024.
pub fn clamp_day_of_month(year: i32, month: Month, day: u8) -> u8 {
    day.clamp(1, days_in_month(year, month))
}

/// The date for `day` of `month` in `year`, clamped to the length of the month.
///
/// Returns `None` only if the year is outside of the supported range.
pub fn clamped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    Date::from_calendar_date(year, month, clamp_day_of_month(year, month, day)).ok()
}

/// The first date on or after `date` that falls on `weekday`.
///
/// Steps forward one day at a time, so at most six steps are taken.
/// Returns `None` if the search runs past the last supported date.
pub fn next_weekday_on_or_after(date: Date, weekday: Weekday) -> Option<Date> {
    let mut candidate = date;

    while candidate.weekday() != weekday {
        candidate = candidate.next_day()?;
    }

    Some(candidate)
}

/// Add `days` calendar days to `date`. Negative values step backwards.
///
/// Returns `None` if the result is outside of the supported date range.
pub fn add_days(date: Date, days: i64) -> Option<Date> {
    date.checked_add(Duration::days(days))
}

/// Convert a weekday number, where 0 is Sunday and 6 is Saturday, to a [Weekday].
pub fn weekday_from_number(number: u8) -> Option<Weekday> {
    match number {
        0 => Some(Weekday::Sunday),
        1 => Some(Weekday::Monday),
        2 => Some(Weekday::Tuesday),
        3 => Some(Weekday::Wednesday),
        4 => Some(Weekday::Thursday),
        5 => Some(Weekday::Friday),
        6 => Some(Weekday::Saturday),
        _ => None,
    }
}

/// The number of `weekday`, where 0 is Sunday and 6 is Saturday.
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.number_days_from_sunday()
}

/// Parse a date in the ISO 8601 calendar format `YYYY-MM-DD`.
///
/// # Errors
/// Returns [Error::InvalidDateFormat] if `text` is not a valid date in that format.
pub fn parse_iso_date(text: &str) -> Result<Date, Error> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDateFormat(text.to_owned()))
}
