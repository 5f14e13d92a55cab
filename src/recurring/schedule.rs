//! Works out when a recurring rule is due.

use time::{Date, Weekday};

use crate::{
    Error,
    calendar::{add_days, clamped_date, following_month, next_weekday_on_or_after},
    recurring::{Cadence, DayOfMonth},
};

/// The first date a new rule is due on.
///
/// - Monthly rules run on `day_of_month` (or the start date's day) within the
///   start date's own month, clamped to the length of that month. The result
///   may be earlier than `start_date`, it is never pushed into the next month.
/// - Weekly rules run on the first `weekday` (or the start date's weekday) on
///   or after `start_date`.
/// - Biweekly and custom rules run on `start_date`.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the date would be past the last date
/// that can be represented.
pub fn compute_initial_next_run(
    cadence: Cadence,
    start_date: Date,
    day_of_month: Option<DayOfMonth>,
    weekday: Option<Weekday>,
) -> Result<Date, Error> {
    match cadence {
        Cadence::Monthly => {
            let day = day_of_month.map_or(start_date.day(), DayOfMonth::get);

            clamped_date(start_date.year(), start_date.month(), day)
                .ok_or(Error::DateOutOfRange(start_date))
        }
        Cadence::Weekly => {
            let weekday = weekday.unwrap_or(start_date.weekday());

            next_weekday_on_or_after(start_date, weekday).ok_or(Error::DateOutOfRange(start_date))
        }
        Cadence::Biweekly | Cadence::Custom => Ok(start_date),
    }
}

/// The date a rule is due on after it ran on `current`.
///
/// Monthly rules move to `day_of_month` (or `current`'s day) of the following
/// month, clamped to that month's length. The clamp is worked out again for
/// every month, so a rule for the 31st runs on Feb 29 and then on Mar 31.
///
/// Weekly and biweekly rules move forward 7 and 14 days. Custom rules do not
/// move.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the date would be past the last date
/// that can be represented.
pub fn compute_next_after(
    cadence: Cadence,
    current: Date,
    day_of_month: Option<DayOfMonth>,
) -> Result<Date, Error> {
    let next = match cadence {
        Cadence::Monthly => {
            let (year, month) = following_month(current.year(), current.month());
            let day = day_of_month.map_or(current.day(), DayOfMonth::get);

            clamped_date(year, month, day)
        }
        Cadence::Weekly => add_days(current, 7),
        Cadence::Biweekly => add_days(current, 14),
        Cadence::Custom => Some(current),
    };

    next.ok_or(Error::DateOutOfRange(current))
}
