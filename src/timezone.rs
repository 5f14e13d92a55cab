//! Resolves the configured timezone into "today" and "now".

use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// The current UTC offset of a canonical timezone, e.g. "Pacific/Auckland".
///
/// Returns `None` if the timezone name is not known.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current date in `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if the timezone name is not known.
pub fn local_today(canonical_timezone: &str) -> Result<Date, Error> {
    let offset = get_local_offset(canonical_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

/// The UTC instant at which `date` starts in `local_offset`.
pub fn local_midnight_utc(date: Date, local_offset: UtcOffset) -> OffsetDateTime {
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
        .assume_offset(local_offset)
        .to_offset(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use time::{
        OffsetDateTime, UtcOffset,
        macros::{date, datetime, offset},
    };

    use crate::Error;

    use super::{get_local_offset, local_midnight_utc, local_today};

    #[test]
    fn utc_has_zero_offset() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
    }

    #[test]
    fn unknown_timezone() {
        assert_eq!(get_local_offset("Mars/Olympus_Mons"), None);
        assert_eq!(
            local_today("Mars/Olympus_Mons"),
            Err(Error::InvalidTimezoneError("Mars/Olympus_Mons".to_owned()))
        );
    }

    #[test]
    fn today_is_within_a_day_of_utc_today() {
        let utc_today = OffsetDateTime::now_utc().date();

        let today = local_today("Pacific/Auckland").unwrap();

        assert!((today - utc_today).whole_days().abs() <= 1);
    }

    #[test]
    fn local_midnight_is_converted_to_utc() {
        let midnight = local_midnight_utc(date!(2024 - 03 - 01), offset!(+13));

        assert_eq!(midnight, datetime!(2024-02-29 11:00 UTC));
        assert_eq!(midnight.offset(), UtcOffset::UTC);
    }
}
