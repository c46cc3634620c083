//! # Calendar time
//! Local calendar time as seen by the alarm, the minute-granularity stamp that
//! alarms are matched against, and the fixed UTC offset used to derive local
//! time from a synchronized Unix timestamp.
//!
//! Unix seconds are turned into a civil date with Howard Hinnant's O(1)
//! `civil_from_days` algorithm, see <http://howardhinnant.github.io/date_algorithms.html>.

/// Seconds in one civil day
const SECONDS_PER_DAY: i64 = 86_400;

/// A fixed offset from UTC, in minutes east of Greenwich.
/// Daylight saving rules are not modelled, the offset never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcOffset {
    /// Minutes east of UTC, negative for the western hemisphere
    minutes: i32,
}

impl UtcOffset {
    /// Coordinated Universal Time
    pub const UTC: Self = Self { minutes: 0 };

    /// New Zealand Standard Time, +12:00. Daylight saving is not applied.
    pub const NZST: Self = Self::from_minutes(12 * 60);

    /// Creates an offset of `minutes` east of UTC.
    pub const fn from_minutes(minutes: i32) -> Self {
        Self { minutes }
    }

    /// Returns the offset in minutes east of UTC.
    pub const fn minutes(self) -> i32 {
        self.minutes
    }

    /// Returns the offset in seconds east of UTC.
    const fn seconds(self) -> i64 {
        self.minutes as i64 * 60
    }
}

impl Default for UtcOffset {
    fn default() -> Self {
        Self::UTC
    }
}

/// A calendar instant truncated to the minute.
/// This is what an alarm target is expressed in and what firing is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MinuteStamp {
    /// Full year, e.g. 2024
    pub year: u16,
    /// Month of the year, 1-12
    pub month: u8,
    /// Day of the month, 1-31
    pub day: u8,
    /// Hour of the day, 0-23
    pub hour: u8,
    /// Minute of the hour, 0-59
    pub minute: u8,
}

impl MinuteStamp {
    /// Creates a new stamp. The fields are taken as-is, no calendar validation happens here.
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
        }
    }
}

/// A snapshot of the local wall clock, down to the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CurrentTime {
    /// Full year, e.g. 2024
    pub year: u16,
    /// Month of the year, 1-12
    pub month: u8,
    /// Day of the month, 1-31
    pub day: u8,
    /// Hour of the day, 0-23
    pub hour: u8,
    /// Minute of the hour, 0-59
    pub minute: u8,
    /// Second of the minute, 0-59
    pub second: u8,
}

impl CurrentTime {
    /// Creates a new time snapshot.
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Derives the local calendar time for `unix_secs` shifted by `offset`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unix(unix_secs: u64, offset: UtcOffset) -> Self {
        let local = i64::try_from(unix_secs)
            .unwrap_or(i64::MAX)
            .saturating_add(offset.seconds());

        let days = local.div_euclid(SECONDS_PER_DAY);
        let secs_of_day = local.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            // years beyond u16 are far outside anything an SNTP server hands out
            year: year.clamp(0, i64::from(u16::MAX)) as u16,
            month,
            day,
            hour: (secs_of_day / 3600) as u8,
            minute: ((secs_of_day % 3600) / 60) as u8,
            second: (secs_of_day % 60) as u8,
        }
    }

    /// Truncates this time to the minute.
    pub const fn minute_stamp(&self) -> MinuteStamp {
        MinuteStamp::new(self.year, self.month, self.day, self.hour, self.minute)
    }
}

/// Converts days since 1970-01-01 into a proleptic Gregorian `(year, month, day)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11], March based
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month as u8, day as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_is_first_of_january_1970() {
        let t = CurrentTime::from_unix(0, UtcOffset::UTC);
        assert_eq!(t, CurrentTime::new(1970, 1, 1, 0, 0, 0));
    }

    #[test]
    fn converts_known_timestamps() {
        assert_eq!(
            CurrentTime::from_unix(1_717_252_200, UtcOffset::UTC),
            CurrentTime::new(2024, 6, 1, 14, 30, 0)
        );
        assert_eq!(
            CurrentTime::from_unix(1_704_067_199, UtcOffset::UTC),
            CurrentTime::new(2023, 12, 31, 23, 59, 59)
        );
        assert_eq!(
            CurrentTime::from_unix(951_868_800, UtcOffset::UTC),
            CurrentTime::new(2000, 3, 1, 0, 0, 0)
        );
    }

    #[test]
    fn handles_leap_day() {
        let t = CurrentTime::from_unix(1_709_208_000, UtcOffset::UTC);
        assert_eq!(t, CurrentTime::new(2024, 2, 29, 12, 0, 0));

        // and the day after
        let t = CurrentTime::from_unix(1_709_208_000 + 86_400, UtcOffset::UTC);
        assert_eq!(t, CurrentTime::new(2024, 3, 1, 12, 0, 0));
    }

    #[test]
    fn summer_time_is_a_separately_configured_offset() {
        // 2024-01-15T01:30Z, New Zealand is on NZDT (+13:00)
        let unix = 1_705_282_200;
        assert_eq!(
            CurrentTime::from_unix(unix, UtcOffset::NZST),
            CurrentTime::new(2024, 1, 15, 13, 30, 0)
        );
        assert_eq!(
            CurrentTime::from_unix(unix, UtcOffset::from_minutes(13 * 60)),
            CurrentTime::new(2024, 1, 15, 14, 30, 0)
        );
    }

    #[test]
    fn applies_fixed_offset() {
        // 02:30 UTC is 14:30 in New Zealand standard time
        let t = CurrentTime::from_unix(1_717_209_000, UtcOffset::NZST);
        assert_eq!(t, CurrentTime::new(2024, 6, 1, 14, 30, 0));

        // negative offsets roll back across midnight and the year boundary
        let t = CurrentTime::from_unix(1_704_067_200, UtcOffset::from_minutes(-90));
        assert_eq!(t, CurrentTime::new(2023, 12, 31, 22, 30, 0));
    }

    #[test]
    fn minute_stamp_drops_seconds() {
        let t = CurrentTime::new(2024, 6, 1, 14, 30, 59);
        assert_eq!(t.minute_stamp(), MinuteStamp::new(2024, 6, 1, 14, 30));
    }
}
