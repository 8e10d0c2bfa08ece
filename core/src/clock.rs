//! Local wall clock
//!
//! The clock holds the epoch seconds and UTC offset from the last successful
//! time sync, plus the monotonic tick at which they were taken. Reading it
//! adds the ticks elapsed since then, so between syncs the displayed time
//! free-runs off the local oscillator. Drift is corrected only by the next
//! resync.
//!
//! ## Calendar arithmetic
//!
//! Howard Hinnant's `civil_from_days` turns days since 1970-01-01 into a
//! proleptic Gregorian date in O(1), for negative day counts as well.
//! Reference: <http://howardhinnant.github.io/date_algorithms.html>

use core::fmt::Write;

use heapless::String;

const SECONDS_PER_DAY: i64 = 86_400;

/// Local calendar date and time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocalDateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl LocalDateTime {
    /// Break local seconds since 1970-01-01T00:00 into date and time of day
    pub fn from_local_secs(local_secs: i64) -> Self {
        let days = local_secs.div_euclid(SECONDS_PER_DAY);
        let secs_today = local_secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            hour: (secs_today / 3600) as u8,
            minute: ((secs_today % 3600) / 60) as u8,
            second: (secs_today % 60) as u8,
        }
    }

    /// Time of day as `HH:MM:SS`
    pub fn hms(&self) -> String<8> {
        let mut out = String::new();
        // Three fields below 100 are exactly eight bytes, the write cannot overflow.
        let _ = write!(out, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second);
        out
    }
}

impl core::fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Epoch time and UTC offset, advanced by the local tick source
#[derive(Debug, Clone, Copy)]
pub struct ClockModel {
    epoch_secs: i64,
    utc_offset_secs: i32,
    synced_at_ms: u64,
    synced: bool,
}

impl ClockModel {
    /// Unsynchronized clock counting from the epoch at boot
    pub const fn new(default_utc_offset_secs: i32) -> Self {
        Self {
            epoch_secs: 0,
            utc_offset_secs: default_utc_offset_secs,
            synced_at_ms: 0,
            synced: false,
        }
    }

    /// Replace epoch and offset wholesale, as observed at tick `now_ms`
    pub fn set(&mut self, epoch_secs: i64, utc_offset_secs: i32, now_ms: u64) {
        self.epoch_secs = epoch_secs;
        self.utc_offset_secs = utc_offset_secs;
        self.synced_at_ms = now_ms;
        self.synced = true;
    }

    /// Whether at least one time sync has succeeded
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn utc_offset_secs(&self) -> i32 {
        self.utc_offset_secs
    }

    /// UTC epoch seconds at tick `now_ms`
    pub fn epoch_at(&self, now_ms: u64) -> i64 {
        let elapsed_secs = now_ms.saturating_sub(self.synced_at_ms) / 1000;
        self.epoch_secs.saturating_add(elapsed_secs as i64)
    }

    /// Local date and time at tick `now_ms`
    pub fn advance(&self, now_ms: u64) -> LocalDateTime {
        let local = self
            .epoch_at(now_ms)
            .saturating_add(i64::from(self.utc_offset_secs));
        LocalDateTime::from_local_secs(local)
    }
}

/// Convert days since Unix epoch to civil date (year, month, day)
fn civil_from_days(days_since_epoch: i64) -> (i32, u8, u8) {
    // Shift epoch from 1970-01-01 to 0000-03-01 so the leap day ends the year
    let z = days_since_epoch + 719_468;

    // 400-year eras
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u32; // day of era [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let y = i64::from(yoe) + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // March = 0
    let d = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u8;
    let year = if m <= 2 { y + 1 } else { y };

    (year as i32, m, d)
}

#[cfg(test)]
fn days_from_civil(year: i32, month: u8, day: u8) -> i64 {
    let (y, m) = if month <= 2 {
        (i64::from(year) - 1, u32::from(month) + 9)
    } else {
        (i64::from(year), u32::from(month) - 3)
    };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u32;
    let doy = (153 * m + 2) / 5 + u32::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + i64::from(doe) - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch() {
        let dt = LocalDateTime::from_local_secs(0);
        assert_eq!((dt.year, dt.month, dt.day), (1970, 1, 1));
        assert_eq!(dt.hms().as_str(), "00:00:00");
    }

    #[test]
    fn test_before_epoch() {
        // Unsynced clock at boot with a -5h offset
        let clock = ClockModel::new(-18_000);
        let dt = clock.advance(0);
        assert_eq!((dt.year, dt.month, dt.day), (1969, 12, 31));
        assert_eq!(dt.hms().as_str(), "19:00:00");
        assert!(!clock.is_synced());
    }

    #[test]
    fn test_round_trip_days() {
        for (y, m, d) in [(1970, 1, 1), (2000, 2, 29), (2024, 11, 24), (2100, 3, 1), (1969, 12, 31)] {
            let days = days_from_civil(y, m, d);
            assert_eq!(civil_from_days(days), (y, m, d));
        }
    }

    #[test]
    fn test_sync_response_is_eastern_time() {
        let mut clock = ClockModel::new(0);
        clock.set(1_732_464_068, -18_000, 42_000);

        let dt = clock.advance(42_000);
        assert_eq!((dt.year, dt.month, dt.day), (2024, 11, 24));
        assert_eq!(dt.hms().as_str(), "11:01:08");
        assert!(clock.is_synced());
    }

    #[test]
    fn test_free_runs_between_syncs() {
        let mut clock = ClockModel::new(0);
        clock.set(1_732_464_068, -18_000, 1_000);

        assert_eq!(clock.advance(1_999).hms().as_str(), "11:01:08");
        assert_eq!(clock.advance(2_000).hms().as_str(), "11:01:09");
        assert_eq!(clock.advance(1_000 + 3_600_000).hms().as_str(), "12:01:08");
        assert_eq!(clock.epoch_at(61_000), 1_732_464_128);
    }

    #[test]
    fn test_midnight_rollover() {
        let mut clock = ClockModel::new(0);
        // 2024-11-24T23:59:59 local
        clock.set(1_732_510_799, -18_000, 0);
        let before = clock.advance(0);
        let after = clock.advance(1_000);
        assert_eq!(before.hms().as_str(), "23:59:59");
        assert_eq!(after.hms().as_str(), "00:00:00");
        assert_eq!(after.day, 25);
    }

    #[test]
    fn test_display_format() {
        let dt = LocalDateTime::from_local_secs(1_732_464_068 - 18_000);
        let mut out: String<32> = String::new();
        write!(out, "{}", dt).unwrap();
        assert_eq!(out.as_str(), "2024-11-24 11:01:08");
    }
}
