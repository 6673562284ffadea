//! Fixed time zone with EU daylight-saving rules.
//!
//! Summer time runs from the last Sunday of March to the last Sunday of
//! October, switching at 01:00 UTC in both directions.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

const SWITCH_HOUR_UTC: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstZone {
    pub std_offset_secs: i32,
    pub dst_offset_secs: i32,
}

impl DstZone {
    /// `EET-2EEST,M3.5.0/3,M10.5.0/4`
    pub const EASTERN_EUROPE: Self = Self {
        std_offset_secs: 2 * 3600,
        dst_offset_secs: 3 * 3600,
    };

    pub const UTC: Self = Self {
        std_offset_secs: 0,
        dst_offset_secs: 0,
    };

    pub fn is_dst(&self, utc: NaiveDateTime) -> bool {
        if self.std_offset_secs == self.dst_offset_secs {
            return false;
        }
        let year = utc.year();
        match (switch_instant(year, 3), switch_instant(year, 10)) {
            (Some(start), Some(end)) => utc >= start && utc < end,
            _ => false,
        }
    }

    pub fn offset_secs(&self, utc: NaiveDateTime) -> i32 {
        if self.is_dst(utc) {
            self.dst_offset_secs
        } else {
            self.std_offset_secs
        }
    }

    pub fn to_local(&self, utc: NaiveDateTime) -> NaiveDateTime {
        utc + TimeDelta::seconds(i64::from(self.offset_secs(utc)))
    }
}

/// 01:00 UTC on the last Sunday of `month` (a 31-day month).
fn switch_instant(year: i32, month: u32) -> Option<NaiveDateTime> {
    let last = NaiveDate::from_ymd_opt(year, month, 31)?;
    let back = last.weekday().num_days_from_sunday();
    let sunday = last - TimeDelta::days(i64::from(back));
    Some(sunday.and_time(NaiveTime::from_hms_opt(SWITCH_HOUR_UTC, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_winter_is_utc_plus_two() {
        let zone = DstZone::EASTERN_EUROPE;
        assert_eq!(zone.to_local(utc(2024, 1, 15, 10, 0, 0)), utc(2024, 1, 15, 12, 0, 0));
        assert!(!zone.is_dst(utc(2024, 1, 15, 10, 0, 0)));
    }

    #[test]
    fn test_summer_is_utc_plus_three() {
        let zone = DstZone::EASTERN_EUROPE;
        assert_eq!(zone.to_local(utc(2024, 7, 1, 22, 30, 0)), utc(2024, 7, 2, 1, 30, 0));
        assert!(zone.is_dst(utc(2024, 7, 1, 22, 30, 0)));
    }

    #[test]
    fn test_spring_forward_boundary() {
        let zone = DstZone::EASTERN_EUROPE;
        assert_eq!(zone.offset_secs(utc(2024, 3, 31, 0, 59, 59)), 7200);
        assert_eq!(zone.offset_secs(utc(2024, 3, 31, 1, 0, 0)), 10800);
    }

    #[test]
    fn test_fall_back_boundary() {
        let zone = DstZone::EASTERN_EUROPE;
        assert_eq!(zone.offset_secs(utc(2024, 10, 27, 0, 59, 59)), 10800);
        assert_eq!(zone.offset_secs(utc(2024, 10, 27, 1, 0, 0)), 7200);
    }

    #[test]
    fn test_utc_never_shifts() {
        let now = utc(2024, 7, 1, 12, 0, 0);
        assert_eq!(DstZone::UTC.to_local(now), now);
    }
}
