// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Time-scale marker types.
//!
//! Each zero-sized type identifies a time scale and encodes how values in
//! that scale relate to **International Atomic Time** (TAI), the uniform axis
//! on which [`JulianDate`](crate::JulianDate) is stored.
//!
//! | Marker | Description | `TAI − scale` |
//! |--------|-------------|---------------|
//! | [`TAI`] | International Atomic Time | 0 s |
//! | [`TT`]  | Terrestrial Time | −32.184 s |
//! | [`GPS`] | GPS Time | +19 s |
//! | [`UTC`] | Coordinated Universal Time | leap-second table |

use super::instant::TimeScale;
use qtty::{Days, Seconds};

/// International Atomic Time, the identity scale.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct TAI;

impl TimeScale for TAI {
    const LABEL: &'static str = "TAI";

    #[inline(always)]
    fn tai_offset(_julian_day: Days) -> Seconds {
        Seconds::new(0.0)
    }

    #[inline(always)]
    fn tai_offset_from_tai(_julian_day_tai: Days) -> Seconds {
        Seconds::new(0.0)
    }
}

/// Terrestrial Time.
///
/// `TT = TAI + 32.184 s`.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct TT;

/// `TT − TAI` in seconds.
const TT_MINUS_TAI: f64 = 32.184;

impl TimeScale for TT {
    const LABEL: &'static str = "TT";

    #[inline(always)]
    fn tai_offset(_julian_day: Days) -> Seconds {
        Seconds::new(-TT_MINUS_TAI)
    }

    #[inline(always)]
    fn tai_offset_from_tai(_julian_day_tai: Days) -> Seconds {
        Seconds::new(-TT_MINUS_TAI)
    }
}

/// GPS Time.
///
/// GPS time has a fixed offset from TAI: `GPS = TAI − 19 s`.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct GPS;

/// `TAI − GPS` in seconds.
const TAI_MINUS_GPS: f64 = 19.0;

impl TimeScale for GPS {
    const LABEL: &'static str = "GPS";

    #[inline(always)]
    fn tai_offset(_julian_day: Days) -> Seconds {
        Seconds::new(TAI_MINUS_GPS)
    }

    #[inline(always)]
    fn tai_offset_from_tai(_julian_day_tai: Days) -> Seconds {
        Seconds::new(TAI_MINUS_GPS)
    }
}

/// Coordinated Universal Time.
///
/// Applies the cumulative leap-second offset from IERS Bulletin C.  The table
/// covers 1972–2017 (28 insertions); before 1972 the offset is fixed at the
/// initial 10 s.  A `Time<UTC>` cannot name the inserted second itself
/// (`23:59:60`); use [`Time::from_utc`](super::instant::Time::from_utc) with a
/// chrono leap-second timestamp to land on it in TAI.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct UTC;

impl TimeScale for UTC {
    const LABEL: &'static str = "UTC";

    #[inline]
    fn tai_offset(julian_day: Days) -> Seconds {
        Seconds::new(tai_minus_utc(julian_day.value()))
    }

    #[inline]
    fn tai_offset_from_tai(julian_day_tai: Days) -> Seconds {
        Seconds::new(tai_minus_utc_from_tai(julian_day_tai.value()))
    }
}

/// Leap-second table: (JD of leap-second insertion, cumulative TAI−UTC after).
/// Source: IERS Bulletin C. Entries are the JD of 00:00:00 UTC on the day
/// the leap second takes effect (i.e. the second is inserted at the end
/// of the previous day).
const LEAP_SECONDS: [(f64, f64); 28] = [
    (2_441_317.5, 10.0), // 1972-01-01
    (2_441_499.5, 11.0), // 1972-07-01
    (2_441_683.5, 12.0), // 1973-01-01
    (2_442_048.5, 13.0), // 1974-01-01
    (2_442_413.5, 14.0), // 1975-01-01
    (2_442_778.5, 15.0), // 1976-01-01
    (2_443_144.5, 16.0), // 1977-01-01
    (2_443_509.5, 17.0), // 1978-01-01
    (2_443_874.5, 18.0), // 1979-01-01
    (2_444_239.5, 19.0), // 1980-01-01
    (2_444_786.5, 20.0), // 1981-07-01
    (2_445_151.5, 21.0), // 1982-07-01
    (2_445_516.5, 22.0), // 1983-07-01
    (2_446_247.5, 23.0), // 1985-07-01
    (2_447_161.5, 24.0), // 1988-01-01
    (2_447_892.5, 25.0), // 1990-01-01
    (2_448_257.5, 26.0), // 1991-01-01
    (2_448_804.5, 27.0), // 1992-07-01
    (2_449_169.5, 28.0), // 1993-07-01
    (2_449_534.5, 29.0), // 1994-07-01
    (2_450_083.5, 30.0), // 1996-01-01
    (2_450_630.5, 31.0), // 1997-07-01
    (2_451_179.5, 32.0), // 1999-01-01
    (2_453_736.5, 33.0), // 2006-01-01
    (2_454_832.5, 34.0), // 2009-01-01
    (2_456_109.5, 35.0), // 2012-07-01
    (2_457_204.5, 36.0), // 2015-07-01
    (2_457_754.5, 37.0), // 2017-01-01
];

/// Offset in effect before the first table entry.
const PRE_1972_OFFSET: f64 = 10.0;

/// Index one past the last table entry whose key satisfies `key(entry) <= jd`.
#[inline]
fn upper_bound(jd: f64, key: impl Fn(&(f64, f64)) -> f64) -> usize {
    let mut lo = 0usize;
    let mut hi = LEAP_SECONDS.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key(&LEAP_SECONDS[mid]) <= jd {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Look up cumulative TAI−UTC (leap seconds) for a JD on the UTC axis.
///
/// Before 1972 the conventional initial offset of 10 s is returned.
#[inline]
pub fn tai_minus_utc(jd_utc: f64) -> f64 {
    match upper_bound(jd_utc, |entry| entry.0) {
        0 => PRE_1972_OFFSET,
        n => LEAP_SECONDS[n - 1].1,
    }
}

/// Look up cumulative TAI−UTC for a JD on the TAI axis.
///
/// Each insertion takes effect at TAI `JD(UTC) + offset`, so the inserted
/// second itself already reports the new offset.
#[inline]
pub fn tai_minus_utc_from_tai(jd_tai: f64) -> f64 {
    match upper_bound(jd_tai, |entry| entry.0 + (entry.1 - 1.0) / 86_400.0) {
        0 => PRE_1972_OFFSET,
        n => LEAP_SECONDS[n - 1].1,
    }
}
