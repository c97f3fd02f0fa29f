// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! [`JulianDate`] (`Time<TAI>`) specific extensions.

use qtty::*;

use super::instant::Time;
use super::scales::{self, TAI};
use super::JulianDate;

impl Time<TAI> {
    /// Julian day number of the J2000.0 epoch (2000-01-01T12:00).
    pub const J2000_DAY_NUMBER: i64 = 2_451_545;

    /// J2000.0 epoch on the TAI axis.
    pub const J2000: Self = Self::from_parts(Self::J2000_DAY_NUMBER, 0.0);

    /// One Julian century expressed in days.
    pub const JULIAN_CENTURY: Days = Days::new(36_525.0);

    /// Julian centuries since J2000.0.
    #[inline]
    pub fn julian_centuries(&self) -> Centuries {
        Centuries::new(self.days_difference(&Self::J2000).value() / Self::JULIAN_CENTURY.value())
    }

    /// Leap seconds (`TAI − UTC`) in effect at this instant.
    ///
    /// Inside an inserted leap second this already reports the new count.
    #[inline]
    pub fn tai_minus_utc(&self) -> Seconds {
        Seconds::new(scales::tai_minus_utc_from_tai(self.julian_day().value()))
    }
}

/// Parse-or-panic helper for tests and demos that hard-code their epochs.
#[cfg(test)]
pub(crate) fn iso(input: &str) -> JulianDate {
    JulianDate::from_iso8601(input).expect("valid ISO 8601 literal")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn j2000_is_noon_on_day_2451545() {
        assert_eq!(JulianDate::J2000.day_number(), 2_451_545);
        assert_eq!(JulianDate::J2000.seconds_of_day(), Seconds::new(0.0));
        assert_eq!(JulianDate::J2000.julian_centuries(), Centuries::new(0.0));
    }

    #[test]
    fn julian_centuries_count_from_j2000() {
        let later = JulianDate::J2000.add_days(Days::new(36_525.0 * 2.0));
        assert!((later.julian_centuries() - Centuries::new(2.0)).abs() < Centuries::new(1e-12));
    }

    #[test]
    fn tai_minus_utc_follows_the_table() {
        assert_eq!(iso("1999-06-01").tai_minus_utc(), Seconds::new(32.0));
        assert_eq!(iso("2010-06-01").tai_minus_utc(), Seconds::new(34.0));
        assert_eq!(iso("2020-06-01").tai_minus_utc(), Seconds::new(37.0));
    }
}
