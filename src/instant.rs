// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Generic time–scale parameterised instant.
//!
//! [`Time<S>`] stores an integral **Julian day number** plus the seconds
//! elapsed since that day began (Julian days begin at noon).  Splitting the
//! value keeps sub-microsecond resolution over the whole ephemeris range,
//! which a single `f64` Julian day cannot.  The *meaning* of the pair is set
//! by the compile-time marker `S: TimeScale`; the crate works on the
//! [`TAI`](super::TAI) axis through the [`JulianDate`](crate::JulianDate)
//! alias.
//!
//! Values are immutable: arithmetic returns new instants, normalised so that
//! `0 <= seconds_of_day < 86 400`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use qtty::*;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ops::{Add, Sub};

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seconds in one (uniform) day.
pub(crate) const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian day number and seconds-of-day of the Unix epoch (JD 2 440 587.5).
const UNIX_EPOCH_DAY: i64 = 2_440_587;
const UNIX_EPOCH_SECONDS: f64 = 43_200.0;

// ═══════════════════════════════════════════════════════════════════════════
// TimeScale trait
// ═══════════════════════════════════════════════════════════════════════════

/// Marker trait for time scales.
///
/// A **time scale** defines a display label and the offset `TAI − S` that
/// moves an instant between the scale and the TAI axis.  Uniform scales
/// (TT, GPS) return constants; UTC consults the leap-second table.
pub trait TimeScale: Copy + Clone + std::fmt::Debug + PartialEq + PartialOrd + 'static {
    /// Display label used by [`Time`] formatting.
    const LABEL: &'static str;

    /// `TAI − S` for an instant whose Julian day is given on this scale.
    fn tai_offset(julian_day: Days) -> Seconds;

    /// `TAI − S` for an instant whose Julian day is given on the TAI axis.
    fn tai_offset_from_tai(julian_day_tai: Days) -> Seconds;
}

// ═══════════════════════════════════════════════════════════════════════════
// Time<S>, the generic instant
// ═══════════════════════════════════════════════════════════════════════════

/// A point on time scale `S`.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Time<S: TimeScale> {
    day_number: i64,
    seconds_of_day: f64,
    _scale: PhantomData<S>,
}

impl<S: TimeScale> Time<S> {
    // ── constructors ──────────────────────────────────────────────────

    /// Create from a day number and a possibly out-of-range seconds count.
    ///
    /// Seconds outside `[0, 86 400)` roll over into the day number, so
    /// `Time::new(d, -1.0)` is the last second of day `d − 1`.  The day
    /// number saturates at the ends of `i64`, and non-finite seconds give a
    /// non-finite instant (see [`is_finite`](Self::is_finite)).
    pub fn new(day_number: i64, seconds_of_day: f64) -> Self {
        let whole_days = (seconds_of_day / SECONDS_PER_DAY).floor();
        // `as` saturates, and maps NaN to 0.
        let mut day_number = day_number.saturating_add(whole_days as i64);
        let mut seconds = seconds_of_day - whole_days * SECONDS_PER_DAY;
        // Rounding in the subtraction above can land exactly on 86 400.
        if seconds >= SECONDS_PER_DAY {
            day_number = day_number.saturating_add(1);
            seconds -= SECONDS_PER_DAY;
        } else if seconds < 0.0 {
            day_number = day_number.saturating_sub(1);
            seconds += SECONDS_PER_DAY;
        }
        // Past 2^53 days the split above is no longer exact.
        if seconds.is_finite() && !(0.0..SECONDS_PER_DAY).contains(&seconds) {
            seconds = seconds.rem_euclid(SECONDS_PER_DAY);
        }
        Self {
            day_number,
            seconds_of_day: seconds,
            _scale: PhantomData,
        }
    }

    /// Create from parts already known to satisfy `0 <= seconds < 86 400`.
    pub(crate) const fn from_parts(day_number: i64, seconds_of_day: f64) -> Self {
        Self {
            day_number,
            seconds_of_day,
            _scale: PhantomData,
        }
    }

    /// Create from a fractional Julian day.
    pub fn from_julian_day(julian_day: Days) -> Self {
        let jd = julian_day.value();
        let day_number = jd.floor();
        Self::new(day_number as i64, (jd - day_number) * SECONDS_PER_DAY)
    }

    // ── accessors ─────────────────────────────────────────────────────

    /// Integral Julian day number.
    #[inline]
    pub const fn day_number(&self) -> i64 {
        self.day_number
    }

    /// Seconds elapsed since the Julian day began (at noon).
    #[inline]
    pub fn seconds_of_day(&self) -> Seconds {
        Seconds::new(self.seconds_of_day)
    }

    /// Fractional Julian day on this scale.
    #[inline]
    pub fn julian_day(&self) -> Days {
        Days::new(self.day_number as f64 + self.seconds_of_day / SECONDS_PER_DAY)
    }

    /// `true` when the seconds component is a finite number.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.seconds_of_day.is_finite()
    }

    /// Total ordering over instants of the same scale.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.day_number
            .cmp(&other.day_number)
            .then_with(|| self.seconds_of_day.total_cmp(&other.seconds_of_day))
    }

    // ── arithmetic ────────────────────────────────────────────────────

    /// Shift by a (possibly negative) number of seconds.
    #[inline]
    pub fn add_seconds(&self, seconds: Seconds) -> Self {
        Self::new(self.day_number, self.seconds_of_day + seconds.value())
    }

    /// Shift by a (possibly negative) number of days.
    #[inline]
    pub fn add_days(&self, days: Days) -> Self {
        self.add_seconds(days.to::<Second>())
    }

    /// `self − other`, in seconds.
    #[inline]
    pub fn seconds_difference(&self, other: &Self) -> Seconds {
        let days = self.day_number as f64 - other.day_number as f64;
        Seconds::new(days * SECONDS_PER_DAY + (self.seconds_of_day - other.seconds_of_day))
    }

    /// `self − other`, in days.
    #[inline]
    pub fn days_difference(&self, other: &Self) -> Days {
        self.seconds_difference(other).to::<Day>()
    }

    // ── cross-scale conversion ────────────────────────────────────────

    /// Convert this instant to another time scale, routing through TAI.
    pub fn to<T: TimeScale>(&self) -> Time<T> {
        use super::scales::TAI;
        let tai = Time::<TAI>::new(
            self.day_number,
            self.seconds_of_day + S::tai_offset(self.julian_day()).value(),
        );
        let offset = T::tai_offset_from_tai(tai.julian_day());
        Time::<T>::new(tai.day_number, tai.seconds_of_day - offset.value())
    }

    // ── UTC helpers ───────────────────────────────────────────────────

    /// Build an instant from a `chrono::DateTime<Utc>`.
    ///
    /// Leap seconds (chrono reports them as a sub-second count of at least
    /// one second) land on the inserted TAI second.
    pub fn from_utc(datetime: DateTime<Utc>) -> Self {
        use super::scales::{TAI, UTC};
        let nanos = datetime.timestamp_subsec_nanos();
        let (leap, nanos) = if nanos >= 1_000_000_000 {
            (1.0, nanos - 1_000_000_000)
        } else {
            (0.0, nanos)
        };
        let secs = datetime.timestamp();
        let utc = Time::<UTC>::new(
            UNIX_EPOCH_DAY + secs.div_euclid(86_400),
            UNIX_EPOCH_SECONDS + secs.rem_euclid(86_400) as f64 + nanos as f64 / 1e9,
        );
        utc.to::<TAI>()
            .add_seconds(Seconds::new(leap))
            .to::<S>()
    }

    /// Convert to a `chrono::DateTime<Utc>`.
    ///
    /// Returns `None` if the value falls outside chrono's representable range.
    /// An instant inside an inserted leap second maps to `23:59:59.x`.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        use super::scales::UTC;
        let utc = self.to::<UTC>();
        let day_offset = utc.day_number.checked_sub(UNIX_EPOCH_DAY)?;
        let seconds = utc.seconds_of_day - UNIX_EPOCH_SECONDS;
        let mut whole = seconds.floor();
        let mut nanos = ((seconds - whole) * 1e9).round();
        if nanos >= 1e9 {
            whole += 1.0;
            nanos = 0.0;
        }
        let secs = day_offset.checked_mul(86_400)?.checked_add(whole as i64)?;
        DateTime::<Utc>::from_timestamp(secs, nanos as u32)
    }

    /// Parse an ISO 8601 instant.
    ///
    /// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]`
    /// (read as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
    pub fn from_iso8601(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from_utc(datetime.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(Self::from_utc(naive.and_utc()));
        }
        let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map_err(|err| Error::parse(input, err))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::parse(input, "no midnight on this date"))?;
        Ok(Self::from_utc(midnight.and_utc()))
    }

    /// Format as an RFC 3339 UTC timestamp.
    pub fn to_iso8601(&self) -> Option<String> {
        self.to_utc().map(|datetime| datetime.to_rfc3339())
    }

    // ── min / max ─────────────────────────────────────────────────────

    /// Earlier of two instants.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        match self.compare(&other) {
            Ordering::Greater => other,
            _ => self,
        }
    }

    /// Later of two instants.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        match self.compare(&other) {
            Ordering::Less => other,
            _ => self,
        }
    }

    /// Midpoint between two instants.
    #[inline]
    pub fn mean(self, other: Self) -> Self {
        let half = Seconds::new(other.seconds_difference(&self).value() / 2.0);
        self.add_seconds(half)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Generic trait implementations
// ═══════════════════════════════════════════════════════════════════════════

impl<S: TimeScale> std::fmt::Display for Time<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", S::LABEL, self.julian_day())
    }
}

#[cfg(feature = "serde")]
impl<S: TimeScale> Serialize for Time<S> {
    fn serialize<Ser>(&self, serializer: Ser) -> std::result::Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        (self.day_number, self.seconds_of_day).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, S: TimeScale> Deserialize<'de> for Time<S> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (day_number, seconds_of_day) = <(i64, f64)>::deserialize(deserializer)?;
        Ok(Self::new(day_number, seconds_of_day))
    }
}

impl<S: TimeScale> Add<Seconds> for Time<S> {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Seconds) -> Self::Output {
        self.add_seconds(rhs)
    }
}

impl<S: TimeScale> Sub<Seconds> for Time<S> {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Seconds) -> Self::Output {
        self.add_seconds(Seconds::new(-rhs.value()))
    }
}

impl<S: TimeScale> Sub for Time<S> {
    type Output = Seconds;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        self.seconds_difference(&rhs)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
