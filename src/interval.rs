// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Time interval implementation.
//!
//! This module provides:
//! - [`TimeInterval<D>`]: a `[start, stop]` range with per-endpoint
//!   inclusion flags and an optional payload `D`.
//! - [`TimeIntervalCollection<D>`]: start-ascending, non-overlapping
//!   intervals, used for piecewise properties.

use std::cmp::Ordering;
use std::fmt;

use qtty::Seconds;

use crate::error::{Error, Result};
use crate::JulianDate;

/// Represents an interval between two instants, optionally carrying data.
///
/// The payload `D` says what applies during the range, e.g. the sub-property
/// of a composite property.  Plain ranges use the default `D = ()`.
///
/// # Examples
///
/// ```
/// use globepath::{JulianDate, TimeInterval};
/// use qtty::Seconds;
///
/// let start = JulianDate::J2000;
/// let stop = start.add_seconds(Seconds::new(60.0));
/// let interval = TimeInterval::new(start, stop);
///
/// assert_eq!(interval.duration(), Seconds::new(60.0));
/// assert!(interval.contains(stop));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInterval<D = ()> {
    pub start: JulianDate,
    pub stop: JulianDate,
    pub is_start_included: bool,
    pub is_stop_included: bool,
    pub data: D,
}

impl TimeInterval<()> {
    /// Creates a closed interval `[start, stop]` without data.
    pub fn new(start: JulianDate, stop: JulianDate) -> Self {
        Self::with_data(start, stop, ())
    }

    /// Parses an ISO 8601 interval of the form `start/stop`.
    ///
    /// ```
    /// use globepath::TimeInterval;
    ///
    /// let year = TimeInterval::from_iso8601("2000-01-01/2001-01-01").unwrap();
    /// assert!(year.start < year.stop);
    /// ```
    pub fn from_iso8601(input: &str) -> Result<Self> {
        let (start, stop) = input
            .split_once('/')
            .ok_or_else(|| Error::parse(input, "expected `start/stop`"))?;
        Ok(Self::new(
            JulianDate::from_iso8601(start)?,
            JulianDate::from_iso8601(stop)?,
        ))
    }
}

impl<D> TimeInterval<D> {
    /// Creates a closed interval `[start, stop]` carrying `data`.
    pub fn with_data(start: JulianDate, stop: JulianDate, data: D) -> Self {
        TimeInterval {
            start,
            stop,
            is_start_included: true,
            is_stop_included: true,
            data,
        }
    }

    /// Returns the same interval with the given endpoint inclusion flags.
    pub fn with_inclusion(mut self, is_start_included: bool, is_stop_included: bool) -> Self {
        self.is_start_included = is_start_included;
        self.is_stop_included = is_stop_included;
        self
    }

    /// `true` when no instant lies in the interval.
    ///
    /// A zero-length interval is a single instant only when both ends are
    /// included; otherwise it is empty.
    pub fn is_empty(&self) -> bool {
        match self.stop.compare(&self.start) {
            Ordering::Less => true,
            Ordering::Equal => !(self.is_start_included && self.is_stop_included),
            Ordering::Greater => false,
        }
    }

    /// `true` when `time` lies in the interval, honouring the inclusion flags.
    pub fn contains(&self, time: JulianDate) -> bool {
        if self.is_empty() {
            return false;
        }
        let after_start = match time.compare(&self.start) {
            Ordering::Greater => true,
            Ordering::Equal => self.is_start_included,
            Ordering::Less => false,
        };
        let before_stop = match time.compare(&self.stop) {
            Ordering::Less => true,
            Ordering::Equal => self.is_stop_included,
            Ordering::Greater => false,
        };
        after_start && before_stop
    }

    /// Returns the duration of the interval.
    pub fn duration(&self) -> Seconds {
        self.stop.seconds_difference(&self.start)
    }

    /// Borrows the payload, producing an interval over the same range.
    pub fn as_ref(&self) -> TimeInterval<&D> {
        TimeInterval {
            start: self.start,
            stop: self.stop,
            is_start_included: self.is_start_included,
            is_stop_included: self.is_stop_included,
            data: &self.data,
        }
    }

    /// Returns the overlapping sub-interval of `self` and `other`, keeping
    /// the payload of `self`.
    ///
    /// At a boundary both operands share, the result includes the boundary
    /// only if both did; elsewhere it inherits the flag of the operand that
    /// supplies the boundary.  `None` is returned when the overlap is empty,
    /// including the case of a single shared instant that either side
    /// excludes.
    pub fn intersect<E>(&self, other: &TimeInterval<E>) -> Option<TimeInterval<D>>
    where
        D: Clone,
    {
        self.intersect_with(other, |data, _| data.clone())
    }

    /// Like [`intersect`](Self::intersect), building the payload of the
    /// result from both operands.
    pub fn intersect_with<E, R>(
        &self,
        other: &TimeInterval<E>,
        merge: impl FnOnce(&D, &E) -> R,
    ) -> Option<TimeInterval<R>> {
        if self.is_empty() || other.is_empty() {
            return None;
        }

        let (start, is_start_included) = match self.start.compare(&other.start) {
            Ordering::Greater => (self.start, self.is_start_included),
            Ordering::Less => (other.start, other.is_start_included),
            Ordering::Equal => (
                self.start,
                self.is_start_included && other.is_start_included,
            ),
        };
        let (stop, is_stop_included) = match self.stop.compare(&other.stop) {
            Ordering::Less => (self.stop, self.is_stop_included),
            Ordering::Greater => (other.stop, other.is_stop_included),
            Ordering::Equal => (self.stop, self.is_stop_included && other.is_stop_included),
        };

        let result = TimeInterval {
            start,
            stop,
            is_start_included,
            is_stop_included,
            data: (),
        };
        if result.is_empty() {
            return None;
        }
        Some(TimeInterval {
            start,
            stop,
            is_start_included,
            is_stop_included,
            data: merge(&self.data, &other.data),
        })
    }
}

impl<D> fmt::Display for TimeInterval<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.is_start_included { '[' } else { '(' };
        let close = if self.is_stop_included { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.start, self.stop)
    }
}

/// An ordered set of non-overlapping [`TimeInterval`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIntervalCollection<D = ()> {
    intervals: Vec<TimeInterval<D>>,
}

impl<D> Default for TimeIntervalCollection<D> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}

impl<D> TimeIntervalCollection<D> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from intervals given in any order.
    pub fn from_intervals(intervals: impl IntoIterator<Item = TimeInterval<D>>) -> Result<Self> {
        let mut collection = Self::new();
        for interval in intervals {
            collection.add_interval(interval)?;
        }
        Ok(collection)
    }

    /// Inserts `interval` at its start-ordered position.
    ///
    /// Empty intervals are ignored.  An interval that overlaps one already in
    /// the collection is rejected with [`Error::OverlappingInterval`].
    pub fn add_interval(&mut self, interval: TimeInterval<D>) -> Result<()> {
        if interval.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self
            .intervals
            .iter()
            .find(|existing| existing.intersect_with(&interval, |_, _| ()).is_some())
        {
            return Err(Error::OverlappingInterval(format!(
                "{interval} overlaps {existing}"
            )));
        }
        let index = self
            .intervals
            .partition_point(|existing| existing.start.compare(&interval.start) != Ordering::Greater);
        self.intervals.insert(index, interval);
        Ok(())
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// `true` when the collection holds no interval.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The interval at `index`, in start order.
    pub fn get(&self, index: usize) -> Option<&TimeInterval<D>> {
        self.intervals.get(index)
    }

    /// Iterates the intervals in start order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimeInterval<D>> {
        self.intervals.iter()
    }

    /// Start of the first interval.
    pub fn start(&self) -> Option<JulianDate> {
        self.intervals.first().map(|interval| interval.start)
    }

    /// Stop of the last interval.
    pub fn stop(&self) -> Option<JulianDate> {
        self.intervals.last().map(|interval| interval.stop)
    }

    /// Index of the interval containing `time`.
    pub fn index_of(&self, time: JulianDate) -> Option<usize> {
        let upper = self
            .intervals
            .partition_point(|interval| interval.start.compare(&time) != Ordering::Greater);
        // Two touching intervals can both start at or before `time`.
        (upper.saturating_sub(2)..upper).rev().find(|&index| self.intervals[index].contains(time))
    }

    /// The interval containing `time`.
    pub fn find_interval_containing(&self, time: JulianDate) -> Option<&TimeInterval<D>> {
        self.index_of(time).map(|index| &self.intervals[index])
    }

    /// The payload of the interval containing `time`.
    pub fn find_data_for_interval_containing(&self, time: JulianDate) -> Option<&D> {
        self.find_interval_containing(time).map(|interval| &interval.data)
    }
}

impl<'a, D> IntoIterator for &'a TimeIntervalCollection<D> {
    type Item = &'a TimeInterval<D>;
    type IntoIter = std::slice::Iter<'a, TimeInterval<D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
