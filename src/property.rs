// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Time-varying values.
//!
//! [`Property<T>`] covers the scalar, boolean and colour attributes of path
//! graphics.  Positions have their own richer sum type in
//! [`position`](crate::position), which reuses [`SampledProperty`] for its
//! keyframes.

use std::cmp::Ordering;
use std::fmt;

use nalgebra::Vector3;

use crate::interval::TimeIntervalCollection;
use crate::JulianDate;

/// Frame in which a position value is expressed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReferenceFrame {
    /// Rotates with the planet.
    #[default]
    Fixed,
    /// Does not rotate with the planet.
    Inertial,
}

impl fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceFrame::Fixed => f.write_str("FIXED"),
            ReferenceFrame::Inertial => f.write_str("INERTIAL"),
        }
    }
}

/// Values that can be blended between two keyframes.
pub trait Interpolate: Clone {
    /// Value at `fraction` (in `[0, 1]`) of the way from `self` to `other`.
    fn interpolate(&self, other: &Self, fraction: f64) -> Self;
}

impl Interpolate for f64 {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        self + (other - self) * fraction
    }
}

impl Interpolate for bool {
    fn interpolate(&self, _other: &Self, _fraction: f64) -> Self {
        *self
    }
}

impl Interpolate for Vector3<f64> {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        self.lerp(other, fraction)
    }
}

/// How a [`SampledProperty`] fills the gap between keyframes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationAlgorithm {
    #[default]
    Linear,
    /// Keep the earlier keyframe's value until the next one.
    Hold,
}

/// Keyframes `(time, value)` kept in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledProperty<T> {
    times: Vec<JulianDate>,
    values: Vec<T>,
    interpolation: InterpolationAlgorithm,
}

impl<T> Default for SampledProperty<T> {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            values: Vec::new(),
            interpolation: InterpolationAlgorithm::default(),
        }
    }
}

impl<T: Interpolate> SampledProperty<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpolation(mut self, interpolation: InterpolationAlgorithm) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn interpolation(&self) -> InterpolationAlgorithm {
        self.interpolation
    }

    /// Inserts a keyframe, replacing any keyframe at the same time.
    pub fn add_sample(&mut self, time: JulianDate, value: T) {
        let index = self
            .times
            .partition_point(|existing| existing.compare(&time) == Ordering::Less);
        if self
            .times
            .get(index)
            .is_some_and(|existing| existing.compare(&time) == Ordering::Equal)
        {
            self.values[index] = value;
        } else {
            self.times.insert(index, time);
            self.values.insert(index, value);
        }
    }

    /// Inserts every keyframe of `samples`.
    pub fn add_samples(&mut self, samples: impl IntoIterator<Item = (JulianDate, T)>) {
        for (time, value) in samples {
            self.add_sample(time, value);
        }
    }

    /// Keyframe times, ascending.
    pub fn times(&self) -> &[JulianDate] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Value at `time`; `None` outside the keyframe range.
    pub fn value(&self, time: JulianDate) -> Option<T> {
        let index = self
            .times
            .partition_point(|existing| existing.compare(&time) == Ordering::Less);
        let next = self.times.get(index)?;
        if next.compare(&time) == Ordering::Equal {
            return Some(self.values[index].clone());
        }
        if index == 0 {
            return None;
        }

        let previous = self.times[index - 1];
        let before = &self.values[index - 1];
        match self.interpolation {
            InterpolationAlgorithm::Hold => Some(before.clone()),
            InterpolationAlgorithm::Linear => {
                let span = next.seconds_difference(&previous).value();
                let fraction = time.seconds_difference(&previous).value() / span;
                Some(before.interpolate(&self.values[index], fraction))
            }
        }
    }
}

/// A value over time.
#[derive(Debug, Clone, PartialEq)]
pub enum Property<T> {
    /// The same value at every instant.
    Constant(T),
    /// Interpolated keyframes.
    Sampled(SampledProperty<T>),
    /// Piecewise-constant values; undefined between intervals.
    Intervals(TimeIntervalCollection<T>),
}

impl<T: Interpolate> Property<T> {
    /// Value at `time`, or `None` where the property is undefined.
    pub fn value(&self, time: JulianDate) -> Option<T> {
        match self {
            Property::Constant(value) => Some(value.clone()),
            Property::Sampled(samples) => samples.value(time),
            Property::Intervals(intervals) => {
                intervals.find_data_for_interval_containing(time).cloned()
            }
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Property::Constant(_))
    }
}

impl<T> From<T> for Property<T> {
    fn from(value: T) -> Self {
        Property::Constant(value)
    }
}

/// Value of an optional property at `time`, else `default`.
pub fn value_or_default<T: Interpolate>(
    property: Option<&Property<T>>,
    time: JulianDate,
    default: T,
) -> T {
    property
        .and_then(|property| property.value(time))
        .unwrap_or(default)
}
