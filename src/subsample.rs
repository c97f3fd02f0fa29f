// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Path subsampling.
//!
//! Turns a [`PositionProperty`] over `[start, stop]` into the vertex list of
//! a polyline.  The sample times depend on what the property really is once
//! references and scaling are looked through:
//!
//! | Base variant | Sample times |
//! |--------------|--------------|
//! | sampled | `start`, keyframes strictly inside the range, `stop`; long gaps are split |
//! | intervals | one per overlapping interval |
//! | composite | each overlapping sub-property over its clipped range |
//! | constant | `start` |
//! | dynamic | every `max(max_step, 60 s)` from `start`, then `stop` |
//!
//! Values are always read through the outer property, so wrappers still
//! apply, including wrappers around a composite.  Times at which the
//! property is undefined are skipped.

use std::cmp::Ordering;
use std::ptr;

use nalgebra::Vector3;
use qtty::Seconds;
use tracing::trace;

use crate::error::{Error, Result};
use crate::interval::{TimeInterval, TimeIntervalCollection};
use crate::position::{EvaluationContext, PositionProperty};
use crate::property::ReferenceFrame;
use crate::JulianDate;

/// Smallest step used for properties without natural sample points.
const MIN_GENERIC_STEP: f64 = 60.0;

/// Samples `property` over `[start, stop]` into a new vector.
///
/// `max_step` bounds the time between consecutive vertices of sampled
/// properties.  The result is a pure function of the inputs.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for non-finite bounds, and any resolution
/// error of the property ([`Error::CyclicReference`],
/// [`Error::UnresolvedReference`]).
pub fn subsample(
    property: &PositionProperty,
    start: JulianDate,
    stop: JulianDate,
    frame: ReferenceFrame,
    max_step: Seconds,
    ctx: &EvaluationContext<'_>,
) -> Result<Vec<Vector3<f64>>> {
    let mut result = Vec::new();
    subsample_into(property, start, stop, frame, max_step, ctx, &mut result)?;
    Ok(result)
}

/// Like [`subsample`], reusing the allocation of `result`, which is cleared
/// first.
pub fn subsample_into(
    property: &PositionProperty,
    start: JulianDate,
    stop: JulianDate,
    frame: ReferenceFrame,
    max_step: Seconds,
    ctx: &EvaluationContext<'_>,
    result: &mut Vec<Vector3<f64>>,
) -> Result<()> {
    if !start.is_finite() || !stop.is_finite() {
        return Err(Error::invalid_argument("subsample range must be finite"));
    }
    result.clear();
    let sampler = Sampler {
        frame,
        max_step: max_step.value(),
        ctx,
    };
    sampler.sample(property, property, start, stop, Trail::default(), result)?;
    trace!(samples = result.len(), kind = ?property.kind(), "subsampled path");
    Ok(())
}

/// How a composite was reached: how many composites deep, and the last
/// entity a reference led to.
#[derive(Clone, Copy, Default)]
struct Trail<'t> {
    depth: usize,
    target: &'t str,
}

struct Sampler<'c, 'a> {
    frame: ReferenceFrame,
    max_step: f64,
    ctx: &'c EvaluationContext<'a>,
}

impl Sampler<'_, '_> {
    /// Samples `value` at the times `source` calls for.
    ///
    /// The two only differ below a wrapped composite, where the times come
    /// from one part but the values still go through the wrappers.
    fn sample(
        &self,
        value: &PositionProperty,
        source: &PositionProperty,
        start: JulianDate,
        stop: JulianDate,
        trail: Trail<'_>,
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        let (base, last_target) = source.resolve_base_with_target(self.ctx)?;
        let trail = Trail {
            target: last_target.unwrap_or(trail.target),
            ..trail
        };
        match base {
            PositionProperty::Sampled { samples, .. } => {
                self.sampled(value, start, stop, samples.times(), out)
            }
            PositionProperty::Composite { intervals, .. } => {
                let wrapper = (!ptr::eq(value, base)).then_some(value);
                self.composite(wrapper, intervals, start, stop, trail, out)
            }
            PositionProperty::Intervals { intervals, .. } => {
                self.intervals(value, intervals, start, stop, out)
            }
            PositionProperty::Constant { .. } => self.push(value, start, out),
            _ => self.generic(value, start, stop, out),
        }
    }

    /// Appends the value at `time` if the property is defined there.
    fn push(
        &self,
        property: &PositionProperty,
        time: JulianDate,
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        if let Some(value) = property.value_in_reference_frame(time, self.frame, self.ctx)? {
            out.push(value);
        }
        Ok(())
    }

    fn sampled(
        &self,
        property: &PositionProperty,
        start: JulianDate,
        stop: JulianDate,
        times: &[JulianDate],
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        self.push(property, start, out)?;

        // Keyframes outside the range still drive the gap splitting of the
        // boundary segments.
        let mut index = 0;
        let mut current = match times.first() {
            Some(first) => *first,
            None => return self.push(property, stop, out),
        };
        let mut sampling = false;
        let mut steps_to_take = 0usize;
        let mut steps_taken = 0usize;
        let mut step_size = 0.0;

        while index < times.len() {
            if current.compare(&start) == Ordering::Greater && current.compare(&stop) == Ordering::Less {
                self.push(property, current, out)?;
            }

            if index + 1 < times.len() {
                if self.max_step > 0.0 && !sampling {
                    let gap = times[index + 1].seconds_difference(&current).value();
                    sampling = gap > self.max_step;
                    if sampling {
                        let steps = (gap / self.max_step).ceil();
                        steps_taken = 0;
                        step_size = gap / steps.max(2.0);
                        steps_to_take = (steps - 1.0).max(1.0) as usize;
                    }
                }
                if sampling && steps_taken < steps_to_take {
                    current = current.add_seconds(Seconds::new(step_size));
                    steps_taken += 1;
                    continue;
                }
            }

            sampling = false;
            index += 1;
            if let Some(next) = times.get(index) {
                current = *next;
            }
        }

        self.push(property, stop, out)
    }

    fn intervals<D>(
        &self,
        property: &PositionProperty,
        intervals: &TimeIntervalCollection<D>,
        start: JulianDate,
        stop: JulianDate,
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        let range = TimeInterval::new(start, stop);
        for interval in intervals {
            if interval.intersect_with(&range, |_, _| ()).is_none() {
                continue;
            }
            let time = if interval.is_start_included {
                interval.start
            } else if interval.is_stop_included {
                interval.stop
            } else {
                interval.start.mean(interval.stop)
            };
            self.push(property, time, out)?;
        }
        Ok(())
    }

    /// Without a `wrapper`, each part is read directly.
    fn composite(
        &self,
        wrapper: Option<&PositionProperty>,
        intervals: &TimeIntervalCollection<PositionProperty>,
        start: JulianDate,
        stop: JulianDate,
        trail: Trail<'_>,
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        // A composite can reach itself again through a reference.
        let trail = Trail {
            depth: self.ctx.hop(trail.depth, trail.target)?,
            ..trail
        };

        let range = TimeInterval::new(start, stop);
        for interval in intervals {
            if interval.intersect_with(&range, |_, _| ()).is_none() {
                continue;
            }
            let sample_start = interval.start.max(start);
            let sample_stop = interval.stop.min(stop);
            let value = wrapper.unwrap_or(&interval.data);
            self.sample(value, &interval.data, sample_start, sample_stop, trail, out)?;
        }
        Ok(())
    }

    fn generic(
        &self,
        property: &PositionProperty,
        start: JulianDate,
        stop: JulianDate,
        out: &mut Vec<Vector3<f64>>,
    ) -> Result<()> {
        let step = self.max_step.max(MIN_GENERIC_STEP);
        let span = stop.seconds_difference(&start).value();
        // Offsets are counted from `start` and never pass `span`, whatever
        // the step.
        let mut offset = 0.0;
        let mut steps = 0.0;
        while offset < span {
            self.push(property, start.add_seconds(Seconds::new(offset)), out)?;
            steps += 1.0;
            offset = step * steps;
        }
        self.push(property, stop, out)
    }
}
