// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Position properties.
//!
//! [`PositionProperty`] is a closed sum type over the ways a position can vary
//! in time.  Two variants wrap other properties:
//!
//! - [`PositionProperty::Reference`] names another entity's property by id and
//!   is looked up through a [`PropertyResolver`] on every use.
//! - [`PositionProperty::Scaled`] owns an inner property and post-processes its
//!   value.
//!
//! Following either kind of wrapper is bounded by
//! [`EvaluationContext::max_reference_depth`]; longer chains fail with
//! [`Error::CyclicReference`].

use std::fmt;
use std::rc::Rc;

use nalgebra::Vector3;

use crate::ellipsoid::Ellipsoid;
use crate::error::{Error, Result};
use crate::interval::TimeIntervalCollection;
use crate::property::{ReferenceFrame, SampledProperty};
use crate::transforms::{convert_to_reference_frame, EarthOrientation};
use crate::JulianDate;

/// Hop limit used when none is configured.
pub const DEFAULT_MAX_REFERENCE_DEPTH: usize = 32;

/// Name under which an entity exposes its position to references.
pub const POSITION_PROPERTY: &str = "position";

/// A user-supplied position source of unknown shape.
///
/// The subsampler cannot see its natural sample points, so it steps through
/// it uniformly.
pub trait DynamicPosition: fmt::Debug {
    fn value(&self, time: JulianDate) -> Option<Vector3<f64>>;

    fn reference_frame(&self) -> ReferenceFrame {
        ReferenceFrame::Fixed
    }
}

/// Non-owning link to a property of another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceProperty {
    pub target_id: String,
    pub property: String,
}

impl ReferenceProperty {
    pub fn new(target_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            property: property.into(),
        }
    }

    /// Reference to the position of entity `target_id`.
    pub fn position_of(target_id: impl Into<String>) -> Self {
        Self::new(target_id, POSITION_PROPERTY)
    }
}

/// Post-processing applied by [`PositionProperty::Scaled`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scaling {
    /// Project onto the ellipsoid surface along the geodetic normal.
    ToGeodeticSurface(Ellipsoid),
    /// Multiply every coordinate by a factor.
    Uniform(f64),
}

/// A position over time.
#[derive(Debug, Clone)]
pub enum PositionProperty {
    Constant {
        value: Vector3<f64>,
        frame: ReferenceFrame,
    },
    Sampled {
        samples: SampledProperty<Vector3<f64>>,
        frame: ReferenceFrame,
    },
    /// One constant position per interval; undefined between intervals.
    Intervals {
        intervals: TimeIntervalCollection<Vector3<f64>>,
        frame: ReferenceFrame,
    },
    /// A different position property per interval.
    Composite {
        intervals: TimeIntervalCollection<PositionProperty>,
        frame: ReferenceFrame,
    },
    Reference(ReferenceProperty),
    /// Evaluated in the fixed frame, then scaled.
    Scaled {
        inner: Box<PositionProperty>,
        scaling: Scaling,
    },
    Dynamic(Rc<dyn DynamicPosition>),
}

/// Discriminant of [`PositionProperty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Constant,
    Sampled,
    Intervals,
    Composite,
    Reference,
    Scaled,
    Generic,
}

/// Looks up the targets of [`ReferenceProperty`] links.
pub trait PropertyResolver {
    fn resolve_position(&self, reference: &ReferenceProperty) -> Option<&PositionProperty>;
}

/// Resolver for data without references: every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReferences;

impl PropertyResolver for NoReferences {
    fn resolve_position(&self, _reference: &ReferenceProperty) -> Option<&PositionProperty> {
        None
    }
}

/// Everything position evaluation needs besides the property itself.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub resolver: &'a dyn PropertyResolver,
    pub orientation: Option<&'a dyn EarthOrientation>,
    pub max_reference_depth: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(resolver: &'a dyn PropertyResolver) -> Self {
        Self {
            resolver,
            orientation: None,
            max_reference_depth: DEFAULT_MAX_REFERENCE_DEPTH,
        }
    }

    pub fn with_orientation(mut self, orientation: Option<&'a dyn EarthOrientation>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_max_reference_depth(mut self, max_reference_depth: usize) -> Self {
        self.max_reference_depth = max_reference_depth;
        self
    }

    fn resolve(&self, reference: &ReferenceProperty) -> Result<&'a PositionProperty> {
        self.resolver
            .resolve_position(reference)
            .ok_or_else(|| Error::UnresolvedReference {
                entity_id: reference.target_id.clone(),
                property: reference.property.clone(),
            })
    }

    /// Counts one more hop through a wrapper, failing past the limit.
    pub(crate) fn hop(&self, depth: usize, entity_id: &str) -> Result<usize> {
        let depth = depth + 1;
        if depth > self.max_reference_depth {
            return Err(Error::CyclicReference {
                entity_id: entity_id.to_owned(),
                max_depth: self.max_reference_depth,
            });
        }
        Ok(depth)
    }
}

impl fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("has_orientation", &self.orientation.is_some())
            .field("max_reference_depth", &self.max_reference_depth)
            .finish_non_exhaustive()
    }
}

impl PositionProperty {
    /// A fixed-frame constant position.
    pub fn constant(value: Vector3<f64>) -> Self {
        PositionProperty::Constant {
            value,
            frame: ReferenceFrame::Fixed,
        }
    }

    /// Fixed-frame keyframes.
    pub fn sampled(samples: SampledProperty<Vector3<f64>>) -> Self {
        PositionProperty::Sampled {
            samples,
            frame: ReferenceFrame::Fixed,
        }
    }

    /// Fixed-frame piecewise-constant positions.
    pub fn intervals(intervals: TimeIntervalCollection<Vector3<f64>>) -> Self {
        PositionProperty::Intervals {
            intervals,
            frame: ReferenceFrame::Fixed,
        }
    }

    pub fn composite(intervals: TimeIntervalCollection<PositionProperty>) -> Self {
        PositionProperty::Composite {
            intervals,
            frame: ReferenceFrame::Fixed,
        }
    }

    /// Link to the position of entity `target_id`.
    pub fn reference(target_id: impl Into<String>) -> Self {
        PositionProperty::Reference(ReferenceProperty::position_of(target_id))
    }

    pub fn scaled(inner: PositionProperty, scaling: Scaling) -> Self {
        PositionProperty::Scaled {
            inner: Box::new(inner),
            scaling,
        }
    }

    /// Sets the frame of a variant that carries its own.  Wrappers and
    /// dynamic sources are returned unchanged.
    pub fn with_frame(mut self, new_frame: ReferenceFrame) -> Self {
        match &mut self {
            PositionProperty::Constant { frame, .. }
            | PositionProperty::Sampled { frame, .. }
            | PositionProperty::Intervals { frame, .. }
            | PositionProperty::Composite { frame, .. } => *frame = new_frame,
            PositionProperty::Reference(_)
            | PositionProperty::Scaled { .. }
            | PositionProperty::Dynamic(_) => {}
        }
        self
    }

    pub fn kind(&self) -> PropertyKind {
        match self {
            PositionProperty::Constant { .. } => PropertyKind::Constant,
            PositionProperty::Sampled { .. } => PropertyKind::Sampled,
            PositionProperty::Intervals { .. } => PropertyKind::Intervals,
            PositionProperty::Composite { .. } => PropertyKind::Composite,
            PositionProperty::Reference(_) => PropertyKind::Reference,
            PositionProperty::Scaled { .. } => PropertyKind::Scaled,
            PositionProperty::Dynamic(_) => PropertyKind::Generic,
        }
    }

    /// Follows reference and scaled wrappers down to the property that
    /// actually holds data.
    ///
    /// # Errors
    ///
    /// [`Error::UnresolvedReference`] for a dangling link and
    /// [`Error::CyclicReference`] once more than
    /// `ctx.max_reference_depth` wrappers have been crossed.
    pub fn resolve_base<'a>(&'a self, ctx: &EvaluationContext<'a>) -> Result<&'a PositionProperty> {
        self.resolve_base_with_target(ctx).map(|(base, _)| base)
    }

    /// [`resolve_base`](Self::resolve_base), also returning the id of the
    /// last entity a reference was followed to.
    pub(crate) fn resolve_base_with_target<'a>(
        &'a self,
        ctx: &EvaluationContext<'a>,
    ) -> Result<(&'a PositionProperty, Option<&'a str>)> {
        let mut current = self;
        let mut depth = 0;
        let mut last_target = None;
        loop {
            current = match current {
                PositionProperty::Reference(reference) => {
                    last_target = Some(reference.target_id.as_str());
                    depth = ctx.hop(depth, &reference.target_id)?;
                    ctx.resolve(reference)?
                }
                PositionProperty::Scaled { inner, .. } => {
                    depth = ctx.hop(depth, last_target.unwrap_or_default())?;
                    inner.as_ref()
                }
                _ => return Ok((current, last_target)),
            };
        }
    }

    /// Frame in which this property reports values.
    ///
    /// Scaled properties always report [`ReferenceFrame::Fixed`].
    pub fn reference_frame(&self, ctx: &EvaluationContext<'_>) -> Result<ReferenceFrame> {
        let mut current = self;
        let mut depth = 0;
        loop {
            match current {
                PositionProperty::Constant { frame, .. }
                | PositionProperty::Sampled { frame, .. }
                | PositionProperty::Intervals { frame, .. }
                | PositionProperty::Composite { frame, .. } => return Ok(*frame),
                PositionProperty::Scaled { .. } => return Ok(ReferenceFrame::Fixed),
                PositionProperty::Dynamic(source) => return Ok(source.reference_frame()),
                PositionProperty::Reference(reference) => {
                    depth = ctx.hop(depth, &reference.target_id)?;
                    current = ctx.resolve(reference)?;
                }
            }
        }
    }

    /// Value at `time` expressed in `frame`.
    ///
    /// `Ok(None)` means the property is undefined at `time`, which is not an
    /// error.
    pub fn value_in_reference_frame(
        &self,
        time: JulianDate,
        frame: ReferenceFrame,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Option<Vector3<f64>>> {
        self.evaluate(time, frame, ctx, 0, "")
    }

    /// `target` is the id of the entity the last reference led to.
    fn evaluate(
        &self,
        time: JulianDate,
        frame: ReferenceFrame,
        ctx: &EvaluationContext<'_>,
        depth: usize,
        target: &str,
    ) -> Result<Option<Vector3<f64>>> {
        let convert = |value: Vector3<f64>, from: ReferenceFrame| {
            convert_to_reference_frame(time, value, from, frame, ctx.orientation).map(Some)
        };

        match self {
            PositionProperty::Constant { value, frame: from } => convert(*value, *from),
            PositionProperty::Sampled { samples, frame: from } => match samples.value(time) {
                Some(value) => convert(value, *from),
                None => Ok(None),
            },
            PositionProperty::Intervals {
                intervals,
                frame: from,
            } => match intervals.find_data_for_interval_containing(time) {
                Some(value) => convert(*value, *from),
                None => Ok(None),
            },
            PositionProperty::Composite { intervals, .. } => {
                match intervals.find_data_for_interval_containing(time) {
                    Some(inner) => inner.evaluate(time, frame, ctx, depth, target),
                    None => Ok(None),
                }
            }
            PositionProperty::Reference(reference) => {
                let depth = ctx.hop(depth, &reference.target_id)?;
                ctx.resolve(reference)?
                    .evaluate(time, frame, ctx, depth, &reference.target_id)
            }
            PositionProperty::Scaled { inner, scaling } => {
                let depth = ctx.hop(depth, target)?;
                let fixed = inner.evaluate(time, ReferenceFrame::Fixed, ctx, depth, target)?;
                let Some(fixed) = fixed else {
                    return Ok(None);
                };
                let scaled = match scaling {
                    Scaling::ToGeodeticSurface(ellipsoid) => {
                        match ellipsoid.scale_to_geodetic_surface(&fixed) {
                            Some(surface) => surface,
                            None => return Ok(None),
                        }
                    }
                    Scaling::Uniform(factor) => fixed * *factor,
                };
                convert(scaled, ReferenceFrame::Fixed)
            }
            PositionProperty::Dynamic(source) => match source.value(time) {
                Some(value) => convert(value, source.reference_frame()),
                None => Ok(None),
            },
        }
    }
}

impl From<Vector3<f64>> for PositionProperty {
    fn from(value: Vector3<f64>) -> Self {
        PositionProperty::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::TimeInterval;
    use crate::transforms::compute_teme_to_pseudo_fixed_matrix;
    use approx::assert_relative_eq;
    use qtty::Seconds;
    use std::collections::HashMap;

    fn at(seconds: f64) -> JulianDate {
        JulianDate::J2000.add_seconds(Seconds::new(seconds))
    }

    #[derive(Default)]
    struct Table(HashMap<String, PositionProperty>);

    impl PropertyResolver for Table {
        fn resolve_position(&self, reference: &ReferenceProperty) -> Option<&PositionProperty> {
            if reference.property != POSITION_PROPERTY {
                return None;
            }
            self.0.get(&reference.target_id)
        }
    }

    #[derive(Debug)]
    struct Orbit;

    impl DynamicPosition for Orbit {
        fn value(&self, time: JulianDate) -> Option<Vector3<f64>> {
            let t = (time - JulianDate::J2000).value();
            Some(Vector3::new(t.cos(), t.sin(), 0.0))
        }
    }

    #[test]
    fn kinds_match_variants() {
        assert_eq!(PositionProperty::constant(Vector3::zeros()).kind(), PropertyKind::Constant);
        assert_eq!(PositionProperty::reference("a").kind(), PropertyKind::Reference);
        assert_eq!(
            PositionProperty::Dynamic(Rc::new(Orbit)).kind(),
            PropertyKind::Generic
        );
        assert_eq!(
            PositionProperty::scaled(Vector3::x().into(), Scaling::Uniform(2.0)).kind(),
            PropertyKind::Scaled
        );
    }

    #[test]
    fn reference_resolves_through_the_resolver() {
        let mut table = Table::default();
        table.0.insert(
            "target".into(),
            PositionProperty::constant(Vector3::new(1.0, 2.0, 3.0)).with_frame(ReferenceFrame::Inertial),
        );
        let ctx = EvaluationContext::new(&table);
        let link = PositionProperty::reference("target");

        assert_eq!(link.resolve_base(&ctx).unwrap().kind(), PropertyKind::Constant);
        assert_eq!(link.reference_frame(&ctx).unwrap(), ReferenceFrame::Inertial);
        let value = link
            .value_in_reference_frame(at(0.0), ReferenceFrame::Inertial, &ctx)
            .unwrap();
        assert_eq!(value, Some(Vector3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let ctx = EvaluationContext::new(&NoReferences);
        let link = PositionProperty::reference("ghost");
        let err = link.resolve_base(&ctx).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedReference {
                entity_id: "ghost".into(),
                property: POSITION_PROPERTY.into()
            }
        );
    }

    #[test]
    fn reference_cycles_are_bounded() {
        let mut table = Table::default();
        table.0.insert("a".into(), PositionProperty::reference("b"));
        table.0.insert("b".into(), PositionProperty::reference("a"));
        let ctx = EvaluationContext::new(&table).with_max_reference_depth(8);
        let link = PositionProperty::reference("a");

        assert!(matches!(
            link.resolve_base(&ctx),
            Err(Error::CyclicReference { max_depth: 8, .. })
        ));
        assert!(matches!(
            link.reference_frame(&ctx),
            Err(Error::CyclicReference { .. })
        ));
        assert!(matches!(
            link.value_in_reference_frame(at(0.0), ReferenceFrame::Fixed, &ctx),
            Err(Error::CyclicReference { .. })
        ));
    }

    #[test]
    fn cycles_through_scaling_name_the_entity() {
        let mut table = Table::default();
        table.0.insert(
            "a".into(),
            PositionProperty::scaled(PositionProperty::reference("a"), Scaling::Uniform(2.0)),
        );
        // Odd limit: the hop that overflows is the scaled one.
        let ctx = EvaluationContext::new(&table).with_max_reference_depth(7);
        let link = PositionProperty::reference("a");

        let err = link
            .value_in_reference_frame(at(0.0), ReferenceFrame::Fixed, &ctx)
            .unwrap_err();
        assert!(matches!(&err, Error::CyclicReference { entity_id, max_depth: 7 } if entity_id == "a"));
        let err = link.resolve_base(&ctx).unwrap_err();
        assert!(matches!(&err, Error::CyclicReference { entity_id, .. } if entity_id == "a"));
    }

    #[test]
    fn scaled_projects_to_the_surface_in_fixed() {
        let ctx = EvaluationContext::new(&NoReferences);
        let inner = PositionProperty::constant(Vector3::new(3.0, 4.0, 0.0));
        let scaled = PositionProperty::scaled(inner, Scaling::ToGeodeticSurface(Ellipsoid::unit_sphere()));

        assert_eq!(scaled.resolve_base(&ctx).unwrap().kind(), PropertyKind::Constant);
        assert_eq!(scaled.reference_frame(&ctx).unwrap(), ReferenceFrame::Fixed);
        let value = scaled
            .value_in_reference_frame(at(0.0), ReferenceFrame::Fixed, &ctx)
            .unwrap()
            .unwrap();
        assert_relative_eq!(value, Vector3::new(0.6, 0.8, 0.0), epsilon = 1e-12);

        let doubled = PositionProperty::scaled(Vector3::x().into(), Scaling::Uniform(2.0));
        let value = doubled
            .value_in_reference_frame(at(0.0), ReferenceFrame::Fixed, &ctx)
            .unwrap();
        assert_eq!(value, Some(Vector3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn inertial_values_convert_to_fixed() {
        let ctx = EvaluationContext::new(&NoReferences);
        let time = at(1_000.0);
        let p = Vector3::new(7_000_000.0, 0.0, 0.0);
        let property = PositionProperty::constant(p).with_frame(ReferenceFrame::Inertial);

        let fixed = property
            .value_in_reference_frame(time, ReferenceFrame::Fixed, &ctx)
            .unwrap()
            .unwrap();
        let expected = compute_teme_to_pseudo_fixed_matrix(time).unwrap() * p;
        assert_relative_eq!(fixed, expected);
    }

    #[test]
    fn composite_delegates_to_the_active_interval() {
        let ctx = EvaluationContext::new(&NoReferences);
        let mut samples = SampledProperty::new();
        samples.add_samples([(at(10.0), Vector3::zeros()), (at(20.0), Vector3::new(10.0, 0.0, 0.0))]);

        let composite = PositionProperty::composite(
            TimeIntervalCollection::from_intervals([
                TimeInterval::with_data(at(0.0), at(10.0), PositionProperty::constant(Vector3::z()))
                    .with_inclusion(true, false),
                TimeInterval::with_data(at(10.0), at(20.0), PositionProperty::sampled(samples)),
            ])
            .unwrap(),
        );

        let value = |s: f64| {
            composite
                .value_in_reference_frame(at(s), ReferenceFrame::Fixed, &ctx)
                .unwrap()
        };
        assert_eq!(value(5.0), Some(Vector3::z()));
        assert_eq!(value(15.0), Some(Vector3::new(5.0, 0.0, 0.0)));
        assert_eq!(value(25.0), None);
    }

    #[test]
    fn dynamic_sources_are_evaluated_directly() {
        let ctx = EvaluationContext::new(&NoReferences);
        let property = PositionProperty::Dynamic(Rc::new(Orbit));
        let value = property
            .value_in_reference_frame(at(0.0), ReferenceFrame::Fixed, &ctx)
            .unwrap();
        assert_eq!(value, Some(Vector3::x()));
    }
}
