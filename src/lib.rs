// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Globepath
//!
//! Core of a time-dynamic path visualizer for virtual globes: instants on
//! atomic and civil time scales, Earth reference-frame transforms, piecewise
//! and sampled properties, and a visualizer that keeps one polyline per
//! entity in pooled, per-frame collections.
//!
//! # Core types
//!
//! - [`Time<S>`] is an instant parameterised by a [`TimeScale`] marker.
//! - [`JulianDate`] is `Time<TAI>`, the instant used everywhere else.
//! - [`TimeInterval<D>`] and [`TimeIntervalCollection<D>`] are ranges of
//!   time, optionally carrying data.
//! - [`Property<T>`] and [`PositionProperty`] are values that change
//!   with time.
//! - [`EntityCollection`] holds [`Entity`] values and reports changes.
//! - [`PathVisualizer`] draws entity paths into a [`Scene`].
//!
//! # Time scales
//!
//! | Marker | Scale |
//! |--------|-------|
//! | [`TAI`] | International Atomic Time |
//! | [`TT`] | Terrestrial Time |
//! | [`GPS`] | GPS Time |
//! | [`UTC`] | Coordinated Universal Time (leap-second aware) |
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: `debug` for slot and pool changes,
//! `trace` for sampling and collection batches, `warn` when a path cannot be
//! drawn.  Install any subscriber to see them.

pub mod ellipsoid;
pub mod entity;
pub mod error;
pub mod event;
pub(crate) mod instant;
pub mod interval;
mod julian_date_ext;
pub mod material;
pub mod position;
pub mod property;
pub(crate) mod scales;
pub mod scene;
pub mod subsample;
pub mod transforms;
pub mod visualizer;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use ellipsoid::Ellipsoid;
pub use entity::{CollectionChanged, Entity, EntityCollection, PathGraphics};
pub use error::{Error, Result};
pub use event::{Event, ListenerId};
pub use instant::{Time, TimeScale};
pub use interval::{TimeInterval, TimeIntervalCollection};
pub use material::{Color, MaterialProperty, RevealMaterial};
pub use position::{
    DynamicPosition, EvaluationContext, PositionProperty, PropertyKind, PropertyResolver,
    ReferenceProperty, Scaling,
};
pub use property::{InterpolationAlgorithm, Property, ReferenceFrame, SampledProperty};
pub use scales::{GPS, TAI, TT, UTC};
pub use scene::{Polyline, PolylineCollection, Scene, SceneMode};
pub use subsample::subsample;
pub use transforms::EarthOrientation;
pub use visualizer::{PathVisualizer, PathVisualizerBuilder, SlotState, VisualizerOptions};

/// An instant on the TAI axis, as a Julian day number plus seconds of day.
///
/// This is a type alias for [`Time<TAI>`].
pub type JulianDate = Time<TAI>;
