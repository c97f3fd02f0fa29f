// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Reference ellipsoids.
//!
//! An [`Ellipsoid`] is described by its three semi-axes in metres, in the
//! Cartesian fixed frame.  [`Ellipsoid::wgs84`] is the default shape for
//! every transform that takes an optional ellipsoid.

use nalgebra::Vector3;

/// WGS84 equatorial radius, metres.
const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;
/// WGS84 polar radius, metres.
const WGS84_SEMI_MINOR: f64 = 6_356_752.314_245_179_3;

/// Squared distance (in unit-sphere space) under which a point is treated as
/// the centre and projected radially.
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;
const NEWTON_EPSILON: f64 = 1e-12;
const NEWTON_MAX_ITERATIONS: usize = 64;

/// A quadratic surface `(x/a)² + (y/b)² + (z/c)² = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ellipsoid {
    radii: Vector3<f64>,
}

impl Ellipsoid {
    /// Creates an ellipsoid from its semi-axes.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            radii: Vector3::new(x, y, z),
        }
    }

    /// The WGS84 ellipsoid.
    pub fn wgs84() -> Self {
        Self::new(WGS84_SEMI_MAJOR, WGS84_SEMI_MAJOR, WGS84_SEMI_MINOR)
    }

    /// A sphere of radius one.
    pub fn unit_sphere() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    #[inline]
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    #[inline]
    pub fn radii_squared(&self) -> Vector3<f64> {
        self.radii.component_mul(&self.radii)
    }

    #[inline]
    pub fn one_over_radii(&self) -> Vector3<f64> {
        self.radii.map(|r| 1.0 / r)
    }

    #[inline]
    pub fn one_over_radii_squared(&self) -> Vector3<f64> {
        self.radii.map(|r| 1.0 / (r * r))
    }

    /// Unit normal to the surface through the level set containing `position`.
    ///
    /// Returns `None` at the centre, where the normal is undefined.
    pub fn geodetic_surface_normal(&self, position: &Vector3<f64>) -> Option<Vector3<f64>> {
        position
            .component_mul(&self.one_over_radii_squared())
            .try_normalize(0.0)
    }

    /// Projects `position` along the geodetic normal onto the surface.
    ///
    /// Points near the centre are projected radially instead.  Returns `None`
    /// when `position` is the centre itself.
    pub fn scale_to_geodetic_surface(&self, position: &Vector3<f64>) -> Option<Vector3<f64>> {
        let one_over_radii = self.one_over_radii();
        let one_over_radii_squared = self.one_over_radii_squared();

        let scaled = position.component_mul(&one_over_radii);
        let squared = scaled.component_mul(&scaled);
        let squared_norm = squared.sum();
        let ratio = (1.0 / squared_norm).sqrt();
        let intersection = position * ratio;

        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return ratio.is_finite().then_some(intersection);
        }

        let gradient = intersection.component_mul(&one_over_radii_squared) * 2.0;
        let mut lambda = (1.0 - ratio) * position.norm() / (0.5 * gradient.norm());
        let mut correction = 0.0;
        let mut multiplier = Vector3::repeat(1.0);

        for _ in 0..NEWTON_MAX_ITERATIONS {
            lambda -= correction;
            multiplier = one_over_radii_squared.map(|inv| 1.0 / (1.0 + lambda * inv));
            let multiplier2 = multiplier.component_mul(&multiplier);
            let multiplier3 = multiplier2.component_mul(&multiplier);

            let func = squared.dot(&multiplier2) - 1.0;
            if func.abs() <= NEWTON_EPSILON {
                break;
            }
            let denominator = squared
                .component_mul(&multiplier3)
                .dot(&one_over_radii_squared);
            correction = func / (-2.0 * denominator);
        }

        Some(position.component_mul(&multiplier))
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
