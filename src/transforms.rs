// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Reference-frame transforms.
//!
//! Pure functions building the matrices that relate local topocentric frames,
//! the inertial TEME frame and the planet-fixed frame:
//!
//! - [`east_north_up_to_fixed_frame`] / [`north_east_down_to_fixed_frame`]
//! - [`compute_teme_to_pseudo_fixed_matrix`]
//! - [`point_to_window_coordinates`]
//!
//! Every matrix is returned by value.

use std::f64::consts::TAU;

use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
use qtty::Seconds;

use crate::ellipsoid::Ellipsoid;
use crate::error::{Error, Result};
use crate::instant::SECONDS_PER_DAY;
use crate::property::ReferenceFrame;
use crate::JulianDate;

/// Horizontal distance from the axis under which an origin is treated as a pole.
const POLE_EPSILON: f64 = 1e-14;

// GMST polynomial (seconds of sidereal time), IAU 1982.
const GMST_CONSTANT_0: f64 = 6.0 * 3600.0 + 41.0 * 60.0 + 50.548_41;
const GMST_CONSTANT_1: f64 = 8_640_184.812_866;
const GMST_CONSTANT_2: f64 = 0.093_104;
const GMST_CONSTANT_3: f64 = -6.2e-6;

/// Secular drift of the rotation rate, rad/s per day.
const RATE_COEFFICIENT: f64 = 1.177_275_838_466_8e-19;
/// WGS84 precessing rotation rate, rad/s.
const WGS84_PRECESSING_RATE: f64 = 7.292_115_855_3e-5;

/// Source of a high-precision inertial (ICRF) to fixed rotation.
///
/// When a provider has no data for an instant, callers fall back to
/// [`compute_teme_to_pseudo_fixed_matrix`].
pub trait EarthOrientation {
    /// Rotation taking ICRF vectors to the fixed frame at `time`.
    fn icrf_to_fixed(&self, time: JulianDate) -> Option<Matrix3<f64>>;
}

/// `sign(0) = 0`, unlike `f64::signum`.
fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn is_pole(origin: &Vector3<f64>) -> bool {
    origin.x.abs() <= POLE_EPSILON && origin.y.abs() <= POLE_EPSILON
}

fn check_finite_origin(origin: &Vector3<f64>) -> Result<()> {
    if origin.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(Error::invalid_argument("origin must be a finite point"))
    }
}

/// Normal, east tangent and north bitangent at a non-pole origin.
fn local_axes(
    origin: &Vector3<f64>,
    ellipsoid: &Ellipsoid,
) -> Result<(Vector3<f64>, Vector3<f64>, Vector3<f64>)> {
    let normal = ellipsoid
        .geodetic_surface_normal(origin)
        .ok_or_else(|| Error::invalid_argument("origin has no surface normal"))?;
    let tangent = Vector3::new(-origin.y, origin.x, 0.0).normalize();
    let bitangent = normal.cross(&tangent);
    Ok((normal, tangent, bitangent))
}

/// Matrix from a local east-north-up frame at `origin` to the fixed frame.
///
/// The columns of the rotation part are the east, north and up axes, and the
/// translation is `origin`.  At the poles (`x` and `y` both within `1e-14`
/// of zero) a fixed form keyed on the sign of `z` is returned.
///
/// `ellipsoid` defaults to WGS84.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `origin` is not finite.
pub fn east_north_up_to_fixed_frame(
    origin: &Vector3<f64>,
    ellipsoid: Option<&Ellipsoid>,
) -> Result<Matrix4<f64>> {
    check_finite_origin(origin)?;

    if is_pole(origin) {
        let sign = sign(origin.z);
        return Ok(Matrix4::new(
            0.0, -sign, 0.0, origin.x, //
            1.0, 0.0, 0.0, origin.y, //
            0.0, 0.0, sign, origin.z, //
            0.0, 0.0, 0.0, 1.0,
        ));
    }

    let ellipsoid = ellipsoid.copied().unwrap_or_default();
    let (normal, tangent, bitangent) = local_axes(origin, &ellipsoid)?;
    Ok(Matrix4::new(
        tangent.x, bitangent.x, normal.x, origin.x, //
        tangent.y, bitangent.y, normal.y, origin.y, //
        tangent.z, bitangent.z, normal.z, origin.z, //
        0.0, 0.0, 0.0, 1.0,
    ))
}

/// Matrix from a local north-east-down frame at `origin` to the fixed frame.
///
/// Same construction as [`east_north_up_to_fixed_frame`] with the columns
/// reordered to north, east and the negated normal.
pub fn north_east_down_to_fixed_frame(
    origin: &Vector3<f64>,
    ellipsoid: Option<&Ellipsoid>,
) -> Result<Matrix4<f64>> {
    check_finite_origin(origin)?;

    if is_pole(origin) {
        let sign = sign(origin.z);
        return Ok(Matrix4::new(
            -sign, 0.0, 0.0, origin.x, //
            0.0, 1.0, 0.0, origin.y, //
            0.0, 0.0, -sign, origin.z, //
            0.0, 0.0, 0.0, 1.0,
        ));
    }

    let ellipsoid = ellipsoid.copied().unwrap_or_default();
    let (normal, tangent, bitangent) = local_axes(origin, &ellipsoid)?;
    Ok(Matrix4::new(
        bitangent.x, tangent.x, -normal.x, origin.x, //
        bitangent.y, tangent.y, -normal.y, origin.y, //
        bitangent.z, tangent.z, -normal.z, origin.z, //
        0.0, 0.0, 0.0, 1.0,
    ))
}

/// Rotation from True Equator Mean Equinox (TEME) to the pseudo-fixed frame.
///
/// GMST is defined on UT1; UTC stands in for it here.  The leap-second
/// offset is removed once, at the count in effect at `time`, so an instant
/// inside an inserted leap second does not fail.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `time` is not finite.
pub fn compute_teme_to_pseudo_fixed_matrix(time: JulianDate) -> Result<Matrix3<f64>> {
    if !time.is_finite() {
        return Err(Error::invalid_argument("time must be finite"));
    }

    let date_in_utc = time.add_seconds(Seconds::new(-time.tai_minus_utc().value()));
    let utc_day_number = date_in_utc.day_number();
    let utc_seconds_into_day = date_in_utc.seconds_of_day().value();

    // Centuries since J2000 to the preceding UT midnight.
    let diff_days = (utc_day_number - JulianDate::J2000_DAY_NUMBER) as f64;
    let half_day = if utc_seconds_into_day >= SECONDS_PER_DAY * 0.5 {
        0.5
    } else {
        -0.5
    };
    let t = (diff_days + half_day) / JulianDate::JULIAN_CENTURY.value();

    let gmst0 = GMST_CONSTANT_0
        + t * (GMST_CONSTANT_1 + t * (GMST_CONSTANT_2 + t * GMST_CONSTANT_3));
    let angle = (gmst0 * (TAU / SECONDS_PER_DAY)) % TAU;
    let ratio = WGS84_PRECESSING_RATE
        + RATE_COEFFICIENT * (utc_day_number as f64 - (JulianDate::J2000_DAY_NUMBER as f64 + 0.5));
    let seconds_since_midnight =
        (utc_seconds_into_day + SECONDS_PER_DAY * 0.5) % SECONDS_PER_DAY;
    let gha = angle + ratio * seconds_since_midnight;

    let (sin_gha, cos_gha) = gha.sin_cos();
    Ok(Matrix3::new(
        cos_gha, sin_gha, 0.0, //
        -sin_gha, cos_gha, 0.0, //
        0.0, 0.0, 1.0,
    ))
}

/// Inertial-to-fixed rotation at `time`: the provider's ICRF rotation when it
/// has one, else the TEME approximation.
pub fn inertial_to_fixed_matrix(
    time: JulianDate,
    orientation: Option<&dyn EarthOrientation>,
) -> Result<Matrix3<f64>> {
    match orientation.and_then(|provider| provider.icrf_to_fixed(time)) {
        Some(rotation) => Ok(rotation),
        None => compute_teme_to_pseudo_fixed_matrix(time),
    }
}

/// Re-expresses a position given in frame `from` in frame `to`.
pub fn convert_to_reference_frame(
    time: JulianDate,
    value: Vector3<f64>,
    from: ReferenceFrame,
    to: ReferenceFrame,
    orientation: Option<&dyn EarthOrientation>,
) -> Result<Vector3<f64>> {
    if from == to {
        return Ok(value);
    }
    let to_fixed = inertial_to_fixed_matrix(time, orientation)?;
    Ok(match from {
        ReferenceFrame::Inertial => to_fixed * value,
        ReferenceFrame::Fixed => to_fixed.transpose() * value,
    })
}

/// Projects a fixed-frame point to window coordinates.
///
/// The point is transformed by `model_view_projection`, divided by `w`, then
/// mapped by `viewport_transformation`; the `x` and `y` of the result are
/// returned.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if any input is not finite, or if the point
/// projects to `w = 0`.
pub fn point_to_window_coordinates(
    model_view_projection: &Matrix4<f64>,
    viewport_transformation: &Matrix4<f64>,
    point: &Vector3<f64>,
) -> Result<Vector2<f64>> {
    if !model_view_projection.iter().all(|c| c.is_finite()) {
        return Err(Error::invalid_argument("model-view-projection must be finite"));
    }
    if !viewport_transformation.iter().all(|c| c.is_finite()) {
        return Err(Error::invalid_argument("viewport transformation must be finite"));
    }
    if !point.iter().all(|c| c.is_finite()) {
        return Err(Error::invalid_argument("point must be finite"));
    }

    let clip = model_view_projection * Vector4::new(point.x, point.y, point.z, 1.0);
    if clip.w == 0.0 {
        return Err(Error::invalid_argument("point projects to infinity"));
    }
    let window = viewport_transformation * (clip / clip.w);
    Ok(Vector2::new(window.x, window.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::julian_date_ext::iso;
    use approx::assert_relative_eq;

    fn assert_orthonormal(rotation: &Matrix3<f64>) {
        assert_relative_eq!(rotation * rotation.transpose(), Matrix3::identity(), epsilon = 1e-14);
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn enu_is_orthonormal_with_origin_translation() {
        let origins = [
            Vector3::new(1_253_264.69, -4_732_469.09, 4_075_210.47),
            Vector3::new(-6_378_137.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        ];
        for origin in origins {
            let m = east_north_up_to_fixed_frame(&origin, None).unwrap();
            let rotation: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
            assert_orthonormal(&rotation);
            assert_eq!(m.fixed_view::<3, 1>(0, 3).into_owned(), origin);
            assert_eq!(m[(3, 0)], 0.0);
            assert_eq!(m[(3, 1)], 0.0);
            assert_eq!(m[(3, 2)], 0.0);
            assert_eq!(m[(3, 3)], 1.0);
        }
    }

    #[test]
    fn enu_on_equator_points_up_along_x() {
        let origin = Vector3::new(6_378_137.0, 0.0, 0.0);
        let m = east_north_up_to_fixed_frame(&origin, None).unwrap();
        assert_relative_eq!(m.fixed_view::<3, 1>(0, 0).into_owned(), Vector3::y(), epsilon = 1e-15);
        assert_relative_eq!(m.fixed_view::<3, 1>(0, 1).into_owned(), Vector3::z(), epsilon = 1e-15);
        assert_relative_eq!(m.fixed_view::<3, 1>(0, 2).into_owned(), Vector3::x(), epsilon = 1e-15);
    }

    #[test]
    fn enu_at_the_poles_uses_the_fixed_form() {
        let north = east_north_up_to_fixed_frame(&Vector3::new(0.0, 0.0, 6_356_752.0), None).unwrap();
        let expected = Matrix4::new(
            0.0, -1.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 6_356_752.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        assert_eq!(north, expected);

        let south = east_north_up_to_fixed_frame(&Vector3::new(0.0, 0.0, -1.0), None).unwrap();
        assert_eq!(south[(0, 1)], 1.0);
        assert_eq!(south[(2, 2)], -1.0);
        assert!(south.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn ned_is_a_permutation_of_enu() {
        let origin = Vector3::new(1_253_264.69, -4_732_469.09, 4_075_210.47);
        let enu = east_north_up_to_fixed_frame(&origin, None).unwrap();
        let ned = north_east_down_to_fixed_frame(&origin, None).unwrap();
        let column = |m: &Matrix4<f64>, j: usize| -> Vector3<f64> { m.fixed_view::<3, 1>(0, j).into_owned() };
        assert_eq!(column(&ned, 0), column(&enu, 1));
        assert_eq!(column(&ned, 1), column(&enu, 0));
        assert_eq!(column(&ned, 2), -column(&enu, 2));
        assert_eq!(column(&ned, 3), column(&enu, 3));
    }

    #[test]
    fn ned_at_the_poles_uses_the_fixed_form() {
        let m = north_east_down_to_fixed_frame(&Vector3::new(0.0, 0.0, 10.0), None).unwrap();
        let expected = Matrix4::new(
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, -1.0, 10.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        assert_eq!(m, expected);
    }

    #[test]
    fn non_finite_origin_is_rejected() {
        let origin = Vector3::new(f64::NAN, 0.0, 0.0);
        assert!(matches!(
            east_north_up_to_fixed_frame(&origin, None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            north_east_down_to_fixed_frame(&origin, Some(&Ellipsoid::unit_sphere())),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn teme_matrix_is_a_proper_rotation() {
        for time in [
            iso("2000-01-01T12:00:00Z"),
            iso("2012-06-30T23:59:59Z"),
            iso("2019-03-21T03:14:15.9Z"),
            iso("1985-11-05T18:00:00Z"),
        ] {
            let rotation = compute_teme_to_pseudo_fixed_matrix(time).unwrap();
            assert_orthonormal(&rotation);
            assert_eq!(rotation[(2, 2)], 1.0);
        }
    }

    #[test]
    fn teme_angle_matches_gmst_at_j2000() {
        // GMST at 2000-01-01T12:00 UT is about 280.46 degrees.
        let time = iso("2000-01-01T12:00:00Z");
        let rotation = compute_teme_to_pseudo_fixed_matrix(time).unwrap();
        let angle = rotation[(0, 1)].atan2(rotation[(0, 0)]).to_degrees().rem_euclid(360.0);
        assert_relative_eq!(angle, 280.46, epsilon = 0.01);
    }

    #[test]
    fn teme_rotates_once_per_sidereal_day() {
        let time = iso("2010-01-01T00:00:00Z");
        let later = time.add_seconds(Seconds::new(86_164.0905));
        let a = compute_teme_to_pseudo_fixed_matrix(time).unwrap();
        let b = compute_teme_to_pseudo_fixed_matrix(later).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-4);
    }

    #[test]
    fn teme_rejects_non_finite_time() {
        let time = JulianDate::J2000.add_seconds(Seconds::new(f64::NAN));
        assert!(compute_teme_to_pseudo_fixed_matrix(time).is_err());
    }

    struct FixedOrientation(Matrix3<f64>);

    impl EarthOrientation for FixedOrientation {
        fn icrf_to_fixed(&self, _time: JulianDate) -> Option<Matrix3<f64>> {
            Some(self.0)
        }
    }

    #[test]
    fn conversion_uses_provider_and_inverts_with_transpose() {
        let quarter_turn = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let provider = FixedOrientation(quarter_turn);
        let time = JulianDate::J2000;
        let p = Vector3::new(1.0, 0.0, 0.0);

        let fixed = convert_to_reference_frame(
            time,
            p,
            ReferenceFrame::Inertial,
            ReferenceFrame::Fixed,
            Some(&provider),
        )
        .unwrap();
        assert_relative_eq!(fixed, Vector3::new(0.0, 1.0, 0.0));

        let back = convert_to_reference_frame(
            time,
            fixed,
            ReferenceFrame::Fixed,
            ReferenceFrame::Inertial,
            Some(&provider),
        )
        .unwrap();
        assert_relative_eq!(back, p);

        let same = convert_to_reference_frame(time, p, ReferenceFrame::Fixed, ReferenceFrame::Fixed, None)
            .unwrap();
        assert_eq!(same, p);
    }

    #[test]
    fn conversion_falls_back_to_teme() {
        let time = iso("2015-01-01T00:00:00Z");
        let p = Vector3::new(7_000_000.0, 0.0, 0.0);
        let fixed =
            convert_to_reference_frame(time, p, ReferenceFrame::Inertial, ReferenceFrame::Fixed, None)
                .unwrap();
        let expected = compute_teme_to_pseudo_fixed_matrix(time).unwrap() * p;
        assert_relative_eq!(fixed, expected);
    }

    #[test]
    fn window_coordinates_apply_divide_and_viewport() {
        let mvp = Matrix4::new_scaling(2.0);
        // Homogeneous w becomes 2, so the point is halved back after the divide.
        let viewport = Matrix4::new_translation(&Vector3::new(10.0, 20.0, 0.0));
        let window = point_to_window_coordinates(&mvp, &viewport, &Vector3::new(1.0, 2.0, 3.0)).unwrap();
        assert_relative_eq!(window, Vector2::new(11.0, 22.0));
    }

    #[test]
    fn window_coordinates_reject_bad_input() {
        let identity = Matrix4::identity();
        let bad_point = Vector3::new(f64::INFINITY, 0.0, 0.0);
        assert!(point_to_window_coordinates(&identity, &identity, &bad_point).is_err());

        let bad_matrix = Matrix4::from_element(f64::NAN);
        assert!(point_to_window_coordinates(&bad_matrix, &identity, &Vector3::zeros()).is_err());
        assert!(point_to_window_coordinates(&identity, &bad_matrix, &Vector3::zeros()).is_err());

        let collapse = Matrix4::zeros();
        assert!(point_to_window_coordinates(&collapse, &identity, &Vector3::zeros()).is_err());
    }
}
