// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Path materials.
//!
//! Entities describe their look with a [`MaterialProperty`].  Paths are
//! drawn with a [`RevealMaterial`], whose alpha grows along the polyline as
//! the clock advances through the entity's availability.

use nalgebra::Vector3;

use crate::property::{Interpolate, Property};
use crate::JulianDate;

/// Linear RGBA colour, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Colour from 8-bit channels.
    pub fn from_bytes(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(
            f32::from(red) / 255.0,
            f32::from(green) / 255.0,
            f32::from(blue) / 255.0,
            f32::from(alpha) / 255.0,
        )
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl Interpolate for Color {
    fn interpolate(&self, other: &Self, fraction: f64) -> Self {
        let lerp = |a: f32, b: f32| a + (b - a) * fraction as f32;
        Color::new(
            lerp(self.red, other.red),
            lerp(self.green, other.green),
            lerp(self.blue, other.blue),
            lerp(self.alpha, other.alpha),
        )
    }
}

/// Surface appearance declared on path graphics.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialProperty {
    Color(Property<Color>),
    Stripe {
        even_color: Property<Color>,
        odd_color: Property<Color>,
    },
}

impl MaterialProperty {
    /// Colour a reveal material takes from this material at `time`: the
    /// even colour of a stripe, else the plain colour.
    pub fn reveal_color(&self, time: JulianDate) -> Option<Color> {
        match self {
            MaterialProperty::Color(color) => color.value(time),
            MaterialProperty::Stripe { even_color, .. } => even_color.value(time),
        }
    }
}

impl From<Color> for MaterialProperty {
    fn from(color: Color) -> Self {
        MaterialProperty::Color(Property::Constant(color))
    }
}

/// GLSL `smoothstep`.  Coincident edges degrade to a step at the edge.
fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Animated material of a drawn path.
///
/// `update_time.x` is the elapsed fraction of the availability and
/// `update_time.y` the fraction spanned by one resolution step.
#[derive(Debug, Clone, PartialEq)]
pub struct RevealMaterial {
    pub color: Color,
    pub update_time: Vector3<f64>,
}

impl RevealMaterial {
    /// Diffuse component of the material's shader.
    pub const DIFFUSE: &'static str = "color.rgb";

    /// Alpha component of the material's shader.
    pub const ALPHA: &'static str = "color.a * smoothstep(updateTime.x, updateTime.x - updateTime.y, materialInput.st.s) * \
         smoothstep(0.0, updateTime.x - updateTime.y, materialInput.st.s)";

    pub fn new(color: Color) -> Self {
        Self {
            color,
            update_time: Vector3::zeros(),
        }
    }

    /// Alpha the shader yields at path parameter `s` in `[0, 1]`.
    pub fn alpha_at(&self, s: f64) -> f64 {
        let x = self.update_time.x;
        let y = self.update_time.y;
        f64::from(self.color.alpha) * smoothstep(x, x - y, s) * smoothstep(0.0, x - y, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::SampledProperty;
    use approx::assert_relative_eq;
    use qtty::Seconds;

    #[test]
    fn color_interpolates_per_channel() {
        let mid = Color::BLACK.interpolate(&Color::WHITE, 0.5);
        assert_eq!(mid, Color::new(0.5, 0.5, 0.5, 1.0));
        assert_eq!(Color::from_bytes(255, 0, 0, 255), Color::RED);
    }

    #[test]
    fn reveal_color_prefers_even_stripe() {
        let time = JulianDate::J2000;
        let stripe = MaterialProperty::Stripe {
            even_color: Property::Constant(Color::RED),
            odd_color: Property::Constant(Color::BLACK),
        };
        assert_eq!(stripe.reveal_color(time), Some(Color::RED));
        assert_eq!(MaterialProperty::from(Color::YELLOW).reveal_color(time), Some(Color::YELLOW));
    }

    #[test]
    fn reveal_color_follows_sampled_colors() {
        let start = JulianDate::J2000;
        let mut samples = SampledProperty::new();
        samples.add_samples([
            (start, Color::BLACK),
            (start.add_seconds(Seconds::new(10.0)), Color::WHITE),
        ]);
        let material = MaterialProperty::Color(Property::Sampled(samples));
        let color = material
            .reveal_color(start.add_seconds(Seconds::new(5.0)))
            .unwrap();
        assert_relative_eq!(color.red, 0.5);
        assert_eq!(material.reveal_color(start.add_seconds(Seconds::new(11.0))), None);
    }

    #[test]
    fn alpha_fades_in_behind_the_reveal_front() {
        let mut material = RevealMaterial::new(Color::WHITE.with_alpha(0.8));
        material.update_time = Vector3::new(0.5, 0.1, 0.0);

        assert_eq!(material.alpha_at(0.0), 0.0);
        assert_relative_eq!(material.alpha_at(0.45), 0.4, epsilon = 1e-7);
        assert_eq!(material.alpha_at(0.6), 0.0);
        // Fully opaque once behind both ramps.
        material.update_time = Vector3::new(1.0, 0.1, 0.0);
        assert_relative_eq!(material.alpha_at(0.9), 0.8, epsilon = 1e-7);
    }

    #[test]
    fn smoothstep_matches_glsl() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert_eq!(smoothstep(0.3, 0.3, 0.2), 0.0);
    }
}
