//! Animatable value types
//!
//! Provides the interpolation used by tweens, including linear interpolation
//! for numbers, colors and lists, and a packed-RGB color interpolator for
//! properties that store colors as `0xRRGGBB` numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use veneer_core::{Color, Value};

use crate::error::AnimationError;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f64) -> Self;

    /// Check if two values are approximately equal (for settling detection)
    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool;
}

// ============================================================================
// f64 Implementation
// ============================================================================

impl Interpolate for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (self - other).abs() < epsilon
    }
}

// ============================================================================
// Color Implementation
// ============================================================================

impl Interpolate for Color {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Color::lerp(self, other, t as f32)
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        let epsilon = epsilon as f32;
        (self.r - other.r).abs() < epsilon
            && (self.g - other.g).abs() < epsilon
            && (self.b - other.b).abs() < epsilon
            && (self.a - other.a).abs() < epsilon
    }
}

// ============================================================================
// Value Implementation
// ============================================================================

impl Interpolate for Value {
    /// Numbers and colors lerp, lists lerp element-wise when their lengths
    /// match, and anything else steps to `other` once `t` reaches 1.
    fn lerp(&self, other: &Self, t: f64) -> Self {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a.lerp(b, t)),
            (Value::Color(a), Value::Color(b)) => Value::Color(a.lerp(b, t)),
            (Value::List(a), Value::List(b)) if a.len() == b.len() => {
                Value::List(a.iter().zip(b).map(|(a, b)| a.lerp(b, t)).collect())
            }
            _ if t >= 1.0 => other.clone(),
            _ => self.clone(),
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.approx_eq(b, epsilon),
            (Value::Color(a), Value::Color(b)) => a.approx_eq(b, epsilon),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.approx_eq(b, epsilon))
            }
            (a, b) => a == b,
        }
    }
}

// ============================================================================
// Named interpolators
// ============================================================================

/// How a tween blends its endpoints
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interpolation {
    /// Linear interpolation of numbers, colors and lists
    #[default]
    Number,
    /// Numbers are packed `0xRRGGBB` colors; channels are blended separately
    Color,
    /// Hold the start value until the end, then jump
    Step,
}

impl Interpolation {
    pub fn interpolate(&self, from: &Value, to: &Value, t: f64) -> Value {
        match self {
            Interpolation::Number => from.lerp(to, t),
            Interpolation::Color => match (from, to) {
                (Value::Number(a), Value::Number(b)) => {
                    let a = Color::from_hex(*a as u32);
                    let b = Color::from_hex(*b as u32);
                    Value::Number(a.lerp(&b, t).to_hex() as f64)
                }
                _ => from.lerp(to, t),
            },
            Interpolation::Step => {
                if t >= 1.0 {
                    to.clone()
                } else {
                    from.clone()
                }
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Number => "number",
            Interpolation::Color => "color",
            Interpolation::Step => "step",
        }
    }
}

impl FromStr for Interpolation {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(Interpolation::Number),
            "color" => Ok(Interpolation::Color),
            "step" => Ok(Interpolation::Step),
            other => Err(AnimationError::UnknownInterpolation(other.to_string())),
        }
    }
}

impl TryFrom<String> for Interpolation {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interpolation> for String {
    fn from(interpolation: Interpolation) -> Self {
        interpolation.name().to_string()
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_lerp() {
        let v = Interpolation::Number.interpolate(&Value::from(10.0), &Value::from(20.0), 0.25);
        assert_eq!(v, Value::from(12.5));
    }

    #[test]
    fn test_list_lerp_elementwise() {
        let from = Value::from(vec![0.0, 10.0]);
        let to = Value::from(vec![10.0, 30.0]);
        assert_eq!(from.lerp(&to, 0.5), Value::from(vec![5.0, 20.0]));
    }

    #[test]
    fn test_mismatched_values_step_at_end() {
        let from = Value::from("a");
        let to = Value::from("b");
        assert_eq!(from.lerp(&to, 0.99), from);
        assert_eq!(from.lerp(&to, 1.0), to);
    }

    #[test]
    fn test_packed_color_interpolation_blends_channels() {
        let mid = Interpolation::Color.interpolate(
            &Value::from(0xff0000u32),
            &Value::from(0x0000ffu32),
            0.5,
        );
        let packed = mid.as_number().unwrap() as u32;
        assert_eq!(packed >> 16, 0x80);
        assert_eq!(packed & 0xff, 0x80);
        assert_eq!((packed >> 8) & 0xff, 0);

        // Plain numeric lerp of the same endpoints lands somewhere unrelated
        let naive = Interpolation::Number.interpolate(
            &Value::from(0xff0000u32),
            &Value::from(0x0000ffu32),
            0.5,
        );
        assert_ne!(naive, mid);
    }

    #[test]
    fn test_step_holds_until_end() {
        let from = Value::from(1.0);
        let to = Value::from(2.0);
        assert_eq!(Interpolation::Step.interpolate(&from, &to, 0.5), from);
        assert_eq!(Interpolation::Step.interpolate(&from, &to, 1.0), to);
    }

    #[test]
    fn test_parse_interpolation() {
        assert_eq!("color".parse::<Interpolation>().unwrap(), Interpolation::Color);
        assert!("hsl".parse::<Interpolation>().is_err());
    }
}
