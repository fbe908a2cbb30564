//! Dynamic property values
//!
//! Descriptors carry arbitrary named properties. Their values are modelled by
//! [`Value`], a small closed set of shapes that covers everything the
//! reconciliation, animation and pointer-state layers need to compare,
//! interpolate and write through to a facade.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Ordered property map, as written by a descriptor.
///
/// Order is significant: properties are applied in insertion order.
pub type Props = IndexMap<String, Value>;

// ============================================================================
// Color
// ============================================================================

/// RGBA color with linear channels in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Pack the RGB channels into `0xRRGGBB`, dropping alpha
    pub fn to_hex(&self) -> u32 {
        let channel = |c: f32| ((c.clamp(0.0, 1.0) * 255.0).round() as u32) & 0xFF;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    pub fn lerp(a: &Color, b: &Color, t: f32) -> Color {
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// A dynamically typed property value
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Color(Color),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the value's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Color(_) => "color",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Like [`Value::as_number`], but reports the mismatch as an error
    pub fn expect_number(&self) -> Result<f64> {
        self.as_number().ok_or(CoreError::TypeMismatch {
            expected: "number",
            found: self.kind(),
        })
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Color> for Value {
    fn from(v: Color) -> Self {
        Value::Color(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Merge helpers
// ============================================================================

/// Copy every entry of `overlay` into `base`, replacing existing entries
pub fn merge_shallow(base: &mut Props, overlay: &Props) {
    for (name, value) in overlay {
        base.insert(name.clone(), value.clone());
    }
}

/// Like [`merge_shallow`], but lists present on both sides are merged
/// element by element instead of replaced wholesale.
///
/// `Null` entries in an overlay list leave the base element untouched.
pub fn merge_deep(base: &mut Props, overlay: &Props) {
    for (name, value) in overlay {
        match (base.get_mut(name), value) {
            (Some(existing), incoming) => merge_value(existing, incoming),
            (None, incoming) => {
                base.insert(name.clone(), incoming.clone());
            }
        }
    }
}

fn merge_value(existing: &mut Value, incoming: &Value) {
    match (existing, incoming) {
        (Value::List(old), Value::List(new)) => {
            for (i, item) in new.iter().enumerate() {
                match old.get_mut(i) {
                    Some(_) if item.is_null() => {}
                    Some(slot) => merge_value(slot, item),
                    None => old.push(item.clone()),
                }
            }
        }
        (slot, incoming) => *slot = incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, Value)]) -> Props {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_hex_round_trip() {
        let c = Color::from_hex(0x3366cc);
        assert_eq!(c.to_hex(), 0x3366cc);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_color_lerp_midpoint() {
        let c = Color::lerp(&Color::BLACK, &Color::WHITE, 0.5);
        assert!((c.r - 0.5).abs() < 1e-6);
        assert!((c.g - 0.5).abs() < 1e-6);
        assert!((c.b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_expect_number_reports_kind() {
        let err = Value::from("hi").expect_number().unwrap_err();
        assert_eq!(
            err,
            CoreError::TypeMismatch {
                expected: "number",
                found: "text"
            }
        );
    }

    #[test]
    fn test_merge_shallow_replaces_lists() {
        let mut base = props(&[("pos", Value::from(vec![1.0, 2.0, 3.0]))]);
        merge_shallow(&mut base, &props(&[("pos", Value::from(vec![9.0]))]));
        assert_eq!(base["pos"], Value::from(vec![9.0]));
    }

    #[test]
    fn test_merge_deep_merges_lists_by_index() {
        let mut base = props(&[
            ("pos", Value::from(vec![1.0, 2.0, 3.0])),
            ("opacity", Value::from(1.0)),
        ]);
        let overlay = props(&[
            ("pos", Value::List(vec![Value::Null, Value::from(5.0)])),
            ("scale", Value::from(2.0)),
        ]);
        merge_deep(&mut base, &overlay);
        assert_eq!(base["pos"], Value::from(vec![1.0, 5.0, 3.0]));
        assert_eq!(base["scale"], Value::from(2.0));
        assert_eq!(base["opacity"], Value::from(1.0));
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let mut base = props(&[("a", Value::from(1.0))]);
        merge_shallow(&mut base, &props(&[("b", Value::from(2.0))]));
        let keys: Vec<_> = base.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
