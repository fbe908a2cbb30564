//! Keyframe animations
//!
//! An [`AnimationSpec`] lists keyframes at percentage offsets. Compiling it
//! produces a [`MultiTween`]: one outer driver carrying the animation's duration,
//! delay, easing, iterations and direction, with a linear segment tween per
//! property between each pair of frames that mention it.
//!
//! ```text
//!   0%          50%          100%
//!   x: 0 ------ x: 10 ------ x: 0
//!   y: 0 ------------------- y: 8
//! ```
//!
//! When no frame sits at 0%, one is seeded from the properties' current
//! values so the animation starts from wherever the facade is.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use veneer_core::{Props, Value};

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::transition::checked_duration;
use crate::tween::{Direction, Iterations, MultiTween, TimedTween, Timing, Tween};
use crate::values::Interpolation;

/// Position of a keyframe as a percentage of the animation's duration
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyframeOffset(f64);

impl KeyframeOffset {
    pub const FROM: KeyframeOffset = KeyframeOffset(0.0);
    pub const TO: KeyframeOffset = KeyframeOffset(100.0);

    pub fn percent(percent: f64) -> Result<Self> {
        if (0.0..=100.0).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(AnimationError::InvalidKeyframeOffset(format!("{percent}%")))
        }
    }

    pub fn as_percent(&self) -> f64 {
        self.0
    }

    /// Offset as a fraction of the duration
    pub fn fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

impl FromStr for KeyframeOffset {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "from" => Ok(Self::FROM),
            "to" => Ok(Self::TO),
            _ => {
                let number = s
                    .strip_suffix('%')
                    .and_then(|n| n.trim().parse::<f64>().ok())
                    .ok_or_else(|| AnimationError::InvalidKeyframeOffset(s.to_string()))?;
                Self::percent(number)
            }
        }
    }
}

impl TryFrom<String> for KeyframeOffset {
    type Error = AnimationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<KeyframeOffset> for String {
    fn from(offset: KeyframeOffset) -> Self {
        offset.to_string()
    }
}

impl fmt::Display for KeyframeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// One keyframe: an offset and the property values at that point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSpec {
    pub offset: KeyframeOffset,
    pub props: Props,
}

impl KeyframeSpec {
    pub fn new(offset: KeyframeOffset, props: Props) -> Self {
        Self { offset, props }
    }
}

/// A keyframe animation descriptor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSpec {
    pub keyframes: Vec<KeyframeSpec>,
    /// Total duration in ms
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
    pub iterations: Iterations,
    pub direction: Direction,
    /// Per-property interpolator overrides
    pub interpolate: IndexMap<String, Interpolation>,
    pub paused: bool,
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            duration: 750.0,
            delay: 0.0,
            easing: Easing::Linear,
            iterations: Iterations::default(),
            direction: Direction::Forward,
            interpolate: IndexMap::new(),
            paused: false,
        }
    }
}

impl AnimationSpec {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn keyframe(mut self, offset: KeyframeOffset, props: Props) -> Self {
        self.keyframes.push(KeyframeSpec::new(offset, props));
        self
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn iterations(mut self, iterations: Iterations) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn interpolate(mut self, property: impl Into<String>, interpolation: Interpolation) -> Self {
        self.interpolate.insert(property.into(), interpolation);
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Whether two specs describe the same animation, ignoring pause state.
    ///
    /// A spec that only differs in `paused` continues the running animation
    /// instead of restarting it.
    pub fn same_identity(&self, other: &AnimationSpec) -> bool {
        self.keyframes == other.keyframes
            && self.duration == other.duration
            && self.delay == other.delay
            && self.easing == other.easing
            && self.iterations == other.iterations
            && self.direction == other.direction
            && self.interpolate == other.interpolate
    }

    /// Every property named by any keyframe, in first-seen order
    pub fn properties(&self) -> Vec<&str> {
        let mut props: Vec<&str> = Vec::new();
        for frame in &self.keyframes {
            for name in frame.props.keys() {
                if !props.contains(&name.as_str()) {
                    props.push(name);
                }
            }
        }
        props
    }

    /// Check timing without compiling
    pub fn validate(&self) -> Result<()> {
        checked_duration(self.duration)?;
        checked_duration(self.delay)?;
        Ok(())
    }

    /// Compile into a multi tween.
    ///
    /// `current` supplies a property's present value when the animation has no 0%
    /// frame; properties it cannot read simply start at their first frame.
    pub fn compile(&self, current: &dyn Fn(&str) -> Option<Value>) -> Result<MultiTween> {
        let duration = checked_duration(self.duration)?;
        let delay = checked_duration(self.delay)?;

        let seeded: Props;
        let mut frames: Vec<(f64, &Props)> = Vec::with_capacity(self.keyframes.len() + 1);
        for frame in &self.keyframes {
            frames.push((frame.offset.fraction(), &frame.props));
        }
        frames.sort_by(|a, b| a.0.total_cmp(&b.0));

        if frames.first().map_or(true, |(offset, _)| *offset > 0.0) {
            seeded = self
                .properties()
                .into_iter()
                .filter_map(|name| current(name).map(|value| (name.to_string(), value)))
                .collect();
            frames.insert(0, (0.0, &seeded));
        }

        let mut occurrences: IndexMap<&str, usize> = IndexMap::new();
        for (_, props) in &frames {
            for name in props.keys() {
                *occurrences.entry(name.as_str()).or_default() += 1;
            }
        }

        let mut last_seen: IndexMap<&str, (f64, &Value)> = IndexMap::new();
        let mut tweens: Vec<Tween> = Vec::new();
        for (offset, props) in &frames {
            for (name, value) in props.iter() {
                let interpolation = self.interpolate.get(name).copied().unwrap_or_default();
                let segment = match last_seen.get(name.as_str()) {
                    Some((prev_offset, prev_value)) => Some(
                        TimedTween::new(
                            name.clone(),
                            (*prev_value).clone(),
                            value.clone(),
                            (offset - prev_offset) * duration,
                        )
                        .delay(prev_offset * duration),
                    ),
                    // Mentioned exactly once: hold that value from its offset on
                    None if occurrences.get(name.as_str()) == Some(&1) => Some(
                        TimedTween::new(name.clone(), value.clone(), value.clone(), 0.0)
                            .delay(offset * duration),
                    ),
                    None => None,
                };
                if let Some(segment) = segment {
                    tweens.push(segment.interpolation(interpolation).into());
                }
                last_seen.insert(name.as_str(), (*offset, value));
            }
        }

        let timing = Timing {
            duration,
            delay,
            easing: self.easing,
            iterations: self.iterations,
            direction: self.direction,
        };
        tracing::trace!(
            frames = frames.len(),
            tweens = tweens.len(),
            "compiled keyframe animation"
        );
        Ok(MultiTween::new(tweens, timing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, f64)]) -> Props {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn sample_all(tween: &mut Tween, time: f64) -> Props {
        let mut out = Props::new();
        tween.goto_elapsed_time(time, &mut |name, value| {
            out.insert(name.to_string(), value);
        });
        out
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!("from".parse::<KeyframeOffset>().unwrap(), KeyframeOffset::FROM);
        assert_eq!("to".parse::<KeyframeOffset>().unwrap(), KeyframeOffset::TO);
        assert_eq!("40%".parse::<KeyframeOffset>().unwrap().as_percent(), 40.0);
        assert!("140%".parse::<KeyframeOffset>().is_err());
        assert!("halfway".parse::<KeyframeOffset>().is_err());
    }

    #[test]
    fn test_segments_span_prior_occurrence() {
        let spec = AnimationSpec::new(1000.0)
            .keyframe(KeyframeOffset::FROM, props(&[("x", 0.0), ("y", 0.0)]))
            .keyframe(KeyframeOffset::percent(50.0).unwrap(), props(&[("x", 10.0)]))
            .keyframe(KeyframeOffset::TO, props(&[("x", 0.0), ("y", 8.0)]));
        let mut tween: Tween = spec.compile(&|_| None).unwrap().into();

        let quarter = sample_all(&mut tween, 250.0);
        assert_eq!(quarter["x"], Value::from(5.0));
        assert_eq!(quarter["y"], Value::from(2.0));

        let three_quarters = sample_all(&mut tween, 750.0);
        assert_eq!(three_quarters["x"], Value::from(5.0));
        assert_eq!(three_quarters["y"], Value::from(6.0));

        let end = sample_all(&mut tween, 1000.0);
        assert_eq!(end["x"], Value::from(0.0));
        assert_eq!(end["y"], Value::from(8.0));
    }

    #[test]
    fn test_implicit_start_frame_uses_current_values() {
        let spec = AnimationSpec::new(100.0)
            .keyframe(KeyframeOffset::TO, props(&[("opacity", 1.0)]));
        let mut tween: Tween = spec
            .compile(&|name| (name == "opacity").then(|| Value::from(0.5)))
            .unwrap()
            .into();
        assert_eq!(sample_all(&mut tween, 0.0)["opacity"], Value::from(0.5));
        assert_eq!(sample_all(&mut tween, 50.0)["opacity"], Value::from(0.75));
    }

    #[test]
    fn test_unsorted_keyframes_are_ordered() {
        let spec = AnimationSpec::new(100.0)
            .keyframe(KeyframeOffset::TO, props(&[("x", 10.0)]))
            .keyframe(KeyframeOffset::FROM, props(&[("x", 0.0)]));
        let mut tween: Tween = spec.compile(&|_| None).unwrap().into();
        assert_eq!(sample_all(&mut tween, 25.0)["x"], Value::from(2.5));
    }

    #[test]
    fn test_single_occurrence_holds_value() {
        let spec = AnimationSpec::new(100.0)
            .keyframe(KeyframeOffset::FROM, props(&[("x", 0.0), ("z", 2.0)]))
            .keyframe(KeyframeOffset::TO, props(&[("x", 1.0)]));
        let mut tween: Tween = spec.compile(&|_| None).unwrap().into();
        assert_eq!(sample_all(&mut tween, 50.0)["z"], Value::from(2.0));
    }

    #[test]
    fn test_identity_ignores_paused() {
        let base = AnimationSpec::new(300.0).keyframe(KeyframeOffset::TO, props(&[("x", 1.0)]));
        assert!(base.same_identity(&base.clone().paused(true)));
        assert!(!base.same_identity(&base.clone().delay(10.0)));
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let spec = AnimationSpec::new(-1.0).keyframe(KeyframeOffset::TO, props(&[("x", 1.0)]));
        assert!(matches!(
            spec.compile(&|_| None),
            Err(AnimationError::InvalidDuration(_))
        ));
        assert!(spec.validate().is_err());
        assert!(AnimationSpec::new(10.0).delay(f64::NAN).validate().is_err());
        assert!(AnimationSpec::new(10.0).validate().is_ok());
    }

    #[test]
    fn test_deserialize_spec() {
        let spec: AnimationSpec = serde_json::from_str(
            r#"{
                "duration": 500,
                "iterations": "infinite",
                "direction": "alternate",
                "keyframes": [
                    {"offset": "from", "props": {"x": 0}},
                    {"offset": "50%", "props": {"x": 4}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.iterations, Iterations::Infinite);
        assert_eq!(spec.direction, Direction::Alternate);
        assert_eq!(spec.keyframes[1].offset.as_percent(), 50.0);
    }
}
