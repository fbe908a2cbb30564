//! Per-property transition configuration
//!
//! A transition says how a property moves to a newly written value: over a
//! fixed duration with easing, or by spring. Unset fields fall back to
//! [`TransitionDefaults`].

use serde::{Deserialize, Serialize};
use veneer_core::Value;

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::spring::SpringConfig;
use crate::tween::{SpringTween, TimedTween, Tween};
use crate::values::Interpolation;

/// Fallbacks for transition fields left unset
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionDefaults {
    pub duration: f64,
    pub easing: Easing,
    pub spring_step_ms: f64,
}

impl Default for TransitionDefaults {
    fn default() -> Self {
        Self {
            duration: 750.0,
            easing: Easing::EaseOutCubic,
            spring_step_ms: 16.0,
        }
    }
}

/// How one property transitions between written values
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionSpec {
    /// Duration in ms; ignored for springs
    pub duration: Option<f64>,
    /// Delay in ms before the tween starts moving
    pub delay: Option<f64>,
    pub easing: Option<Easing>,
    pub interpolate: Option<Interpolation>,
    /// When set, the property is driven by a spring instead of a timed tween
    pub spring: Option<SpringConfig>,
}

impl TransitionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timed transition of the given duration
    pub fn timed(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Spring-driven transition
    pub fn spring(config: SpringConfig) -> Self {
        Self {
            spring: Some(config),
            ..Self::default()
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn interpolate(mut self, interpolation: Interpolation) -> Self {
        self.interpolate = Some(interpolation);
        self
    }

    pub fn is_spring(&self) -> bool {
        self.spring.is_some()
    }

    /// Build the tween that moves `property` from `from` to `to`.
    ///
    /// `velocity` is the property's current velocity (units per second) when
    /// a spring is being retargeted mid-flight.
    pub fn build_tween(
        &self,
        property: &str,
        from: Value,
        to: Value,
        defaults: &TransitionDefaults,
        velocity: Option<f64>,
    ) -> Result<Tween> {
        let delay = checked_duration(self.delay.unwrap_or(0.0))?;
        let interpolation = self.interpolate.unwrap_or_default();

        if let Some(config) = self.spring {
            let mut tween = SpringTween::new(property, from, to, config)
                .delay(delay)
                .interpolation(interpolation)
                .step_ms(defaults.spring_step_ms);
            if let Some(velocity) = velocity {
                tween = tween.initial_velocity(velocity);
            }
            return Ok(tween.into());
        }

        let duration = checked_duration(self.duration.unwrap_or(defaults.duration))?;
        Ok(TimedTween::new(property, from, to, duration)
            .delay(delay)
            .easing(self.easing.unwrap_or(defaults.easing))
            .interpolation(interpolation)
            .into())
    }
}

pub(crate) fn checked_duration(ms: f64) -> Result<f64> {
    if ms.is_finite() && ms >= 0.0 {
        Ok(ms)
    } else {
        Err(AnimationError::InvalidDuration(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_unset_fields() {
        let defaults = TransitionDefaults::default();
        let tween = TransitionSpec::new()
            .build_tween("x", Value::from(0.0), Value::from(1.0), &defaults, None)
            .unwrap();
        match tween {
            Tween::Timed(t) => {
                assert_eq!(t.timing.duration, 750.0);
                assert_eq!(t.timing.easing, Easing::EaseOutCubic);
            }
            other => panic!("expected timed tween, got {other:?}"),
        }
    }

    #[test]
    fn test_spring_transition_builds_spring_tween() {
        let tween = TransitionSpec::spring(SpringConfig::gentle())
            .build_tween(
                "x",
                Value::from(0.0),
                Value::from(10.0),
                &TransitionDefaults::default(),
                Some(40.0),
            )
            .unwrap();
        assert!(matches!(tween, Tween::Spring(_)));
        assert!((tween.value_velocity().unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = TransitionSpec::timed(-5.0)
            .build_tween(
                "x",
                Value::from(0.0),
                Value::from(1.0),
                &TransitionDefaults::default(),
                None,
            )
            .unwrap_err();
        assert_eq!(err, AnimationError::InvalidDuration(-5.0));
    }

    #[test]
    fn test_deserialize_from_toml_like_json() {
        let spec: TransitionSpec =
            serde_json::from_str(r#"{"duration": 300, "easing": "easeInQuad"}"#).unwrap();
        assert_eq!(spec.duration, Some(300.0));
        assert_eq!(spec.easing, Some(Easing::EaseInQuad));

        let spring: TransitionSpec =
            serde_json::from_str(r#"{"spring": {"tension": 200, "friction": 20}}"#).unwrap();
        assert_eq!(spring.spring, Some(SpringConfig::new(200.0, 20.0, 1.0)));
    }
}
