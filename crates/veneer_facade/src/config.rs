//! World configuration
//!
//! Gesture thresholds and animation defaults. Every field has a default, so a
//! TOML document only needs to name what it overrides:
//!
//! ```toml
//! tap_distance_threshold = 12.0
//! default_easing = "easeInOutQuad"
//! ```

use serde::{Deserialize, Serialize};
use veneer_animation::transition::TransitionDefaults;
use veneer_animation::Easing;

use crate::error::Result;

/// Configuration for a [`World`](crate::World)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Max pointer travel in px between press and release for a tap
    pub tap_distance_threshold: f32,
    /// Max ms between press and release for a tap
    pub tap_duration_threshold_ms: f64,
    /// Max ms between the starts of two taps for a double click
    pub double_click_threshold_ms: f64,
    /// Duration of transitions that do not set one
    pub default_transition_duration_ms: f64,
    /// Easing of transitions that do not set one
    pub default_easing: Easing,
    /// Largest spring integration step in ms
    pub spring_step_ms: f64,
    /// Available width handed to the layout engine; unbounded when unset
    pub viewport_width: Option<f32>,
    /// Available height handed to the layout engine; unbounded when unset
    pub viewport_height: Option<f32>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tap_distance_threshold: 10.0,
            tap_duration_threshold_ms: 300.0,
            double_click_threshold_ms: 300.0,
            default_transition_duration_ms: 750.0,
            default_easing: Easing::EaseOutCubic,
            spring_step_ms: 16.0,
            viewport_width: None,
            viewport_height: None,
        }
    }
}

impl WorldConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn transition_defaults(&self) -> TransitionDefaults {
        TransitionDefaults {
            duration: self.default_transition_duration_ms,
            easing: self.default_easing,
            spring_step_ms: self.spring_step_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str(
            r#"
            tap_distance_threshold = 4.0
            default_easing = "easeInOutQuad"
            "#,
        )
        .unwrap();
        assert_eq!(config.tap_distance_threshold, 4.0);
        assert_eq!(config.default_easing, Easing::EaseInOutQuad);
        assert_eq!(config.tap_duration_threshold_ms, 300.0);
        assert_eq!(config.double_click_threshold_ms, 300.0);
    }

    #[test]
    fn test_bad_easing_is_a_config_error() {
        assert!(WorldConfig::from_toml_str(r#"default_easing = "wiggle""#).is_err());
    }

    #[test]
    fn test_transition_defaults_follow_config() {
        let config = WorldConfig {
            default_transition_duration_ms: 200.0,
            ..WorldConfig::default()
        };
        assert_eq!(config.transition_defaults().duration, 200.0);
    }
}
