//! Spring transitions
//!
//! A [`Spring`] integrates a damped harmonic oscillator with RK4. Transitions
//! drive it on normalized progress (0 toward 1), so the same spring can move
//! numbers, colors or lists, and its velocity survives a retarget.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;

/// Physical parameters of a spring
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    #[serde(alias = "stiffness")]
    pub tension: f64,
    #[serde(alias = "damping")]
    pub friction: f64,
    #[serde(default = "unit_mass")]
    pub mass: f64,
}

fn unit_mass() -> f64 {
    1.0
}

impl SpringConfig {
    pub fn new(tension: f64, friction: f64, mass: f64) -> Self {
        Self {
            tension,
            friction,
            mass,
        }
    }

    /// Slight overshoot, settles quickly
    pub fn standard() -> Self {
        Self::new(170.0, 26.0, 1.0)
    }

    pub fn gentle() -> Self {
        Self::new(120.0, 14.0, 1.0)
    }

    /// Visible bounce
    pub fn wobbly() -> Self {
        Self::new(180.0, 12.0, 1.0)
    }

    pub fn stiff() -> Self {
        Self::new(210.0, 20.0, 1.0)
    }

    pub fn slow() -> Self {
        Self::new(280.0, 60.0, 1.0)
    }

    /// Overdamped; creeps to rest
    pub fn molasses() -> Self {
        Self::new(280.0, 120.0, 1.0)
    }

    /// Friction relative to critical damping. Below 1 the spring overshoots.
    pub fn damping_ratio(&self) -> f64 {
        self.friction / (2.0 * (self.tension * self.mass).sqrt())
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl FromStr for SpringConfig {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::standard()),
            "gentle" => Ok(Self::gentle()),
            "wobbly" => Ok(Self::wobbly()),
            "stiff" => Ok(Self::stiff()),
            "slow" => Ok(Self::slow()),
            "molasses" => Ok(Self::molasses()),
            other => Err(AnimationError::UnknownSpringPreset(other.to_string())),
        }
    }
}

/// Position and velocity of the simulated mass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct State {
    position: f64,
    velocity: f64,
}

impl State {
    fn offset(self, slope: State, dt: f64) -> State {
        State {
            position: self.position + slope.position * dt,
            velocity: self.velocity + slope.velocity * dt,
        }
    }
}

// Progress is unitless, so rest is judged on a 0..1 scale
const REST_POSITION: f64 = 1e-3;
const REST_VELOCITY: f64 = 1e-3;

/// Spring moving progress from 0 to 1
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    state: State,
}

impl Spring {
    pub fn progress(config: SpringConfig) -> Self {
        Self {
            config,
            state: State::default(),
        }
    }

    /// Start moving at `velocity`, in progress per second
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.state.velocity = velocity;
        self
    }

    pub fn config(&self) -> SpringConfig {
        self.config
    }

    pub fn value(&self) -> f64 {
        self.state.position
    }

    /// Progress per second
    pub fn velocity(&self) -> f64 {
        self.state.velocity
    }

    pub fn is_settled(&self) -> bool {
        (1.0 - self.state.position).abs() < REST_POSITION
            && self.state.velocity.abs() < REST_VELOCITY
    }

    /// Advance by `dt_ms`, integrating in slices no longer than `max_step_ms`.
    /// Once at rest the spring snaps exactly onto 1.
    pub fn advance(&mut self, dt_ms: f64, max_step_ms: f64) {
        let max_step_ms = max_step_ms.max(1.0);
        let mut remaining = dt_ms;
        while remaining > 0.0 && !self.is_settled() {
            let slice = remaining.min(max_step_ms);
            self.integrate(slice / 1000.0);
            remaining -= slice;
        }
        if self.is_settled() {
            self.state = State {
                position: 1.0,
                velocity: 0.0,
            };
        }
    }

    fn integrate(&mut self, dt: f64) {
        let s = self.state;
        let a = self.slope(s);
        let b = self.slope(s.offset(a, dt * 0.5));
        let c = self.slope(s.offset(b, dt * 0.5));
        let d = self.slope(s.offset(c, dt));
        self.state = State {
            position: s.position
                + (a.position + 2.0 * (b.position + c.position) + d.position) * dt / 6.0,
            velocity: s.velocity
                + (a.velocity + 2.0 * (b.velocity + c.velocity) + d.velocity) * dt / 6.0,
        };
    }

    /// Time derivative of `state`
    fn slope(&self, state: State) -> State {
        let SpringConfig {
            tension,
            friction,
            mass,
        } = self.config;
        let force = tension * (1.0 - state.position) - friction * state.velocity;
        State {
            position: state.velocity,
            velocity: force / mass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_spring_lands_on_one() {
        let mut spring = Spring::progress(SpringConfig::stiff());
        spring.advance(16.0, 16.0);
        assert!(spring.value() > 0.0 && spring.value() < 1.0);

        spring.advance(3_000.0, 16.0);
        assert!(spring.is_settled());
        assert_eq!(spring.value(), 1.0);
        assert_eq!(spring.velocity(), 0.0);
    }

    #[test]
    fn test_underdamped_presets_overshoot() {
        let mut spring = Spring::progress(SpringConfig::wobbly());
        let mut peak: f64 = 0.0;
        for _ in 0..60 {
            spring.advance(16.0, 16.0);
            peak = peak.max(spring.value());
        }
        assert!(peak > 1.0);
    }

    #[test]
    fn test_damping_ratio_of_presets() {
        assert!(SpringConfig::wobbly().damping_ratio() < 1.0);
        assert!(SpringConfig::gentle().damping_ratio() < 1.0);
        assert!(SpringConfig::molasses().damping_ratio() > 1.0);
    }

    #[test]
    fn test_initial_velocity_moves_first_frame_further() {
        let mut resting = Spring::progress(SpringConfig::standard());
        let mut moving = Spring::progress(SpringConfig::standard()).with_velocity(4.0);
        resting.advance(16.0, 16.0);
        moving.advance(16.0, 16.0);
        assert!(moving.value() > resting.value());
    }

    #[test]
    fn test_coarse_frames_are_subdivided() {
        let mut fine = Spring::progress(SpringConfig::stiff());
        let mut coarse = Spring::progress(SpringConfig::stiff());
        for _ in 0..10 {
            fine.advance(10.0, 10.0);
        }
        coarse.advance(100.0, 10.0);
        assert!((fine.value() - coarse.value()).abs() < 1e-9);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!("wobbly".parse::<SpringConfig>().unwrap(), SpringConfig::wobbly());
        assert_eq!("default".parse::<SpringConfig>().unwrap(), SpringConfig::default());
        assert!("boing".parse::<SpringConfig>().is_err());
    }
}
