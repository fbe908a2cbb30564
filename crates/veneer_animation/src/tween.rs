//! Tweens
//!
//! A tween drives one or more named properties as a pure function of elapsed
//! time. Three kinds exist:
//!
//! - [`TimedTween`]: duration-based interpolation between two values, with
//!   delay, easing, iteration count and play direction
//! - [`SpringTween`]: a spring simulation toward a target; finishes when the
//!   spring settles rather than after a fixed duration
//! - [`MultiTween`]: an outer driver whose own eased progress is mapped onto
//!   local time for a set of child tweens (used by keyframe animations)
//!
//! Tweens do not hold onto the object they animate. Each call to
//! `goto_elapsed_time` reports `(property, value)` pairs to a sink, and the
//! owner decides where the values go.

use serde::{Deserialize, Serialize};
use veneer_core::Value;

use crate::easing::Easing;
use crate::spring::{Spring, SpringConfig};
use crate::values::Interpolation;

/// Receiver for the `(property, value)` pairs produced by a tween
pub type TweenSink<'a> = dyn FnMut(&str, Value) + 'a;

/// Playback direction per iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
    /// Odd iterations play backward
    Alternate,
    /// Even iterations play backward
    AlternateReverse,
}

/// Number of times a tween repeats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Iterations {
    Count(u32),
    Infinite,
}

impl Default for Iterations {
    fn default() -> Self {
        Iterations::Count(1)
    }
}

impl Iterations {
    pub fn is_finite(&self) -> bool {
        matches!(self, Iterations::Count(_))
    }
}

// ============================================================================
// Timing
// ============================================================================

/// Shared timing parameters for timed and multi tweens. Times are in ms.
#[derive(Clone, Debug, PartialEq)]
pub struct Timing {
    pub duration: f64,
    pub delay: f64,
    pub easing: Easing,
    pub iterations: Iterations,
    pub direction: Direction,
}

impl Timing {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            delay: 0.0,
            easing: Easing::Linear,
            iterations: Iterations::default(),
            direction: Direction::Forward,
        }
    }

    /// Elapsed time at which the last iteration ends
    pub fn total_elapsed(&self) -> f64 {
        match self.iterations {
            Iterations::Count(n) => self.delay + self.duration * n as f64,
            Iterations::Infinite => f64::INFINITY,
        }
    }

    /// Elapsed time of the final resting point; infinite tweens rest at the
    /// end of their first iteration
    pub fn end_time(&self) -> f64 {
        match self.iterations {
            Iterations::Count(_) => self.total_elapsed(),
            Iterations::Infinite => self.delay + self.duration,
        }
    }

    pub fn is_done_at(&self, time: f64) -> bool {
        self.iterations.is_finite() && time >= self.total_elapsed()
    }

    /// Eased progress at `time`, or `None` while still inside the delay
    pub fn progress_at(&self, time: f64) -> Option<f64> {
        if time < self.delay {
            return None;
        }
        let t = time.min(self.total_elapsed()) - self.delay;

        let (mut raw, iteration) = if self.duration <= 0.0 {
            (1.0, 0u64)
        } else {
            let mut iteration = (t / self.duration).floor();
            let mut raw = (t % self.duration) / self.duration;
            // Landing exactly on an iteration boundary finishes that iteration
            // instead of restarting the next one
            if raw == 0.0 && t > 0.0 {
                raw = 1.0;
                iteration -= 1.0;
            }
            (raw, iteration.max(0.0) as u64)
        };

        let reverse = match self.direction {
            Direction::Forward => false,
            Direction::Reverse => true,
            Direction::Alternate => iteration % 2 == 1,
            Direction::AlternateReverse => iteration % 2 == 0,
        };
        if reverse {
            raw = 1.0 - raw;
        }
        Some(self.easing.apply(raw))
    }
}

// ============================================================================
// TimedTween
// ============================================================================

/// Duration-based interpolation of one property
#[derive(Clone, Debug)]
pub struct TimedTween {
    pub property: String,
    pub from: Value,
    pub to: Value,
    pub timing: Timing,
    pub interpolation: Interpolation,
}

impl TimedTween {
    pub fn new(property: impl Into<String>, from: Value, to: Value, duration: f64) -> Self {
        Self {
            property: property.into(),
            from,
            to,
            timing: Timing::new(duration),
            interpolation: Interpolation::Number,
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.timing.delay = delay.max(0.0);
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.timing.easing = easing;
        self
    }

    pub fn iterations(mut self, iterations: Iterations) -> Self {
        self.timing.iterations = iterations;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.timing.direction = direction;
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Report the value at `time`. Nothing is reported before the delay.
    pub fn goto_elapsed_time(&mut self, time: f64, sink: &mut TweenSink<'_>) {
        if let Some(progress) = self.timing.progress_at(time) {
            sink(
                &self.property,
                self.interpolation.interpolate(&self.from, &self.to, progress),
            );
        }
    }
}

// ============================================================================
// SpringTween
// ============================================================================

const DEFAULT_SPRING_STEP_MS: f64 = 16.0;

/// Spring-driven transition of one property.
///
/// The spring runs on normalized progress from 0 to 1 so any interpolable
/// value can be sprung; numeric endpoints additionally carry their velocity
/// across retargets.
#[derive(Clone, Debug)]
pub struct SpringTween {
    pub property: String,
    pub from: Value,
    pub to: Value,
    pub interpolation: Interpolation,
    pub delay: f64,
    spring: Spring,
    elapsed: f64,
    step_ms: f64,
}

impl SpringTween {
    pub fn new(property: impl Into<String>, from: Value, to: Value, config: SpringConfig) -> Self {
        Self {
            property: property.into(),
            from,
            to,
            interpolation: Interpolation::Number,
            delay: 0.0,
            spring: Spring::progress(config),
            elapsed: 0.0,
            step_ms: DEFAULT_SPRING_STEP_MS,
        }
    }

    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Largest integration step in ms; bigger frame gaps are subdivided
    pub fn step_ms(mut self, step_ms: f64) -> Self {
        self.step_ms = step_ms.max(1.0);
        self
    }

    /// Seed the spring with a starting velocity in property units per second
    pub fn initial_velocity(mut self, velocity: f64) -> Self {
        if let Some(span) = self.numeric_span() {
            self.spring = self.spring.with_velocity(velocity / span);
        }
        self
    }

    fn numeric_span(&self) -> Option<f64> {
        let span = self.to.as_number()? - self.from.as_number()?;
        (span.abs() > f64::EPSILON).then_some(span)
    }

    /// Current velocity in property units per second, for numeric endpoints
    pub fn value_velocity(&self) -> Option<f64> {
        self.numeric_span().map(|span| self.spring.velocity() * span)
    }

    pub fn current_value(&self) -> Value {
        self.interpolation
            .interpolate(&self.from, &self.to, self.spring.value())
    }

    pub fn is_settled(&self) -> bool {
        self.spring.is_settled()
    }

    pub fn goto_elapsed_time(&mut self, time: f64, sink: &mut TweenSink<'_>) {
        if time < self.delay {
            return;
        }
        let local = time - self.delay;
        if local > self.elapsed {
            self.spring.advance(local - self.elapsed, self.step_ms);
            self.elapsed = local;
        }
        sink(&self.property, self.current_value());
    }
}

// ============================================================================
// MultiTween
// ============================================================================

/// Outer driver for a set of child tweens.
///
/// The driver's eased progress is scaled by its duration to produce the local
/// time handed to every child, so children are laid out on a timeline of
/// `duration` ms regardless of the outer delay, easing or repetition.
#[derive(Clone, Debug)]
pub struct MultiTween {
    pub tweens: Vec<Tween>,
    pub timing: Timing,
}

impl MultiTween {
    pub fn new(tweens: Vec<Tween>, timing: Timing) -> Self {
        Self { tweens, timing }
    }

    pub fn goto_elapsed_time(&mut self, time: f64, sink: &mut TweenSink<'_>) {
        if let Some(progress) = self.timing.progress_at(time) {
            let local = progress * self.timing.duration;
            for tween in &mut self.tweens {
                tween.goto_elapsed_time(local, sink);
            }
        }
    }

    /// Every property any child tween drives
    pub fn properties(&self) -> Vec<&str> {
        let mut props = Vec::new();
        for tween in &self.tweens {
            for prop in tween.properties() {
                if !props.contains(&prop) {
                    props.push(prop);
                }
            }
        }
        props
    }
}

// ============================================================================
// Tween
// ============================================================================

/// Any tween the runner can play
#[derive(Clone, Debug)]
pub enum Tween {
    Timed(TimedTween),
    Spring(SpringTween),
    Multi(MultiTween),
}

impl Tween {
    pub fn goto_elapsed_time(&mut self, time: f64, sink: &mut TweenSink<'_>) {
        match self {
            Tween::Timed(t) => t.goto_elapsed_time(time, sink),
            Tween::Spring(t) => t.goto_elapsed_time(time, sink),
            Tween::Multi(t) => t.goto_elapsed_time(time, sink),
        }
    }

    pub fn is_done_at(&self, time: f64) -> bool {
        match self {
            Tween::Timed(t) => t.timing.is_done_at(time),
            Tween::Spring(t) => time >= t.delay && t.is_settled(),
            Tween::Multi(t) => t.timing.is_done_at(time),
        }
    }

    /// Jump to the final resting state and report it
    pub fn snap_to_end(&mut self, sink: &mut TweenSink<'_>) {
        match self {
            Tween::Timed(t) => {
                let end = t.timing.end_time();
                t.goto_elapsed_time(end, sink);
            }
            Tween::Spring(t) => sink(&t.property, t.to.clone()),
            Tween::Multi(t) => {
                let end = t.timing.end_time();
                t.goto_elapsed_time(end, sink);
            }
        }
    }

    /// The value a single-property tween is heading toward
    pub fn target(&self) -> Option<&Value> {
        match self {
            Tween::Timed(t) => Some(&t.to),
            Tween::Spring(t) => Some(&t.to),
            Tween::Multi(_) => None,
        }
    }

    pub fn properties(&self) -> Vec<&str> {
        match self {
            Tween::Timed(t) => vec![t.property.as_str()],
            Tween::Spring(t) => vec![t.property.as_str()],
            Tween::Multi(t) => t.properties(),
        }
    }

    pub fn value_velocity(&self) -> Option<f64> {
        match self {
            Tween::Spring(t) => t.value_velocity(),
            _ => None,
        }
    }
}

impl From<TimedTween> for Tween {
    fn from(t: TimedTween) -> Self {
        Tween::Timed(t)
    }
}

impl From<SpringTween> for Tween {
    fn from(t: SpringTween) -> Self {
        Tween::Spring(t)
    }
}

impl From<MultiTween> for Tween {
    fn from(t: MultiTween) -> Self {
        Tween::Multi(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tween: &mut Tween, time: f64) -> Option<Value> {
        let mut out = None;
        tween.goto_elapsed_time(time, &mut |_, v| out = Some(v));
        out
    }

    fn number(tween: &mut Tween, time: f64) -> f64 {
        sample(tween, time).and_then(|v| v.as_number()).unwrap()
    }

    #[test]
    fn test_timed_tween_interpolates_and_converges() {
        let mut tween: Tween =
            TimedTween::new("x", Value::from(0.0), Value::from(100.0), 300.0).into();
        assert_eq!(number(&mut tween, 0.0), 0.0);
        assert_eq!(number(&mut tween, 150.0), 50.0);
        assert_eq!(number(&mut tween, 300.0), 100.0);
        assert_eq!(number(&mut tween, 10_000.0), 100.0);
        assert!(!tween.is_done_at(299.0));
        assert!(tween.is_done_at(300.0));
    }

    #[test]
    fn test_nothing_reported_before_delay() {
        let mut tween: Tween = TimedTween::new("x", Value::from(0.0), Value::from(1.0), 100.0)
            .delay(50.0)
            .into();
        assert!(sample(&mut tween, 49.0).is_none());
        assert_eq!(number(&mut tween, 100.0), 0.5);
    }

    #[test]
    fn test_alternate_plays_back_on_odd_iterations() {
        let mut tween: Tween = TimedTween::new("x", Value::from(0.0), Value::from(10.0), 100.0)
            .iterations(Iterations::Count(2))
            .direction(Direction::Alternate)
            .into();
        assert_eq!(number(&mut tween, 25.0), 2.5);
        assert_eq!(number(&mut tween, 100.0), 10.0);
        assert_eq!(number(&mut tween, 125.0), 7.5);
        assert_eq!(number(&mut tween, 200.0), 0.0);
        assert!(tween.is_done_at(200.0));
    }

    #[test]
    fn test_infinite_never_done() {
        let tween: Tween = TimedTween::new("x", Value::from(0.0), Value::from(1.0), 100.0)
            .iterations(Iterations::Infinite)
            .into();
        assert!(!tween.is_done_at(1e9));
    }

    #[test]
    fn test_reverse_direction() {
        let mut tween: Tween = TimedTween::new("x", Value::from(0.0), Value::from(10.0), 100.0)
            .direction(Direction::Reverse)
            .into();
        assert_eq!(number(&mut tween, 0.0), 10.0);
        assert_eq!(number(&mut tween, 100.0), 0.0);
    }

    #[test]
    fn test_spring_tween_reaches_target_exactly() {
        let mut tween: Tween =
            SpringTween::new("x", Value::from(0.0), Value::from(200.0), SpringConfig::stiff())
                .into();
        let early = number(&mut tween, 50.0);
        assert!(early > 0.0 && early < 200.0);
        assert!(!tween.is_done_at(50.0));

        let settled = number(&mut tween, 5_000.0);
        assert_eq!(settled, 200.0);
        assert!(tween.is_done_at(5_000.0));
    }

    #[test]
    fn test_spring_velocity_carries_over() {
        let mut first =
            SpringTween::new("x", Value::from(0.0), Value::from(100.0), SpringConfig::standard());
        first.goto_elapsed_time(50.0, &mut |_, _| {});
        let velocity = first.value_velocity().unwrap();
        assert!(velocity > 0.0);

        let second = SpringTween::new(
            "x",
            first.current_value(),
            Value::from(300.0),
            SpringConfig::standard(),
        )
        .initial_velocity(velocity);
        let carried = second.value_velocity().unwrap();
        assert!((carried - velocity).abs() < 1e-6);
    }

    #[test]
    fn test_multi_tween_scales_children() {
        // Child spans the second half of a 1000ms timeline
        let child = TimedTween::new("y", Value::from(0.0), Value::from(10.0), 500.0).delay(500.0);
        let mut multi: Tween = MultiTween::new(vec![child.into()], Timing::new(1000.0)).into();

        assert!(sample(&mut multi, 250.0).is_none());
        assert_eq!(number(&mut multi, 750.0), 5.0);
        assert_eq!(number(&mut multi, 1000.0), 10.0);
        assert!(multi.is_done_at(1000.0));
    }

    #[test]
    fn test_snap_to_end_of_infinite_multi() {
        let child = TimedTween::new("y", Value::from(0.0), Value::from(4.0), 100.0);
        let mut timing = Timing::new(100.0);
        timing.iterations = Iterations::Infinite;
        let mut multi: Tween = MultiTween::new(vec![child.into()], timing).into();

        let mut last = None;
        multi.snap_to_end(&mut |_, v| last = Some(v));
        assert_eq!(last, Some(Value::from(4.0)));
    }
}
