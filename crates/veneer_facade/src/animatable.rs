//! Animatable capability
//!
//! Sits between property writes and the facade. Each write is checked
//! against the instance's configuration:
//!
//! 1. a property held by a running keyframe animation ignores the write
//! 2. a property with a transition and a previous value starts (or
//!    retargets) a tween toward the new value
//! 3. anything else is written straight through, cancelling any tween
//!
//! Tween output always goes directly to [`Facade::set`].

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use veneer_animation::{AnimationRunner, AnimationSpec, TransitionDefaults, TransitionSpec, TweenId};
use veneer_core::{FacadeId, Value};

use crate::error::{FacadeError, Result};
use crate::facade::Facade;

/// Per-property interception state
#[derive(Clone, Copy, Debug, Default)]
struct AnimatableProperty {
    /// Written at least once through this layer
    has_value: bool,
    active_tween: Option<TweenId>,
}

struct RunningAnimation {
    spec: AnimationSpec,
    /// `None` once a finite animation has completed
    tween: Option<TweenId>,
}

/// Result of advancing one facade's tweens
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TickOutcome {
    pub wrote: bool,
    pub exit_finished: bool,
}

/// Animation state attached to an animatable facade
#[derive(Default)]
pub(crate) struct AnimationState {
    transitions: IndexMap<String, TransitionSpec>,
    props: FxHashMap<String, AnimatableProperty>,
    runner: AnimationRunner,
    animations: Vec<RunningAnimation>,
    animated_props: FxHashSet<String>,
    exit_animation: Option<AnimationSpec>,
    exit_tween: Option<TweenId>,
}

fn write_values(facade: &mut dyn Facade, values: Vec<(String, Value)>) {
    for (name, value) in values {
        if let Err(err) = facade.set(&name, value) {
            tracing::warn!(facade = facade.type_name(), property = %name, %err, "tween write failed");
        }
    }
}

impl AnimationState {
    /// Replace the transition configuration
    pub(crate) fn set_transitions(
        &mut self,
        transitions: IndexMap<String, TransitionSpec>,
        facade: &dyn Facade,
    ) -> Result<()> {
        for name in transitions.keys() {
            if !self.transitions.contains_key(name) && !facade.can_read(name) {
                return Err(FacadeError::PropertyNotReadable {
                    facade: facade.type_name(),
                    property: name.clone(),
                });
            }
        }
        self.transitions = transitions;
        Ok(())
    }

    /// Reconcile keyframe animations by position.
    ///
    /// A spec with the same identity as the one already in its slot only
    /// pauses or resumes; a different one snaps the old tween to its end
    /// before the new one starts. Every spec is validated before any running
    /// animation is touched, so a rejected list leaves the previous one intact.
    pub(crate) fn set_animations(
        &mut self,
        specs: Vec<AnimationSpec>,
        facade: &mut dyn Facade,
        now_ms: f64,
    ) -> Result<()> {
        for spec in &specs {
            spec.validate()?;
        }

        let mut previous = std::mem::take(&mut self.animations).into_iter();
        let mut next = Vec::with_capacity(specs.len());

        for spec in specs {
            match previous.next() {
                Some(mut running) if running.spec.same_identity(&spec) => {
                    if let Some(id) = running.tween {
                        if spec.paused {
                            self.runner.pause(id, now_ms);
                        } else {
                            self.runner.resume(id, now_ms);
                        }
                    }
                    running.spec = spec;
                    next.push(running);
                }
                superseded => {
                    if let Some(old) = superseded {
                        self.snap_superseded(old, facade);
                    }
                    let tween = match spec.compile(&|name| facade.get(name)) {
                        Ok(tween) => tween,
                        Err(err) => {
                            for orphan in next.into_iter().chain(previous) {
                                if let Some(id) = orphan.tween {
                                    self.runner.stop(id);
                                }
                            }
                            self.refresh_animated_props();
                            return Err(err.into());
                        }
                    };
                    let id = self.runner.start(tween.into(), now_ms);
                    if spec.paused {
                        self.runner.pause(id, now_ms);
                    }
                    next.push(RunningAnimation {
                        spec,
                        tween: Some(id),
                    });
                }
            }
        }
        for old in previous {
            self.snap_superseded(old, facade);
        }

        self.animations = next;
        self.refresh_animated_props();
        Ok(())
    }

    fn snap_superseded(&mut self, old: RunningAnimation, facade: &mut dyn Facade) {
        let Some(id) = old.tween else {
            return;
        };
        let mut values = Vec::new();
        self.runner
            .snap_to_end(id, &mut |name, value| values.push((name.to_string(), value)));
        tracing::trace!(props = values.len(), "snapped superseded animation");
        write_values(facade, values);
    }

    pub(crate) fn set_exit_animation(&mut self, spec: Option<AnimationSpec>) {
        self.exit_animation = spec;
    }

    pub(crate) fn has_exit_animation(&self) -> bool {
        self.exit_animation.is_some()
    }

    /// Switch to the exit animation. Returns false when there is none.
    ///
    /// Keyframe animations snap to their end and transitions stop where they
    /// are, so the exit tween is the only writer left.
    pub(crate) fn start_exit(&mut self, facade: &mut dyn Facade, now_ms: f64) -> Result<bool> {
        let Some(spec) = self.exit_animation.clone() else {
            return Ok(false);
        };
        spec.validate()?;

        for old in std::mem::take(&mut self.animations) {
            self.snap_superseded(old, facade);
        }
        for prop in self.props.values_mut() {
            if let Some(id) = prop.active_tween.take() {
                self.runner.stop(id);
            }
        }

        let tween = spec.compile(&|name| facade.get(name))?;
        self.exit_tween = Some(self.runner.start(tween.into(), now_ms));
        self.refresh_animated_props();
        Ok(true)
    }

    /// Route a property write through the layer
    pub(crate) fn write(
        &mut self,
        facade: &mut dyn Facade,
        name: &str,
        value: Value,
        now_ms: f64,
        defaults: &TransitionDefaults,
    ) -> Result<()> {
        if self.animated_props.contains(name) {
            tracing::trace!(property = name, "write ignored, property is animating");
            return Ok(());
        }

        let prop = self.props.entry(name.to_string()).or_default();
        let had_value = prop.has_value;
        prop.has_value = true;
        let active = prop.active_tween.filter(|id| self.runner.contains(*id));

        if let (Some(spec), true) = (self.transitions.get(name), had_value) {
            let needs_tween = match active.and_then(|id| self.runner.get(id)) {
                Some(tween) => tween.target() != Some(&value),
                None => facade.get(name).as_ref() != Some(&value),
            };
            if !needs_tween {
                return Ok(());
            }

            let velocity = active
                .and_then(|id| self.runner.get(id))
                .and_then(|tween| tween.value_velocity());
            let from = facade.get(name).unwrap_or_else(|| value.clone());
            let tween = spec.build_tween(name, from, value, defaults, velocity)?;
            if let Some(id) = active {
                self.runner.stop(id);
            }
            let id = self.runner.start(tween, now_ms);
            if let Some(prop) = self.props.get_mut(name) {
                prop.active_tween = Some(id);
            }
            return Ok(());
        }

        if let Some(id) = active {
            self.runner.stop(id);
        }
        if let Some(prop) = self.props.get_mut(name) {
            prop.active_tween = None;
        }
        facade.set(name, value)
    }

    /// Advance every tween to `now_ms` and write their values
    pub(crate) fn tick(&mut self, facade: &mut dyn Facade, now_ms: f64) -> TickOutcome {
        let mut values = Vec::new();
        let finished = self
            .runner
            .tick(now_ms, &mut |name, value| values.push((name.to_string(), value)));
        let wrote = !values.is_empty();
        write_values(facade, values);

        let mut exit_finished = false;
        if !finished.is_empty() {
            for prop in self.props.values_mut() {
                if prop.active_tween.is_some_and(|id| finished.contains(&id)) {
                    prop.active_tween = None;
                }
            }
            for animation in &mut self.animations {
                if animation.tween.is_some_and(|id| finished.contains(&id)) {
                    animation.tween = None;
                }
            }
            if let Some(exit) = self.exit_tween {
                exit_finished = finished.contains(&exit);
            }
            self.refresh_animated_props();
        }
        TickOutcome {
            wrote,
            exit_finished,
        }
    }

    /// Properties held by a live keyframe or exit animation
    fn refresh_animated_props(&mut self) {
        let mut animated = FxHashSet::default();
        let live = self
            .animations
            .iter()
            .filter_map(|animation| animation.tween)
            .chain(self.exit_tween);
        for id in live {
            if let Some(tween) = self.runner.get(id) {
                animated.extend(tween.properties().into_iter().map(str::to_string));
            }
        }
        self.animated_props = animated;
    }

    pub(crate) fn is_running(&self) -> bool {
        self.runner.has_running()
    }

    pub(crate) fn is_animating(&self, name: &str) -> bool {
        self.animated_props.contains(name)
    }

    pub(crate) fn has_active_tween(&self, name: &str) -> bool {
        self.props
            .get(name)
            .and_then(|prop| prop.active_tween)
            .is_some_and(|id| self.runner.contains(id))
    }

    /// Cancel every tween without writing anything
    pub(crate) fn cancel_all(&mut self, owner: FacadeId) {
        if !self.runner.is_empty() {
            tracing::trace!(?owner, tweens = self.runner.len(), "cancelling tweens");
        }
        self.runner.clear();
        self.animations.clear();
        self.animated_props.clear();
        self.exit_tween = None;
        for prop in self.props.values_mut() {
            prop.active_tween = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Group;
    use veneer_animation::{Easing, Iterations, KeyframeOffset};
    use veneer_core::Props;

    /// Accepts writes but cannot report them back
    struct WriteOnly;

    impl Facade for WriteOnly {
        fn get(&self, _name: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, _name: &str, _value: Value) -> Result<()> {
            Ok(())
        }
    }

    fn defaults() -> TransitionDefaults {
        TransitionDefaults {
            duration: 100.0,
            easing: Easing::Linear,
            spring_step_ms: 16.0,
        }
    }

    fn x(facade: &Group) -> f64 {
        facade.get("x").and_then(|v| v.as_number()).unwrap()
    }

    fn transitioned() -> (AnimationState, Group) {
        let mut state = AnimationState::default();
        let mut facade = Group::default();
        facade.set("x", Value::from(0.0)).unwrap();
        let transitions = IndexMap::from_iter([("x".to_string(), TransitionSpec::timed(100.0))]);
        state.set_transitions(transitions, &facade).unwrap();
        (state, facade)
    }

    #[test]
    fn test_first_write_snaps() {
        let (mut state, mut facade) = transitioned();
        state
            .write(&mut facade, "x", Value::from(40.0), 0.0, &defaults())
            .unwrap();
        assert_eq!(x(&facade), 40.0);
        assert!(!state.has_active_tween("x"));
    }

    #[test]
    fn test_second_write_transitions() {
        let (mut state, mut facade) = transitioned();
        state
            .write(&mut facade, "x", Value::from(0.0), 0.0, &defaults())
            .unwrap();
        state
            .write(&mut facade, "x", Value::from(100.0), 0.0, &defaults())
            .unwrap();
        assert_eq!(x(&facade), 0.0);

        state.tick(&mut facade, 50.0);
        assert_eq!(x(&facade), 50.0);
        state.tick(&mut facade, 100.0);
        assert_eq!(x(&facade), 100.0);
        assert!(!state.has_active_tween("x"));
    }

    #[test]
    fn test_same_target_does_not_restart() {
        let (mut state, mut facade) = transitioned();
        state
            .write(&mut facade, "x", Value::from(0.0), 0.0, &defaults())
            .unwrap();
        state
            .write(&mut facade, "x", Value::from(100.0), 0.0, &defaults())
            .unwrap();
        state.tick(&mut facade, 50.0);
        state
            .write(&mut facade, "x", Value::from(100.0), 50.0, &defaults())
            .unwrap();
        state.tick(&mut facade, 100.0);
        assert_eq!(x(&facade), 100.0);
    }

    #[test]
    fn test_unreadable_transition_property_rejected() {
        let mut state = AnimationState::default();
        let transitions =
            IndexMap::from_iter([("missing".to_string(), TransitionSpec::timed(100.0))]);
        assert!(matches!(
            state.set_transitions(transitions, &WriteOnly),
            Err(FacadeError::PropertyNotReadable { .. })
        ));
    }

    #[test]
    fn test_animated_property_ignores_writes() {
        let mut state = AnimationState::default();
        let mut facade = Group::default();
        let frames: Props = IndexMap::from_iter([("x".to_string(), Value::from(10.0))]);
        let spec = AnimationSpec::new(100.0)
            .keyframe(KeyframeOffset::FROM, IndexMap::from_iter([("x".to_string(), Value::from(0.0))]))
            .keyframe(KeyframeOffset::TO, frames)
            .iterations(Iterations::Infinite);
        state.set_animations(vec![spec], &mut facade, 0.0).unwrap();
        assert!(state.is_animating("x"));

        state
            .write(&mut facade, "x", Value::from(99.0), 0.0, &defaults())
            .unwrap();
        assert_eq!(facade.get("x"), None);

        state.tick(&mut facade, 50.0);
        assert_eq!(x(&facade), 5.0);
    }
}
