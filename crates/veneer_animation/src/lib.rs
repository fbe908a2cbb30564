//! Veneer Animation System
//!
//! Time- and spring-driven tweens used by animatable facades.
//!
//! # Features
//!
//! - **Easing**: the usual In/Out/InOut families plus cubic-bezier curves
//! - **Interpolation**: numeric lerp, packed-RGB color lerp, and stepping
//! - **Spring Physics**: RK4-integrated springs that keep their velocity when
//!   retargeted mid-flight
//! - **Tweens**: timed, spring, and nested multi-tweens with delay,
//!   iteration count, and play direction
//! - **Keyframes**: CSS-style keyframe descriptors compiled into a tree of
//!   per-property tweens under one outer driver
//! - **Runner**: per-owner tween playback with pause/resume and snap-to-end
//! - **Scheduling**: pluggable clocks and frame schedulers

pub mod easing;
pub mod error;
pub mod keyframe;
pub mod runner;
pub mod scheduler;
pub mod spring;
pub mod transition;
pub mod tween;
pub mod values;

pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use keyframe::{AnimationSpec, KeyframeOffset, KeyframeSpec};
pub use runner::{AnimationRunner, TweenId};
pub use scheduler::{
    CallbackFrameScheduler, Clock, FrameFlag, FrameScheduler, ManualClock, SystemClock,
    WakeCallback,
};
pub use spring::{Spring, SpringConfig};
pub use transition::{TransitionDefaults, TransitionSpec};
pub use tween::{
    Direction, Iterations, MultiTween, SpringTween, TimedTween, Timing, Tween, TweenSink,
};
pub use values::{Interpolate, Interpolation};
