//! Veneer Facades
//!
//! Retained facade trees driven by declarative descriptors.
//!
//! # Features
//!
//! - **Reconciliation**: keyed diffing of child descriptors against live
//!   facades, with synthesized keys for unkeyed children and list expansion
//! - **Capabilities**: transitions, keyframe and exit animations, and
//!   hover/active overlays layered onto any facade type
//! - **World**: arena ownership, upward messaging with handler ancestors,
//!   render and layout requests, per-frame animation ticks
//! - **Pointer routing**: hit-test boundary, bubbling dispatch, and
//!   hover/tap/double-click/drag state machines per input source
//! - **Layout**: flex styles solved by taffy, in-process or on a worker
//!
//! # Example
//!
//! ```rust
//! use veneer_animation::{ManualClock, TransitionSpec};
//! use veneer_facade::{Descriptor, Group, World, WorldConfig};
//!
//! let clock = ManualClock::new();
//! let mut world = World::new(WorldConfig::default()).with_clock(clock.clone());
//!
//! let card = || {
//!     Descriptor::of::<Group>()
//!         .key("card")
//!         .transition("x", TransitionSpec::timed(300.0))
//! };
//! world.update_root([Some(card().prop("x", 0.0))])?;
//! world.update_root([Some(card().prop("x", 90.0))])?;
//!
//! let id = world.child(world.root(), "card").unwrap();
//! clock.set(150.0);
//! world.tick();
//! assert!(world.get(id, "x").unwrap().as_number().unwrap() > 0.0);
//! # Ok::<(), veneer_facade::FacadeError>(())
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod facade;
pub mod hit_test;
pub mod input;
pub mod layout;
pub mod pointer;
pub mod pointer_states;
pub mod worker;
pub mod world;

mod animatable;
mod reconcile;


pub use config::WorldConfig;
pub use descriptor::{
    Capabilities, Children, Descriptor, EventCallback, ListDescriptor, RefCallback,
};
pub use error::{FacadeError, Result};
pub use facade::{number_prop, AsAny, Facade, FacadeCx, FacadeType, Group, Propagation};
pub use hit_test::{closest_hit, Hit, HitTester};
pub use input::{
    EventSource, Modifiers, MouseButton, NativeFlags, PointerEvent, RawEventKind,
    RawPointerEvent, TouchPoint,
};
pub use layout::{
    BoxMetrics, LayoutEngine, LayoutRequest, LayoutResponse, LayoutStyle, Length,
    TaffyLayoutEngine,
};
pub use pointer::{Listener, PointerEventState};
pub use pointer_states::{PointerStateAction, PointerStates};
pub use worker::{WorkerContext, WorkerLayoutEngine, WorkerMode};
pub use world::{World, WorldMessage};
