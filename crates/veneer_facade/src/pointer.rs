//! Pointer event routing
//!
//! Each [`EventSource`] gets its own interaction state, created on first use:
//!
//! ```text
//!            move (hit)               press on DragStart chain
//!   idle ───────────────► hovering ─────────────────────────► armed
//!     ▲                      │                                  │ first move
//!     └──── leave / miss ────┘                                  ▼
//!                            ◄──────────── release ──────── dragging
//! ```
//!
//! Alongside it runs the tap machine: a press records a candidate, and a
//! release on the same facade within the distance and duration thresholds
//! synthesizes `Click`. A second tap whose press starts within the
//! double-click window of the first press synthesizes `DoubleClick` after
//! its `Click`.
//!
//! Events dispatched to a facade run its listeners in registration order and
//! then bubble to its parent, until the root or `stop_propagation`. A panic in
//! one listener is caught and logged; the remaining listeners still run.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use smallvec::SmallVec;
use veneer_core::{EventType, FacadeId, HandlerIdentity, POINTER_EVENT_TYPES};

use crate::descriptor::EventCallback;
use crate::hit_test::closest_hit;
use crate::input::{EventSource, PointerEvent, RawEventKind, RawPointerEvent};
use crate::pointer_states::PointerStateAction;
use crate::world::{World, WorldMessage};

/// Handler stored in the world's event registry
#[derive(Clone)]
pub enum Listener {
    /// Listener attached through a descriptor
    Callback(EventCallback),
    /// Internal listener of the pointer-state capability
    PointerState(PointerStateAction),
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Callback(cb) => write!(f, "Callback({:p})", Rc::as_ptr(cb)),
            Listener::PointerState(action) => f.debug_tuple("PointerState").field(action).finish(),
        }
    }
}

impl HandlerIdentity for Listener {
    fn same_handler(&self, other: &Self) -> bool {
        match (self, other) {
            (Listener::Callback(a), Listener::Callback(b)) => a.same_handler(b),
            (Listener::PointerState(a), Listener::PointerState(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TapCandidate {
    facade: FacadeId,
    x: f32,
    y: f32,
    pressed_at: f64,
}

#[derive(Clone, Copy, Debug)]
struct CompletedTap {
    facade: FacadeId,
    pressed_at: f64,
}

#[derive(Clone, Copy, Debug)]
struct DragState {
    facade: FacadeId,
    started: bool,
}

/// Interaction state of one event source
#[derive(Debug, Default)]
pub struct PointerEventState {
    hovered: Option<FacadeId>,
    drag: Option<DragState>,
    tap: Option<TapCandidate>,
    last_tap: Option<CompletedTap>,
}

impl PointerEventState {
    fn forget(&mut self, id: FacadeId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.drag.is_some_and(|drag| drag.facade == id) {
            self.drag = None;
        }
        if self.tap.is_some_and(|tap| tap.facade == id) {
            self.tap = None;
        }
        if self.last_tap.is_some_and(|tap| tap.facade == id) {
            self.last_tap = None;
        }
    }
}

impl World {
    /// Route one piece of host input.
    ///
    /// Events with more than one touch down are ignored.
    pub fn handle_pointer_event(&mut self, raw: &RawPointerEvent) {
        if raw.is_multi_touch() {
            tracing::trace!(touches = raw.touches.len(), "ignoring multi-touch input");
            return;
        }
        match raw.kind {
            RawEventKind::MouseMove | RawEventKind::TouchMove => self.on_motion(raw),
            RawEventKind::MouseDown | RawEventKind::TouchStart => self.on_press(raw),
            RawEventKind::MouseUp | RawEventKind::TouchEnd | RawEventKind::TouchCancel => {
                self.on_release(raw)
            }
            RawEventKind::Wheel => self.on_wheel(raw),
            RawEventKind::Leave => self.on_leave(raw),
            // Synthesized from taps instead
            RawEventKind::Click | RawEventKind::DoubleClick => {}
        }
        self.flush_pointer_states();
    }

    /// Whether a drag is armed for `source`; while true the host should
    /// forward releases that happen anywhere, not just over the surface
    pub fn observes_release(&self, source: EventSource) -> bool {
        self.pointer_states
            .get(&source)
            .is_some_and(|state| state.drag.is_some())
    }

    /// Facade currently under the pointer of `source`
    pub fn hovered(&self, source: EventSource) -> Option<FacadeId> {
        self.pointer_states
            .get(&source)
            .and_then(|state| state.hovered)
    }

    /// Drop all interaction state for `source`
    pub fn forget_source(&mut self, source: EventSource) {
        self.pointer_states.remove(&source);
    }

    /// Dispatch a synthetic event at `target` and bubble it to the root
    pub fn dispatch_event(&mut self, target: FacadeId, event: &mut PointerEvent) {
        self.dispatch(target, event);
        self.flush_pointer_states();
    }

    /// Whether hit tests may currently select `id`
    pub fn is_pointer_eligible(&self, id: FacadeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.is_exiting || node.destroying || !node.facade.is_pointer_target() {
            return false;
        }
        match node.pointer_events {
            Some(enabled) => enabled,
            None => self.chain_has_any_listener(id, &POINTER_EVENT_TYPES),
        }
    }

    fn chain_has_any_listener(&self, id: FacadeId, event_types: &[EventType]) -> bool {
        let mut current = Some(id);
        while let Some(facade) = current {
            if self.registry.facade_has_any_of(facade, event_types) {
                return true;
            }
            current = self.nodes.get(facade).and_then(|node| node.parent);
        }
        false
    }

    fn pointer_target(&self, raw: &RawPointerEvent) -> Option<FacadeId> {
        let tester = self.hit_tester.as_ref()?;
        let eligible = |id: FacadeId| self.is_pointer_eligible(id);
        let hits = tester.hit_test(raw, &eligible);
        closest_hit(hits.into_iter().filter(|hit| eligible(hit.facade))).map(|hit| hit.facade)
    }

    fn on_motion(&mut self, raw: &RawPointerEvent) {
        if !self.registry.has_any_of(&POINTER_EVENT_TYPES) {
            return;
        }
        let source = raw.source;
        let target = self.pointer_target(raw);

        let (previous, drag, drag_just_started) = {
            let state = self.pointer_states.entry(source).or_default();
            let previous = state.hovered;
            state.hovered = target;
            let mut just_started = false;
            if let Some(drag) = state.drag.as_mut() {
                just_started = !drag.started;
                drag.started = true;
            }
            (previous, state.drag, just_started)
        };

        if let Some(drag) = drag {
            if drag_just_started {
                tracing::trace!(facade = ?drag.facade, "drag started");
                self.dispatch(drag.facade, &mut PointerEvent::from_raw(EventType::DragStart, raw));
            }
            self.dispatch(drag.facade, &mut PointerEvent::from_raw(EventType::Drag, raw));
        }

        let dragging = drag.is_some();
        if previous != target {
            if let Some(previous) = previous.filter(|id| self.nodes.contains_key(*id)) {
                let event_type = if dragging {
                    EventType::DragLeave
                } else {
                    EventType::MouseOut
                };
                let mut event = PointerEvent::from_raw(event_type, raw).with_related(target);
                self.dispatch(previous, &mut event);
            }
            if let Some(target) = target {
                let event_type = if dragging {
                    EventType::DragEnter
                } else {
                    EventType::MouseOver
                };
                let mut event = PointerEvent::from_raw(event_type, raw).with_related(previous);
                self.dispatch(target, &mut event);
            }
        }

        if let Some(target) = target {
            let event_type = if dragging {
                EventType::DragOver
            } else {
                EventType::MouseMove
            };
            self.dispatch(target, &mut PointerEvent::from_raw(event_type, raw));
        }
    }

    fn on_press(&mut self, raw: &RawPointerEvent) {
        let target = self.pointer_target(raw);
        let drag_facade =
            target.filter(|id| self.chain_has_any_listener(*id, &[EventType::DragStart]));
        let (x, y) = raw.position();

        let state = self.pointer_states.entry(raw.source).or_default();
        state.tap = target.map(|facade| TapCandidate {
            facade,
            x,
            y,
            pressed_at: raw.timestamp_ms,
        });
        state.drag = drag_facade.map(|facade| DragState {
            facade,
            started: false,
        });

        if let Some(target) = target {
            self.dispatch(target, &mut PointerEvent::from_raw(EventType::MouseDown, raw));
        }
    }

    fn on_release(&mut self, raw: &RawPointerEvent) {
        let target = self.pointer_target(raw);
        let (drag, tap, last_tap) = {
            let state = self.pointer_states.entry(raw.source).or_default();
            (state.drag.take(), state.tap.take(), state.last_tap)
        };

        if let Some(drag) = drag.filter(|drag| drag.started) {
            if let Some(target) = target {
                let mut event =
                    PointerEvent::from_raw(EventType::Drop, raw).with_related(Some(drag.facade));
                self.dispatch(target, &mut event);
            }
            if self.nodes.contains_key(drag.facade) {
                self.dispatch(drag.facade, &mut PointerEvent::from_raw(EventType::DragEnd, raw));
            }
            tracing::trace!(facade = ?drag.facade, "drag ended");
            return;
        }

        let Some(target) = target else {
            return;
        };
        self.dispatch(target, &mut PointerEvent::from_raw(EventType::MouseUp, raw));

        if raw.kind == RawEventKind::TouchCancel {
            return;
        }
        let Some(press) = tap else {
            return;
        };
        let (x, y) = raw.position();
        let distance = ((x - press.x).powi(2) + (y - press.y).powi(2)).sqrt();
        let is_tap = press.facade == target
            && distance <= self.config.tap_distance_threshold
            && raw.timestamp_ms - press.pressed_at <= self.config.tap_duration_threshold_ms;
        if !is_tap {
            return;
        }

        let is_double = last_tap.is_some_and(|last| {
            last.facade == target
                && press.pressed_at - last.pressed_at <= self.config.double_click_threshold_ms
        });
        if let Some(state) = self.pointer_states.get_mut(&raw.source) {
            state.last_tap = if is_double {
                None
            } else {
                Some(CompletedTap {
                    facade: target,
                    pressed_at: press.pressed_at,
                })
            };
        }

        self.dispatch(target, &mut PointerEvent::from_raw(EventType::Click, raw));
        if is_double {
            self.dispatch(target, &mut PointerEvent::from_raw(EventType::DoubleClick, raw));
        }
    }

    fn on_wheel(&mut self, raw: &RawPointerEvent) {
        if let Some(target) = self.pointer_target(raw) {
            self.dispatch(target, &mut PointerEvent::from_raw(EventType::Wheel, raw));
        }
    }

    fn on_leave(&mut self, raw: &RawPointerEvent) {
        let previous = self
            .pointer_states
            .get_mut(&raw.source)
            .and_then(|state| state.hovered.take());
        if let Some(previous) = previous.filter(|id| self.nodes.contains_key(*id)) {
            self.dispatch(previous, &mut PointerEvent::from_raw(EventType::MouseOut, raw));
        }
    }

    pub(crate) fn dispatch(&mut self, target: FacadeId, event: &mut PointerEvent) {
        event.target = Some(target);
        let mut current = Some(target);

        while let Some(id) = current {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            let parent = node.parent;
            let listeners: SmallVec<[Listener; 4]> = self
                .registry
                .get(event.event_type, id)
                .map(|listeners| listeners.iter().cloned().collect())
                .unwrap_or_default();

            event.current_target = Some(id);
            for listener in listeners {
                match listener {
                    Listener::Callback(callback) => {
                        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                            tracing::warn!(
                                facade = ?id,
                                event = %event.event_type,
                                "event listener panicked"
                            );
                        }
                    }
                    Listener::PointerState(action) => self.pointer_state_action(id, action),
                }
            }

            if event.propagation_stopped() || !event.bubbles {
                break;
            }
            current = parent;
        }
        event.current_target = None;
    }

    /// Toggle a pointer-state flag and schedule the outermost pointer-state
    /// ancestor's subtree for reapplication
    fn pointer_state_action(&mut self, id: FacadeId, action: PointerStateAction) {
        let changed = self
            .nodes
            .get_mut(id)
            .and_then(|node| node.pointer.as_mut())
            .is_some_and(|layer| layer.apply_action(action));
        if !changed {
            return;
        }

        let mut root = id;
        let mut current = self.nodes.get(id).and_then(|node| node.parent);
        while let Some(ancestor) = current {
            let Some(node) = self.nodes.get(ancestor) else {
                break;
            };
            if node.pointer.is_some() {
                root = ancestor;
            }
            current = node.parent;
        }
        if !self.pending_pointer_roots.contains(&root) {
            self.pending_pointer_roots.push(root);
        }
    }

    /// Reapply pointer overlays in every subtree touched since the last flush
    pub(crate) fn flush_pointer_states(&mut self) {
        let roots = std::mem::take(&mut self.pending_pointer_roots);
        for root in roots {
            for id in self.subtree(root) {
                match self.reapply_pointer_overlay(id) {
                    Ok(true) => {
                        self.run_after_update(id);
                        self.notify_world(id, WorldMessage::NeedsRender);
                    }
                    Ok(false) => {}
                    Err(err) => tracing::warn!(facade = ?id, %err, "pointer state reapply failed"),
                }
            }
        }
    }

    /// `root` and its descendants in pre-order, exiting children included
    pub(crate) fn subtree(&self, root: FacadeId) -> Vec<FacadeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            let children: SmallVec<[FacadeId; 8]> = node.child_ids().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Clear every interaction reference to a destroyed facade
    pub(crate) fn forget_facade(&mut self, id: FacadeId) {
        for state in self.pointer_states.values_mut() {
            state.forget(id);
        }
        self.pending_pointer_roots.retain(|root| *root != id);
    }
}
