//! The facade world
//!
//! [`World`] owns every facade in an arena and is the root of the ownership
//! tree. It applies descriptors, delivers upward messages, keeps the event
//! registry, advances animations once per frame, and routes pointer input
//! (see `pointer.rs`).
//!
//! # Update order
//!
//! Applying a descriptor to a facade runs, in order:
//!
//! 1. transitions and keyframe animations
//! 2. the pointer-state spec
//! 3. own props in field order, through pointer-state and animation layers
//! 4. the pointer overlay
//! 5. listener changes
//! 6. pointer-events opt-in and layout style
//! 7. `after_update`
//! 8. children
//! 9. the ref callback, then a render request
//!
//! Ref callbacks receiving `Some(id)` are held until the outermost update
//! finishes, so every `None` fired during a pass precedes every `Some`.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;
use veneer_animation::{Clock, FrameFlag, FrameScheduler, SystemClock, TransitionDefaults};
use veneer_core::{EventRegistry, EventType, FacadeId, Value};

use crate::animatable::AnimationState;
use crate::config::WorldConfig;
use crate::descriptor::{Capabilities, Children, Descriptor, EventCallback, RefCallback};
use crate::error::{FacadeError, Result};
use crate::facade::{Facade, FacadeCx, FacadeType, Group, Propagation};
use crate::hit_test::{Hit, HitTester};
use crate::input::{EventSource, RawPointerEvent};
use crate::layout::{LayoutEngine, LayoutStyle};
use crate::pointer::{Listener, PointerEventState};
use crate::pointer_states::{PointerStateAction, PointerStateLayer};

/// Message posted up the ownership chain
#[derive(Clone, Debug)]
pub enum WorldMessage {
    /// A visual property changed
    NeedsRender,
    AddEventListener {
        event_type: EventType,
        listener: Listener,
    },
    RemoveEventListener {
        event_type: EventType,
        listener: Listener,
    },
    RemoveAllEventListeners,
    /// Layout-affecting state changed
    LayoutChanged,
    /// Application-defined message
    Custom { name: String, data: Value },
}

/// Cached resolution of where a facade's messages go first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum NotifyTarget {
    #[default]
    Unresolved,
    Ancestor(FacadeId),
    World,
}

type MessageHook = Box<dyn FnMut(FacadeId, &str, &Value)>;

/// Arena entry for one facade
pub(crate) struct FacadeNode {
    pub(crate) facade: Box<dyn Facade>,
    pub(crate) facade_type: FacadeType,
    pub(crate) parent: Option<FacadeId>,
    pub(crate) key: String,
    pub(crate) children: IndexMap<String, FacadeId>,
    /// Removed children still playing their exit animation
    pub(crate) exiting: Vec<FacadeId>,
    pub(crate) capabilities: Capabilities,
    pub(crate) animation: Option<AnimationState>,
    pub(crate) pointer: Option<PointerStateLayer>,
    pub(crate) listeners: Vec<(EventType, EventCallback)>,
    pub(crate) ref_cb: Option<RefCallback>,
    pub(crate) pointer_events: Option<bool>,
    pub(crate) layout: Option<LayoutStyle>,
    pub(crate) notify_target: NotifyTarget,
    pub(crate) is_exiting: bool,
    pub(crate) destroying: bool,
}

impl FacadeNode {
    fn new(
        facade: Box<dyn Facade>,
        facade_type: FacadeType,
        parent: Option<FacadeId>,
        key: String,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            facade,
            facade_type,
            parent,
            key,
            children: IndexMap::new(),
            exiting: Vec::new(),
            capabilities,
            animation: capabilities.animatable.then(AnimationState::default),
            pointer: capabilities
                .pointer_states
                .then(PointerStateLayer::default),
            listeners: Vec::new(),
            ref_cb: None,
            pointer_events: None,
            layout: None,
            notify_target: NotifyTarget::Unresolved,
            is_exiting: false,
            destroying: false,
        }
    }

    /// Write below the pointer-state layer
    pub(crate) fn write_animated(
        &mut self,
        name: &str,
        value: Value,
        now_ms: f64,
        defaults: &TransitionDefaults,
    ) -> Result<()> {
        match self.animation.as_mut() {
            Some(animation) => animation.write(self.facade.as_mut(), name, value, now_ms, defaults),
            None => self.facade.set(name, value),
        }
    }

    pub(crate) fn child_ids(&self) -> impl Iterator<Item = FacadeId> + '_ {
        self.children
            .values()
            .copied()
            .chain(self.exiting.iter().copied())
    }
}

/// Root of a facade tree
pub struct World {
    pub(crate) nodes: SlotMap<FacadeId, FacadeNode>,
    root: FacadeId,
    pub(crate) config: WorldConfig,
    pub(crate) transition_defaults: TransitionDefaults,
    pub(crate) registry: EventRegistry<Listener>,
    pub(crate) pointer_states: FxHashMap<EventSource, PointerEventState>,
    pub(crate) pending_pointer_roots: SmallVec<[FacadeId; 2]>,
    pub(crate) hit_tester: Option<Box<dyn HitTester>>,
    pub(crate) layout_engine: Option<Box<dyn LayoutEngine>>,
    pub(crate) layout_dirty: bool,
    clock: Box<dyn Clock>,
    frames: Box<dyn FrameScheduler>,
    needs_render: bool,
    pending_refs: Vec<(RefCallback, FacadeId)>,
    message_hook: Option<MessageHook>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("facades", &self.len())
            .field("needs_render", &self.needs_render)
            .field("layout_dirty", &self.layout_dirty)
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(FacadeNode::new(
            Box::new(Group::default()),
            FacadeType::of::<Group>(),
            None,
            "root".to_string(),
            Capabilities::default(),
        ));
        Self {
            nodes,
            root,
            transition_defaults: config.transition_defaults(),
            config,
            registry: EventRegistry::new(),
            pointer_states: FxHashMap::default(),
            pending_pointer_roots: SmallVec::new(),
            hit_tester: None,
            layout_engine: None,
            layout_dirty: false,
            clock: Box::new(SystemClock::new()),
            frames: Box::new(FrameFlag::new()),
            needs_render: false,
            pending_refs: Vec::new(),
            message_hook: None,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_frame_scheduler(mut self, frames: impl FrameScheduler + 'static) -> Self {
        self.frames = Box::new(frames);
        self
    }

    /// Engine used to recompute layout during `tick`
    pub fn with_layout_engine(mut self, engine: impl LayoutEngine + 'static) -> Self {
        self.layout_engine = Some(Box::new(engine));
        self
    }

    pub fn set_hit_tester(&mut self, tester: impl HitTester + 'static) {
        self.hit_tester = Some(Box::new(tester));
    }

    /// Install a closure as the hit tester
    pub fn set_hit_test_fn<F>(&mut self, hit_test: F)
    where
        F: Fn(&RawPointerEvent, &dyn Fn(FacadeId) -> bool) -> Vec<Hit> + 'static,
    {
        self.set_hit_tester(hit_test);
    }

    /// Receive `WorldMessage::Custom` messages that reach the root
    pub fn set_message_hook<F>(&mut self, hook: F)
    where
        F: FnMut(FacadeId, &str, &Value) + 'static,
    {
        self.message_hook = Some(Box::new(hook));
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn root(&self) -> FacadeId {
        self.root
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn contains(&self, id: FacadeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live facades, excluding the root
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: FacadeId) -> Option<FacadeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Reconciliation key of a facade under its parent
    pub fn key(&self, id: FacadeId) -> Option<&str> {
        self.nodes.get(id).map(|node| node.key.as_str())
    }

    /// Live children in order; exiting children are not included
    pub fn children(&self, id: FacadeId) -> Vec<FacadeId> {
        self.nodes
            .get(id)
            .map(|node| node.children.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn child(&self, parent: FacadeId, key: &str) -> Option<FacadeId> {
        self.nodes
            .get(parent)
            .and_then(|node| node.children.get(key).copied())
    }

    /// Children removed from the tree but still playing an exit animation
    pub fn exiting_children(&self, id: FacadeId) -> Vec<FacadeId> {
        self.nodes
            .get(id)
            .map(|node| node.exiting.clone())
            .unwrap_or_default()
    }

    pub fn is_exiting(&self, id: FacadeId) -> bool {
        self.nodes.get(id).is_some_and(|node| node.is_exiting)
    }

    pub fn capabilities(&self, id: FacadeId) -> Option<Capabilities> {
        self.nodes.get(id).map(|node| node.capabilities)
    }

    /// Live value of a property, reflecting in-flight tweens
    pub fn get(&self, id: FacadeId, name: &str) -> Option<Value> {
        self.nodes.get(id).and_then(|node| node.facade.get(name))
    }

    pub fn facade<T: Facade + Any>(&self, id: FacadeId) -> Option<&T> {
        self.nodes
            .get(id)
            .and_then(|node| node.facade.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn facade_mut<T: Facade + Any>(&mut self, id: FacadeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id)
            .and_then(|node| node.facade.as_mut().as_any_mut().downcast_mut::<T>())
    }

    /// Whether a keyframe or exit animation currently owns the property
    pub fn is_prop_animating(&self, id: FacadeId, name: &str) -> bool {
        self.nodes
            .get(id)
            .and_then(|node| node.animation.as_ref())
            .is_some_and(|animation| animation.is_animating(name))
    }

    /// Whether a transition tween is moving the property
    pub fn is_prop_transitioning(&self, id: FacadeId, name: &str) -> bool {
        self.nodes
            .get(id)
            .and_then(|node| node.animation.as_ref())
            .is_some_and(|animation| animation.has_active_tween(name))
    }

    /// `(hovering, active)` flags of a pointer-state facade
    pub fn pointer_state_flags(&self, id: FacadeId) -> Option<(bool, bool)> {
        self.nodes
            .get(id)
            .and_then(|node| node.pointer.as_ref())
            .map(|layer| (layer.is_hovering(), layer.is_active()))
    }

    /// Check and clear the render request flag
    pub fn take_needs_render(&mut self) -> bool {
        std::mem::take(&mut self.needs_render)
    }

    /// Whether any facade has a playing tween
    pub fn is_animating(&self) -> bool {
        self.nodes.values().any(|node| {
            node.animation
                .as_ref()
                .is_some_and(AnimationState::is_running)
        })
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Reconcile the root's children against `descriptors`
    pub fn update_root(
        &mut self,
        descriptors: impl IntoIterator<Item = Option<Descriptor>>,
    ) -> Result<()> {
        let root = self.root;
        let result = self.reconcile_children(root, descriptors.into_iter().collect());
        self.finish_update();
        result
    }

    /// Apply a descriptor to an existing facade.
    ///
    /// Capability layers the descriptor needs are added if missing; layers
    /// are never removed from a live instance.
    pub fn update(&mut self, id: FacadeId, descriptor: Descriptor) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(FacadeError::UnknownFacade(id));
        }
        self.ensure_capabilities(id, descriptor.capabilities());
        let result = self.apply_descriptor(id, descriptor);
        self.finish_update();
        result
    }

    /// Write one property through the interceptor layers, as if assigned by
    /// a descriptor, then run `after_update`
    pub fn set_prop(&mut self, id: FacadeId, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write_prop(id, name, value.into())?;
        self.reapply_pointer_overlay(id)?;
        self.run_after_update(id);
        self.notify_world(id, WorldMessage::NeedsRender);
        Ok(())
    }

    /// Destroy a facade, honoring its exit animation. Destroying the root
    /// clears its children.
    pub fn destroy(&mut self, id: FacadeId) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(FacadeError::UnknownFacade(id));
        }
        if id == self.root {
            return self.update_root(Vec::new());
        }
        self.destroy_node(id, false);
        self.finish_update();
        Ok(())
    }

    fn ensure_capabilities(&mut self, id: FacadeId, wanted: Capabilities) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if wanted.animatable && node.animation.is_none() {
            node.animation = Some(AnimationState::default());
            node.capabilities.animatable = true;
        }
        if wanted.pointer_states && node.pointer.is_none() {
            node.pointer = Some(PointerStateLayer::default());
            node.capabilities.pointer_states = true;
            self.install_pointer_state_listeners(id);
        }
    }

    fn install_pointer_state_listeners(&mut self, id: FacadeId) {
        for (event_type, action) in PointerStateAction::LISTENERS {
            self.notify_world(
                id,
                WorldMessage::AddEventListener {
                    event_type,
                    listener: Listener::PointerState(action),
                },
            );
        }
    }

    pub(crate) fn create_node(
        &mut self,
        parent: FacadeId,
        key: String,
        descriptor: &Descriptor,
    ) -> FacadeId {
        let capabilities = descriptor.capabilities();
        let id = self.nodes.insert(FacadeNode::new(
            descriptor.facade.construct(),
            descriptor.facade,
            Some(parent),
            key,
            capabilities,
        ));
        if capabilities.pointer_states {
            self.install_pointer_state_listeners(id);
        }
        tracing::trace!(?id, facade = descriptor.facade.name(), "created facade");
        id
    }

    pub(crate) fn apply_descriptor(&mut self, id: FacadeId, descriptor: Descriptor) -> Result<()> {
        let now = self.now_ms();
        let Descriptor {
            props,
            children,
            transition,
            animation,
            exit_animation,
            pointer_states,
            listeners,
            ref_cb,
            pointer_events,
            layout,
            ..
        } = descriptor;

        {
            let node = self
                .nodes
                .get_mut(id)
                .ok_or(FacadeError::UnknownFacade(id))?;
            let FacadeNode {
                facade,
                animation: animation_state,
                pointer,
                ..
            } = node;
            if let Some(state) = animation_state.as_mut() {
                state.set_transitions(transition.unwrap_or_default(), facade.as_ref())?;
                state.set_animations(animation.unwrap_or_default(), facade.as_mut(), now)?;
                state.set_exit_animation(exit_animation);
            }
            if let Some(layer) = pointer.as_mut() {
                layer.configure(pointer_states.unwrap_or_default(), facade.as_ref())?;
            }
        }

        for (name, value) in props {
            self.write_prop(id, &name, value)?;
        }
        self.reapply_pointer_overlay(id)?;
        self.diff_listeners(id, listeners);

        let mut layout_changed = false;
        if let Some(node) = self.nodes.get_mut(id) {
            node.pointer_events = pointer_events;
            if node.layout != layout {
                node.layout = layout;
                layout_changed = true;
            }
        }
        if layout_changed {
            self.mark_layout_dirty();
        }

        self.run_after_update(id);

        let descriptors = match children {
            Some(Children::Tree(list)) => list,
            Some(Children::List(list)) => list.expand(),
            None => Vec::new(),
        };
        let has_children = self
            .nodes
            .get(id)
            .is_some_and(|node| !node.children.is_empty());
        if has_children || !descriptors.is_empty() {
            self.reconcile_children(id, descriptors)?;
        }

        self.assign_ref(id, ref_cb);
        self.notify_world(id, WorldMessage::NeedsRender);
        Ok(())
    }

    /// Write through the pointer-state layer, then the animation layer
    pub(crate) fn write_prop(&mut self, id: FacadeId, name: &str, value: Value) -> Result<()> {
        let now = self.now_ms();
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(FacadeError::UnknownFacade(id))?;
        let value = match node.pointer.as_mut() {
            Some(layer) => match layer.intercept(name, value) {
                Some(value) => value,
                None => return Ok(()),
            },
            None => value,
        };
        node.write_animated(name, value, now, &self.transition_defaults)
    }

    /// Bring a pointer-state facade's display in line with its flags.
    /// Returns true when anything was written.
    pub(crate) fn reapply_pointer_overlay(&mut self, id: FacadeId) -> Result<bool> {
        let now = self.now_ms();
        let Some(node) = self.nodes.get_mut(id) else {
            return Ok(false);
        };
        let Some(layer) = node.pointer.as_mut() else {
            return Ok(false);
        };
        let writes = layer.reconcile();
        let wrote = !writes.is_empty();
        for (name, value) in writes {
            node.write_animated(&name, value, now, &self.transition_defaults)?;
        }
        Ok(wrote)
    }

    fn diff_listeners(&mut self, id: FacadeId, listeners: Vec<(EventType, EventCallback)>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let previous = std::mem::take(&mut node.listeners);
        let contains = |list: &[(EventType, EventCallback)], event_type: EventType, cb: &EventCallback| {
            list.iter()
                .any(|(t, c)| *t == event_type && Rc::ptr_eq(c, cb))
        };

        for (event_type, callback) in &previous {
            if !contains(&listeners, *event_type, callback) {
                self.notify_world(
                    id,
                    WorldMessage::RemoveEventListener {
                        event_type: *event_type,
                        listener: Listener::Callback(callback.clone()),
                    },
                );
            }
        }
        for (event_type, callback) in &listeners {
            if !contains(&previous, *event_type, callback) {
                self.notify_world(
                    id,
                    WorldMessage::AddEventListener {
                        event_type: *event_type,
                        listener: Listener::Callback(callback.clone()),
                    },
                );
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.listeners = listeners;
        }
    }

    pub(crate) fn run_after_update(&mut self, id: FacadeId) {
        let now = self.now_ms();
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let mut cx = FacadeCx::new(id, now);
        node.facade.after_update(&mut cx);
        self.deliver(id, cx.into_messages());
    }

    fn assign_ref(&mut self, id: FacadeId, next: Option<RefCallback>) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let unchanged = match (&node.ref_cb, &next) {
            (Some(current), Some(next)) => Rc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return;
        }
        let previous = std::mem::replace(&mut node.ref_cb, next.clone());
        if let Some(previous) = previous {
            previous(None);
        }
        if let Some(next) = next {
            self.pending_refs.push((next, id));
        }
    }

    /// Fire held `ref(Some)` calls and flush batched pointer-state changes
    pub(crate) fn finish_update(&mut self) {
        for (callback, id) in std::mem::take(&mut self.pending_refs) {
            let current = self
                .nodes
                .get(id)
                .and_then(|node| node.ref_cb.as_ref())
                .is_some_and(|cb| Rc::ptr_eq(cb, &callback));
            if current {
                callback(Some(id));
            }
        }
        self.flush_pointer_states();
    }

    // ========================================================================
    // Destruction
    // ========================================================================

    /// Tear down a facade and its subtree. Unless `immediate`, a configured
    /// exit animation defers the teardown.
    pub(crate) fn destroy_node(&mut self, id: FacadeId, immediate: bool) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if node.destroying {
            return;
        }
        if !immediate && !node.is_exiting && self.begin_exit(id) {
            return;
        }

        let now = self.now_ms();
        if let Some(node) = self.nodes.get_mut(id) {
            node.destroying = true;
        }

        self.notify_world(id, WorldMessage::RemoveAllEventListeners);
        if let Some(callback) = self.nodes.get_mut(id).and_then(|node| node.ref_cb.take()) {
            callback(None);
        }

        let children: Vec<FacadeId> = self
            .nodes
            .get(id)
            .map(|node| node.child_ids().collect())
            .unwrap_or_default();
        for child in children {
            self.destroy_node(child, true);
        }

        let messages = match self.nodes.get_mut(id) {
            Some(node) => {
                if let Some(animation) = node.animation.as_mut() {
                    animation.cancel_all(id);
                }
                let mut cx = FacadeCx::new(id, now);
                node.facade.destroy(&mut cx);
                cx.into_messages()
            }
            None => Vec::new(),
        };
        self.deliver(id, messages);

        let Some(node) = self.nodes.remove(id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|parent| self.nodes.get_mut(parent)) {
            parent.children.retain(|_, child| *child != id);
            parent.exiting.retain(|child| *child != id);
        }
        if node.layout.is_some() {
            self.mark_layout_dirty();
        }
        self.forget_facade(id);
        tracing::trace!(?id, facade = node.facade_type.name(), key = %node.key, "destroyed facade");
    }

    /// Start the exit animation and park the facade in its parent's exiting
    /// list. Returns false when teardown should happen now.
    fn begin_exit(&mut self, id: FacadeId) -> bool {
        let now = self.now_ms();
        let Some(parent) = self.nodes.get(id).and_then(|node| node.parent) else {
            return false;
        };
        if self.nodes.get(parent).map_or(true, |node| node.destroying) {
            return false;
        }
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let FacadeNode {
            facade, animation, ..
        } = node;
        let Some(animation) = animation.as_mut() else {
            return false;
        };
        if !animation.has_exit_animation() {
            return false;
        }
        match animation.start_exit(facade.as_mut(), now) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                tracing::warn!(?id, %err, "exit animation failed to start");
                return false;
            }
        }
        node.is_exiting = true;

        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|_, child| *child != id);
            if !parent.exiting.contains(&id) {
                parent.exiting.push(id);
            }
        }
        self.frames.request_frame();
        tracing::debug!(?id, "deferring destruction until exit animation completes");
        true
    }

    // ========================================================================
    // Messaging
    // ========================================================================

    /// Post a message from `source` up the ownership chain
    pub fn notify_world(&mut self, source: FacadeId, message: WorldMessage) {
        let mut target = self.notify_target(source);
        loop {
            let NotifyTarget::Ancestor(handler) = target else {
                self.handle_world_message(source, message);
                return;
            };
            let now = self.now_ms();
            let Some(node) = self.nodes.get_mut(handler) else {
                self.handle_world_message(source, message);
                return;
            };
            let mut cx = FacadeCx::new(handler, now);
            let propagation = node.facade.on_notify_world(&mut cx, source, &message);
            self.deliver(handler, cx.into_messages());
            match propagation {
                Propagation::Handled => return,
                Propagation::Continue => target = self.notify_target(handler),
            }
        }
    }

    fn deliver(&mut self, source: FacadeId, messages: Vec<WorldMessage>) {
        for message in messages {
            self.notify_world(source, message);
        }
    }

    /// Nearest ancestor handling messages, resolved once and cached
    fn notify_target(&mut self, id: FacadeId) -> NotifyTarget {
        let Some(node) = self.nodes.get(id) else {
            return NotifyTarget::World;
        };
        if node.notify_target != NotifyTarget::Unresolved {
            return node.notify_target;
        }

        let mut target = NotifyTarget::World;
        let mut current = node.parent;
        while let Some(ancestor) = current {
            let Some(ancestor_node) = self.nodes.get(ancestor) else {
                break;
            };
            if ancestor_node.facade.handles_world_messages() {
                target = NotifyTarget::Ancestor(ancestor);
                break;
            }
            current = ancestor_node.parent;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.notify_target = target;
        }
        target
    }

    fn handle_world_message(&mut self, source: FacadeId, message: WorldMessage) {
        match message {
            WorldMessage::NeedsRender => self.request_render(),
            WorldMessage::AddEventListener {
                event_type,
                listener,
            } => self.registry.add(event_type, source, listener),
            WorldMessage::RemoveEventListener {
                event_type,
                listener,
            } => {
                self.registry.remove(event_type, source, &listener);
            }
            WorldMessage::RemoveAllEventListeners => self.registry.remove_all(source),
            WorldMessage::LayoutChanged => self.mark_layout_dirty(),
            WorldMessage::Custom { name, data } => match self.message_hook.as_mut() {
                Some(hook) => hook(source, &name, &data),
                None => tracing::trace!(?source, name = %name, "unhandled custom message"),
            },
        }
    }

    fn request_render(&mut self) {
        if !self.needs_render {
            self.needs_render = true;
            self.frames.request_frame();
        }
    }

    pub(crate) fn mark_layout_dirty(&mut self) {
        if !self.layout_dirty {
            self.layout_dirty = true;
            self.frames.request_frame();
        }
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Advance every running tween to the clock's current time.
    ///
    /// Facades whose values changed get `after_update` and a render request;
    /// facades whose exit animation finished are torn down. A pending layout
    /// recompute runs here when an engine is installed. Returns whether
    /// another frame is needed.
    pub fn tick(&mut self) -> bool {
        let now = self.now_ms();
        let running: Vec<FacadeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.animation
                    .as_ref()
                    .is_some_and(AnimationState::is_running)
            })
            .map(|(id, _)| id)
            .collect();

        let mut finished_exits = Vec::new();
        for id in running {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let FacadeNode {
                facade, animation, ..
            } = node;
            let Some(animation) = animation.as_mut() else {
                continue;
            };
            let outcome = animation.tick(facade.as_mut(), now);
            if outcome.wrote {
                self.run_after_update(id);
                self.notify_world(id, WorldMessage::NeedsRender);
            }
            if outcome.exit_finished {
                finished_exits.push(id);
            }
        }

        for id in finished_exits {
            tracing::debug!(?id, "exit animation finished");
            self.destroy_node(id, true);
        }

        if self.layout_dirty && self.layout_engine.is_some() {
            if let Err(err) = self.run_installed_layout() {
                tracing::error!(%err, "layout pass failed");
            }
        }

        let animating = self.is_animating();
        if animating {
            self.frames.request_frame();
        }
        animating
    }
}
