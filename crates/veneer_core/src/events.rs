//! Event types and the listener registry
//!
//! The registry maps `event type -> facade -> handlers`. Most facades register
//! a single handler per event type, so handlers are kept in a
//! `SmallVec<[H; 1]>`: the list only spills to the heap once a second distinct
//! handler is added for the same pair.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use veneer_core::{EventRegistry, EventType, FacadeId};
//!
//! let mut registry: EventRegistry<Rc<dyn Fn()>> = EventRegistry::new();
//! let handler: Rc<dyn Fn()> = Rc::new(|| {});
//! let id = FacadeId::default();
//!
//! registry.add(EventType::Click, id, handler.clone());
//! registry.add(EventType::Click, id, handler.clone()); // no-op
//! assert_eq!(registry.get(EventType::Click, id).map(|h| h.len()), Some(1));
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{CoreError, Result};
use crate::id::FacadeId;

/// Pointer and custom event types routed through the facade tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    MouseOver,
    MouseOut,
    MouseMove,
    MouseDown,
    MouseUp,
    Click,
    DoubleClick,
    Wheel,
    DragStart,
    Drag,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    DragEnd,
    /// Application-defined event, dispatched explicitly through the world
    Custom(&'static str),
}

/// Every built-in pointer event type.
///
/// Used to decide whether any pointer listener exists at all before paying
/// for a hit test.
pub const POINTER_EVENT_TYPES: [EventType; 15] = [
    EventType::MouseOver,
    EventType::MouseOut,
    EventType::MouseMove,
    EventType::MouseDown,
    EventType::MouseUp,
    EventType::Click,
    EventType::DoubleClick,
    EventType::Wheel,
    EventType::DragStart,
    EventType::Drag,
    EventType::DragEnter,
    EventType::DragOver,
    EventType::DragLeave,
    EventType::Drop,
    EventType::DragEnd,
];

impl EventType {
    /// DOM-style event name
    pub fn name(&self) -> &'static str {
        match self {
            EventType::MouseOver => "mouseover",
            EventType::MouseOut => "mouseout",
            EventType::MouseMove => "mousemove",
            EventType::MouseDown => "mousedown",
            EventType::MouseUp => "mouseup",
            EventType::Click => "click",
            EventType::DoubleClick => "dblclick",
            EventType::Wheel => "wheel",
            EventType::DragStart => "dragstart",
            EventType::Drag => "drag",
            EventType::DragEnter => "dragenter",
            EventType::DragOver => "dragover",
            EventType::DragLeave => "dragleave",
            EventType::Drop => "drop",
            EventType::DragEnd => "dragend",
            EventType::Custom(name) => name,
        }
    }

    /// Look up a built-in pointer event by its DOM-style name
    pub fn from_name(name: &str) -> Result<Self> {
        POINTER_EVENT_TYPES
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| CoreError::UnknownEventType(name.to_string()))
    }

    /// Whether this is one of the built-in pointer events
    pub fn is_pointer(&self) -> bool {
        !matches!(self, EventType::Custom(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handler identity used to deduplicate registrations
pub trait HandlerIdentity {
    fn same_handler(&self, other: &Self) -> bool;
}

impl<T: ?Sized> HandlerIdentity for Rc<T> {
    fn same_handler(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

type HandlerList<H> = SmallVec<[H; 1]>;

/// Listener storage keyed by `(event type, facade)`
pub struct EventRegistry<H> {
    by_type: FxHashMap<EventType, FxHashMap<FacadeId, HandlerList<H>>>,
}

impl<H> Default for EventRegistry<H> {
    fn default() -> Self {
        Self {
            by_type: FxHashMap::default(),
        }
    }
}

impl<H: HandlerIdentity> EventRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Adding a handler already present for the same
    /// `(event type, facade)` pair does nothing.
    pub fn add(&mut self, event_type: EventType, facade: FacadeId, handler: H) {
        let handlers = self
            .by_type
            .entry(event_type)
            .or_default()
            .entry(facade)
            .or_default();
        if !handlers.iter().any(|h| h.same_handler(&handler)) {
            handlers.push(handler);
        }
    }

    /// Unregister a handler. Returns true if it was registered.
    pub fn remove(&mut self, event_type: EventType, facade: FacadeId, handler: &H) -> bool {
        let Some(by_facade) = self.by_type.get_mut(&event_type) else {
            return false;
        };
        let Some(handlers) = by_facade.get_mut(&facade) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|h| !h.same_handler(handler));
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            by_facade.remove(&facade);
        }
        if by_facade.is_empty() {
            self.by_type.remove(&event_type);
        }
        removed
    }

    /// Drop every handler registered for a facade
    pub fn remove_all(&mut self, facade: FacadeId) {
        self.by_type.retain(|_, by_facade| {
            by_facade.remove(&facade);
            !by_facade.is_empty()
        });
    }

    /// Handlers for a pair, in registration order
    pub fn get(&self, event_type: EventType, facade: FacadeId) -> Option<&[H]> {
        self.by_type
            .get(&event_type)
            .and_then(|by_facade| by_facade.get(&facade))
            .map(|handlers| handlers.as_slice())
    }

    pub fn has(&self, event_type: EventType, facade: FacadeId) -> bool {
        self.get(event_type, facade).is_some()
    }

    /// Whether any facade listens for this event type
    pub fn has_any(&self, event_type: EventType) -> bool {
        self.by_type.contains_key(&event_type)
    }

    /// Whether any facade listens for any of the given event types
    pub fn has_any_of(&self, event_types: &[EventType]) -> bool {
        event_types.iter().any(|t| self.has_any(*t))
    }

    /// Whether a facade listens for any of the given event types
    pub fn facade_has_any_of(&self, facade: FacadeId, event_types: &[EventType]) -> bool {
        event_types.iter().any(|t| self.has(*t, facade))
    }

    /// Event types a facade currently listens for
    pub fn event_types_of(&self, facade: FacadeId) -> Vec<EventType> {
        self.by_type
            .iter()
            .filter(|(_, by_facade)| by_facade.contains_key(&facade))
            .map(|(event_type, _)| *event_type)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::cell::Cell;

    type Handler = Rc<dyn Fn()>;

    fn ids(n: usize) -> Vec<FacadeId> {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let id = ids(1)[0];
        let mut registry: EventRegistry<Handler> = EventRegistry::new();
        let handler: Handler = Rc::new(|| {});

        registry.add(EventType::Click, id, handler.clone());
        registry.add(EventType::Click, id, handler.clone());
        assert_eq!(registry.get(EventType::Click, id).unwrap().len(), 1);
    }

    #[test]
    fn test_second_distinct_handler_is_kept_in_order() {
        let id = ids(1)[0];
        let calls = Rc::new(Cell::new(0));
        let mut registry: EventRegistry<Handler> = EventRegistry::new();

        let c1 = calls.clone();
        let first: Handler = Rc::new(move || c1.set(c1.get() * 10 + 1));
        let c2 = calls.clone();
        let second: Handler = Rc::new(move || c2.set(c2.get() * 10 + 2));

        registry.add(EventType::MouseDown, id, first);
        registry.add(EventType::MouseDown, id, second);
        for handler in registry.get(EventType::MouseDown, id).unwrap() {
            handler();
        }
        assert_eq!(calls.get(), 12);
    }

    #[test]
    fn test_remove_prunes_empty_maps() {
        let id = ids(1)[0];
        let mut registry: EventRegistry<Handler> = EventRegistry::new();
        let handler: Handler = Rc::new(|| {});

        registry.add(EventType::Wheel, id, handler.clone());
        assert!(registry.has_any(EventType::Wheel));
        assert!(registry.remove(EventType::Wheel, id, &handler));
        assert!(!registry.has_any(EventType::Wheel));
        assert!(registry.is_empty());
        assert!(!registry.remove(EventType::Wheel, id, &handler));
    }

    #[test]
    fn test_remove_all_only_touches_one_facade() {
        let facades = ids(2);
        let mut registry: EventRegistry<Handler> = EventRegistry::new();
        let handler: Handler = Rc::new(|| {});

        registry.add(EventType::Click, facades[0], handler.clone());
        registry.add(EventType::MouseOver, facades[0], handler.clone());
        registry.add(EventType::Click, facades[1], handler.clone());

        registry.remove_all(facades[0]);
        assert!(registry.event_types_of(facades[0]).is_empty());
        assert!(registry.has(EventType::Click, facades[1]));
        assert!(!registry.has_any(EventType::MouseOver));
    }

    #[test]
    fn test_has_any_of_pointer_types() {
        let id = ids(1)[0];
        let mut registry: EventRegistry<Handler> = EventRegistry::new();
        assert!(!registry.has_any_of(&POINTER_EVENT_TYPES));

        registry.add(EventType::Custom("ping"), id, Rc::new(|| {}));
        assert!(!registry.has_any_of(&POINTER_EVENT_TYPES));

        registry.add(EventType::DragOver, id, Rc::new(|| {}));
        assert!(registry.has_any_of(&POINTER_EVENT_TYPES));
        assert!(registry.facade_has_any_of(id, &POINTER_EVENT_TYPES));
    }

    #[test]
    fn test_event_names_round_trip() {
        for t in POINTER_EVENT_TYPES {
            assert_eq!(EventType::from_name(t.name()).unwrap(), t);
        }
        assert!(EventType::from_name("keydown").is_err());
    }
}
