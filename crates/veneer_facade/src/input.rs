//! Pointer input normalization
//!
//! Hosts feed [`RawPointerEvent`]s (mouse, touch, wheel) into the world. The
//! router turns them into [`PointerEvent`]s, the uniform shape listeners see:
//! a single touch is projected onto the event's position so touch and mouse
//! look the same downstream.

use std::cell::Cell;
use std::rc::Rc;

use veneer_core::{EventType, FacadeId};

/// Mouse button identifier (matches platform)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

/// Keyboard modifiers held during the event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Opaque token separating independent interaction sources, such as
/// multiple pointers or views sharing one world
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventSource(pub u64);

/// Kind of raw platform input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEventKind {
    MouseMove,
    MouseDown,
    MouseUp,
    /// Native click; ignored, clicks are synthesized from taps
    Click,
    /// Native double click; ignored, double clicks are synthesized
    DoubleClick,
    Wheel,
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    /// Pointer left the surface
    Leave,
}

impl RawEventKind {
    pub fn is_touch(&self) -> bool {
        matches!(
            self,
            RawEventKind::TouchStart
                | RawEventKind::TouchMove
                | RawEventKind::TouchEnd
                | RawEventKind::TouchCancel
        )
    }
}

/// One active touch point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

/// Propagation flags shared with the host's native event
///
/// Clones share state, so a listener calling `stop_propagation` on the
/// synthetic event is visible to the host after dispatch.
#[derive(Clone, Debug, Default)]
pub struct NativeFlags {
    propagation_stopped: Rc<Cell<bool>>,
    default_prevented: Rc<Cell<bool>>,
}

impl NativeFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Platform pointer input as delivered by the host
#[derive(Clone, Debug)]
pub struct RawPointerEvent {
    pub kind: RawEventKind,
    pub x: f32,
    pub y: f32,
    pub button: MouseButton,
    /// Touches currently down
    pub touches: Vec<TouchPoint>,
    /// Touches that changed in this event (released ones for touch end)
    pub changed_touches: Vec<TouchPoint>,
    pub delta_x: f32,
    pub delta_y: f32,
    pub modifiers: Modifiers,
    pub timestamp_ms: f64,
    pub source: EventSource,
    pub native: Option<NativeFlags>,
}

impl RawPointerEvent {
    pub fn new(kind: RawEventKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            x,
            y,
            button: MouseButton::Left,
            touches: Vec::new(),
            changed_touches: Vec::new(),
            delta_x: 0.0,
            delta_y: 0.0,
            modifiers: Modifiers::default(),
            timestamp_ms: 0.0,
            source: EventSource::default(),
            native: None,
        }
    }

    /// Single-touch event; the touch is both current (unless lifted) and changed
    pub fn touch(kind: RawEventKind, id: u64, x: f32, y: f32) -> Self {
        let point = TouchPoint { id, x, y };
        let lifted = matches!(kind, RawEventKind::TouchEnd | RawEventKind::TouchCancel);
        Self {
            touches: if lifted { Vec::new() } else { vec![point] },
            changed_touches: vec![point],
            ..Self::new(kind, x, y)
        }
    }

    pub fn at(mut self, timestamp_ms: f64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn source(mut self, source: EventSource) -> Self {
        self.source = source;
        self
    }

    pub fn button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn delta(mut self, delta_x: f32, delta_y: f32) -> Self {
        self.delta_x = delta_x;
        self.delta_y = delta_y;
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn native(mut self, flags: NativeFlags) -> Self {
        self.native = Some(flags);
        self
    }

    /// More than one finger down
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }

    /// Pointer position, projecting a sole touch onto the event
    pub fn position(&self) -> (f32, f32) {
        let sole = match (self.touches.as_slice(), self.changed_touches.as_slice()) {
            ([touch], _) => Some(touch),
            ([], [touch]) => Some(touch),
            _ => None,
        };
        match sole {
            Some(touch) => (touch.x, touch.y),
            None => (self.x, self.y),
        }
    }
}

/// Synthetic event delivered to listeners
#[derive(Clone, Debug)]
pub struct PointerEvent {
    pub event_type: EventType,
    pub target: Option<FacadeId>,
    pub current_target: Option<FacadeId>,
    /// Facade being left or entered for over/out events, the dragged facade
    /// for drop
    pub related_target: Option<FacadeId>,
    pub x: f32,
    pub y: f32,
    pub button: MouseButton,
    pub delta_x: f32,
    pub delta_y: f32,
    pub modifiers: Modifiers,
    pub timestamp_ms: f64,
    pub source: EventSource,
    pub bubbles: bool,
    propagation_stopped: bool,
    default_prevented: bool,
    native: Option<NativeFlags>,
}

impl PointerEvent {
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            target: None,
            current_target: None,
            related_target: None,
            x: 0.0,
            y: 0.0,
            button: MouseButton::Left,
            delta_x: 0.0,
            delta_y: 0.0,
            modifiers: Modifiers::default(),
            timestamp_ms: 0.0,
            source: EventSource::default(),
            bubbles: true,
            propagation_stopped: false,
            default_prevented: false,
            native: None,
        }
    }

    /// Build a synthetic event of `event_type` from raw input
    pub fn from_raw(event_type: EventType, raw: &RawPointerEvent) -> Self {
        let (x, y) = raw.position();
        Self {
            x,
            y,
            button: raw.button,
            delta_x: raw.delta_x,
            delta_y: raw.delta_y,
            modifiers: raw.modifiers,
            timestamp_ms: raw.timestamp_ms,
            source: raw.source,
            native: raw.native.clone(),
            ..Self::new(event_type)
        }
    }

    pub fn with_related(mut self, related: Option<FacadeId>) -> Self {
        self.related_target = related;
        self
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    /// Stop bubbling after the current facade's listeners
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
        if let Some(native) = &self.native {
            native.stop_propagation();
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
        if let Some(native) = &self.native {
            native.prevent_default();
        }
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_touch_projects_position() {
        let raw = RawPointerEvent::touch(RawEventKind::TouchStart, 1, 40.0, 50.0);
        let event = PointerEvent::from_raw(EventType::MouseDown, &raw);
        assert_eq!((event.x, event.y), (40.0, 50.0));
    }

    #[test]
    fn test_touch_end_uses_changed_touch() {
        let mut raw = RawPointerEvent::touch(RawEventKind::TouchEnd, 1, 7.0, 8.0);
        raw.x = 0.0;
        raw.y = 0.0;
        assert!(raw.touches.is_empty());
        assert_eq!(raw.position(), (7.0, 8.0));
    }

    #[test]
    fn test_multi_touch_detected() {
        let mut raw = RawPointerEvent::touch(RawEventKind::TouchMove, 1, 0.0, 0.0);
        raw.touches.push(TouchPoint {
            id: 2,
            x: 5.0,
            y: 5.0,
        });
        assert!(raw.is_multi_touch());
    }

    #[test]
    fn test_flags_forward_to_native() {
        let flags = NativeFlags::new();
        let raw = RawPointerEvent::new(RawEventKind::MouseDown, 0.0, 0.0).native(flags.clone());
        let mut event = PointerEvent::from_raw(EventType::MouseDown, &raw);

        event.stop_propagation();
        event.prevent_default();
        assert!(event.propagation_stopped());
        assert!(flags.propagation_stopped());
        assert!(flags.default_prevented());
    }
}
