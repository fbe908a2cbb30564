//! The facade contract
//!
//! A facade is a retained node that mediates between declarative descriptors
//! and whatever object it stands in front of. The [`World`](crate::World)
//! owns every facade; a facade only sees its own state plus a [`FacadeCx`]
//! through which it can post messages upward.
//!
//! ```text
//! descriptor ──► World::apply ──► Facade::set (per prop)
//!                               └► Facade::after_update(cx)
//!                                       │
//!                                       ▼
//!                              cx.notify_world(msg) ──► handler ancestor / World
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use veneer_core::{FacadeId, Props, Value};

use crate::error::{FacadeError, Result};
use crate::world::WorldMessage;

/// Downcasting support for facades
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Whether a message handler consumed a message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    /// Stop here
    Handled,
    /// Forward to the next handler up the chain, or the world root
    Continue,
}

/// A node in the facade tree
pub trait Facade: AsAny {
    /// Short type name, used in synthesized keys and diagnostics
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Current value of a property, if the facade can report it
    fn get(&self, name: &str) -> Option<Value>;

    /// Write a property
    fn set(&mut self, name: &str, value: Value) -> Result<()>;

    /// Whether `get` can report `name`. Transitions and pointer-state
    /// overlays are only allowed on readable properties.
    fn can_read(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Called once per update batch after all property writes
    fn after_update(&mut self, _cx: &mut FacadeCx) {}

    /// Whether hit tests may select this facade
    fn is_pointer_target(&self) -> bool {
        false
    }

    /// Whether this facade intercepts messages posted by its descendants
    fn handles_world_messages(&self) -> bool {
        false
    }

    /// Receive a message posted by a descendant. Only called when
    /// `handles_world_messages` returns true.
    fn on_notify_world(
        &mut self,
        _cx: &mut FacadeCx,
        _source: FacadeId,
        _message: &WorldMessage,
    ) -> Propagation {
        Propagation::Continue
    }

    /// Called once when the facade is torn down
    fn destroy(&mut self, _cx: &mut FacadeCx) {}
}

pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn construct<T: Facade + Default + 'static>() -> Box<dyn Facade> {
    Box::new(T::default())
}

/// Identity of an authored facade type
#[derive(Clone, Copy)]
pub struct FacadeType {
    type_id: TypeId,
    name: &'static str,
    construct: fn() -> Box<dyn Facade>,
}

impl FacadeType {
    pub fn of<T: Facade + Default + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            construct: construct::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn construct(&self) -> Box<dyn Facade> {
        (self.construct)()
    }
}

impl PartialEq for FacadeType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for FacadeType {}

impl fmt::Debug for FacadeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FacadeType").field(&self.name).finish()
    }
}

/// Context handed to facade hooks
///
/// Messages posted here are delivered by the world after the hook returns.
pub struct FacadeCx {
    id: FacadeId,
    now_ms: f64,
    outbox: Vec<WorldMessage>,
}

impl FacadeCx {
    pub(crate) fn new(id: FacadeId, now_ms: f64) -> Self {
        Self {
            id,
            now_ms,
            outbox: Vec::new(),
        }
    }

    /// Id of the facade the hook runs for
    pub fn id(&self) -> FacadeId {
        self.id
    }

    /// Animation clock time of the current pass
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Post a message up the ownership chain
    pub fn notify_world(&mut self, message: WorldMessage) {
        self.outbox.push(message);
    }

    pub fn request_render(&mut self) {
        self.notify_world(WorldMessage::NeedsRender);
    }

    /// Layout-affecting state changed; coalesced into one recompute
    pub fn request_layout(&mut self) {
        self.notify_world(WorldMessage::LayoutChanged);
    }

    pub(crate) fn into_messages(self) -> Vec<WorldMessage> {
        self.outbox
    }
}

/// Plain container facade that stores whatever it is given.
///
/// Also used for the world's root node.
#[derive(Debug, Default)]
pub struct Group {
    props: Props,
}

impl Group {
    pub fn props(&self) -> &Props {
        &self.props
    }
}

impl Facade for Group {
    fn get(&self, name: &str) -> Option<Value> {
        self.props.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        self.props.insert(name.to_string(), value);
        Ok(())
    }

    fn can_read(&self, _name: &str) -> bool {
        true
    }
}

/// Read a number-valued property, for facades that validate their inputs
pub fn number_prop(name: &str, value: &Value) -> Result<f64> {
    value.as_number().ok_or_else(|| FacadeError::InvalidValue {
        property: name.to_string(),
        reason: format!("expected number, got {}", value.kind()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Widget;

    impl Facade for Widget {
        fn get(&self, _name: &str) -> Option<Value> {
            None
        }

        fn set(&mut self, name: &str, _value: Value) -> Result<()> {
            Err(FacadeError::UnknownProperty {
                facade: self.type_name(),
                property: name.to_string(),
            })
        }
    }

    #[test]
    fn test_facade_type_identity() {
        assert_eq!(FacadeType::of::<Widget>(), FacadeType::of::<Widget>());
        assert_ne!(FacadeType::of::<Widget>(), FacadeType::of::<Group>());
        assert_eq!(FacadeType::of::<Widget>().name(), "Widget");
    }

    #[test]
    fn test_constructed_facade_downcasts() {
        let facade = FacadeType::of::<Group>().construct();
        assert!(facade.as_ref().as_any().downcast_ref::<Group>().is_some());
        assert_eq!(facade.type_name(), "Group");
    }

    #[test]
    fn test_cx_collects_messages() {
        let mut cx = FacadeCx::new(FacadeId::default(), 12.0);
        cx.request_render();
        cx.request_layout();
        assert_eq!(cx.now_ms(), 12.0);
        assert_eq!(cx.into_messages().len(), 2);
    }

    #[test]
    fn test_number_prop_rejects_text() {
        assert!(number_prop("x", &Value::from("wide")).is_err());
        assert_eq!(number_prop("x", &Value::from(2.0)).unwrap(), 2.0);
    }
}
