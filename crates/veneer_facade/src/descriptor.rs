//! Descriptors
//!
//! A descriptor is the transient, declarative description of one facade for
//! one update pass. It is consumed by the world and never retained as live
//! state.
//!
//! # Example
//!
//! ```rust
//! use veneer_facade::{Descriptor, Group};
//! use veneer_animation::TransitionSpec;
//! use veneer_core::Props;
//!
//! let card = Descriptor::of::<Group>()
//!     .key("card")
//!     .prop("x", 10.0)
//!     .transition("x", TransitionSpec::timed(300.0))
//!     .hover(Props::from_iter([("scale".to_string(), 1.1.into())]))
//!     .child(Descriptor::of::<Group>().prop("label", "hello"));
//! assert!(card.capabilities().animatable);
//! assert!(card.capabilities().pointer_states);
//! ```

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use veneer_animation::{AnimationSpec, TransitionSpec};
use veneer_core::{EventType, FacadeId, Props, Value};

use crate::facade::{Facade, FacadeType};
use crate::input::PointerEvent;
use crate::layout::LayoutStyle;
use crate::pointer_states::PointerStates;

/// Listener callback attached through a descriptor
pub type EventCallback = Rc<dyn Fn(&mut PointerEvent)>;

/// Called with `Some(id)` once a facade is live and `None` when it goes away
/// or the callback is replaced
pub type RefCallback = Rc<dyn Fn(Option<FacadeId>)>;

/// Computes a list item's key from its datum and index
pub type ItemKeyFn = Rc<dyn Fn(&Value, usize) -> String>;

/// Builds a list item's descriptor from its datum and index
pub type ItemTemplateFn = Rc<dyn Fn(&Value, usize) -> Option<Descriptor>>;

/// Behaviour layers a facade instance carries on top of its type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Has transitions, keyframe animations or an exit animation
    pub animatable: bool,
    /// Has hover/active overlays
    pub pointer_states: bool,
}

/// Children of a descriptor
#[derive(Clone)]
pub enum Children {
    /// Explicit child descriptors; `None` entries are holes
    Tree(Vec<Option<Descriptor>>),
    /// One child per datum, built by a template
    List(ListDescriptor),
}

/// Data-driven children
#[derive(Clone)]
pub struct ListDescriptor {
    pub data: Vec<Value>,
    pub key: Option<ItemKeyFn>,
    pub template: ItemTemplateFn,
}

impl ListDescriptor {
    pub fn new<F>(data: Vec<Value>, template: F) -> Self
    where
        F: Fn(&Value, usize) -> Option<Descriptor> + 'static,
    {
        Self {
            data,
            key: None,
            template: Rc::new(template),
        }
    }

    pub fn item_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&Value, usize) -> String + 'static,
    {
        self.key = Some(Rc::new(key));
        self
    }

    /// Expand into one descriptor per datum. An explicit key on the templated
    /// descriptor beats the item key function.
    pub fn expand(&self) -> Vec<Option<Descriptor>> {
        self.data
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut descriptor = (self.template)(item, index)?;
                if descriptor.key.is_none() {
                    if let Some(key_fn) = &self.key {
                        descriptor.key = Some(key_fn(item, index));
                    }
                }
                Some(descriptor)
            })
            .collect()
    }
}

/// Declarative description of one facade
#[derive(Clone)]
pub struct Descriptor {
    pub facade: FacadeType,
    pub key: Option<String>,
    /// Own properties, applied in insertion order
    pub props: Props,
    pub children: Option<Children>,
    pub transition: Option<IndexMap<String, TransitionSpec>>,
    pub animation: Option<Vec<AnimationSpec>>,
    pub exit_animation: Option<AnimationSpec>,
    pub pointer_states: Option<PointerStates>,
    pub listeners: Vec<(EventType, EventCallback)>,
    pub ref_cb: Option<RefCallback>,
    /// Explicit pointer-event opt in or out; implicit when unset
    pub pointer_events: Option<bool>,
    pub layout: Option<LayoutStyle>,
}

impl Descriptor {
    pub fn new(facade: FacadeType) -> Self {
        Self {
            facade,
            key: None,
            props: Props::new(),
            children: None,
            transition: None,
            animation: None,
            exit_animation: None,
            pointer_states: None,
            listeners: Vec::new(),
            ref_cb: None,
            pointer_events: None,
            layout: None,
        }
    }

    pub fn of<T: Facade + Default + 'static>() -> Self {
        Self::new(FacadeType::of::<T>())
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props(mut self, props: Props) -> Self {
        self.props.extend(props);
        self
    }

    /// Append a child; switches list children back to tree children
    pub fn child(mut self, child: Descriptor) -> Self {
        match &mut self.children {
            Some(Children::Tree(children)) => children.push(Some(child)),
            _ => self.children = Some(Children::Tree(vec![Some(child)])),
        }
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Option<Descriptor>>) -> Self {
        self.children = Some(Children::Tree(children.into_iter().collect()));
        self
    }

    pub fn list(mut self, list: ListDescriptor) -> Self {
        self.children = Some(Children::List(list));
        self
    }

    pub fn transition(mut self, property: impl Into<String>, spec: TransitionSpec) -> Self {
        self.transition
            .get_or_insert_with(IndexMap::new)
            .insert(property.into(), spec);
        self
    }

    pub fn animation(mut self, spec: AnimationSpec) -> Self {
        self.animation.get_or_insert_with(Vec::new).push(spec);
        self
    }

    pub fn exit_animation(mut self, spec: AnimationSpec) -> Self {
        self.exit_animation = Some(spec);
        self
    }

    pub fn hover(mut self, props: Props) -> Self {
        self.pointer_states.get_or_insert_with(PointerStates::default).hover = Some(props);
        self
    }

    pub fn active(mut self, props: Props) -> Self {
        self.pointer_states.get_or_insert_with(PointerStates::default).active = Some(props);
        self
    }

    pub fn on<F>(mut self, event_type: EventType, callback: F) -> Self
    where
        F: Fn(&mut PointerEvent) + 'static,
    {
        self.listeners.push((event_type, Rc::new(callback)));
        self
    }

    /// Attach an already shared callback; reusing the same `Rc` across
    /// passes keeps the registration stable
    pub fn listener(mut self, event_type: EventType, callback: EventCallback) -> Self {
        self.listeners.push((event_type, callback));
        self
    }

    pub fn on_ref(mut self, callback: RefCallback) -> Self {
        self.ref_cb = Some(callback);
        self
    }

    pub fn pointer_events(mut self, enabled: bool) -> Self {
        self.pointer_events = Some(enabled);
        self
    }

    pub fn layout(mut self, style: LayoutStyle) -> Self {
        self.layout = Some(style);
        self
    }

    /// Capability layers this descriptor requires
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            animatable: self.transition.is_some()
                || self.animation.is_some()
                || self.exit_animation.is_some(),
            pointer_states: self.pointer_states.is_some(),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("facade", &self.facade)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("capabilities", &self.capabilities())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Group;

    #[test]
    fn test_plain_descriptor_has_no_capabilities() {
        let desc = Descriptor::of::<Group>().prop("x", 1.0);
        assert_eq!(desc.capabilities(), Capabilities::default());
    }

    #[test]
    fn test_exit_animation_alone_makes_animatable() {
        let desc = Descriptor::of::<Group>().exit_animation(AnimationSpec::new(100.0));
        assert!(desc.capabilities().animatable);
        assert!(!desc.capabilities().pointer_states);
    }

    #[test]
    fn test_list_expansion_uses_item_keys() {
        let list = ListDescriptor::new(
            vec![Value::from("a"), Value::Null, Value::from("c")],
            |item, _| {
                (!item.is_null()).then(|| Descriptor::of::<Group>().prop("label", item.clone()))
            },
        )
        .item_key(|item, index| format!("{}-{index}", item.as_text().unwrap_or("")));

        let expanded = list.expand();
        assert_eq!(expanded.len(), 3);
        assert!(expanded[1].is_none());
        assert_eq!(expanded[0].as_ref().unwrap().key.as_deref(), Some("a-0"));
        assert_eq!(expanded[2].as_ref().unwrap().key.as_deref(), Some("c-2"));
    }

    #[test]
    fn test_explicit_template_key_wins() {
        let list = ListDescriptor::new(vec![Value::from(1.0)], |_, _| {
            Some(Descriptor::of::<Group>().key("fixed"))
        })
        .item_key(|_, index| index.to_string());
        assert_eq!(list.expand()[0].as_ref().unwrap().key.as_deref(), Some("fixed"));
    }

    #[test]
    fn test_props_keep_insertion_order() {
        let desc = Descriptor::of::<Group>()
            .prop("b", 1.0)
            .prop("a", 2.0)
            .prop("c", 3.0);
        let names: Vec<&str> = desc.props.keys().map(String::as_str).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
