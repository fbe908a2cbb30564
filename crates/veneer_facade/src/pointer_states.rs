//! Hover and active overlays
//!
//! A facade with `pointer_states` shows alternate property values while the
//! pointer hovers it or presses it, without losing the values its descriptor
//! assigned. The layer keeps the assigned ("base") value of every overlaid
//! property and decides what is displayed:
//!
//! ```text
//! displayed = base ⊕ hover (while hovering) ⊕ active (while pressed)
//! ```
//!
//! Base writes to a property that is currently overlaid are stored but not
//! displayed until the overlay lets go of it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use veneer_core::{EventType, Props, Value};

use crate::error::{FacadeError, Result};
use crate::facade::Facade;

/// Overlay values per pointer state
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerStates {
    pub hover: Option<Props>,
    pub active: Option<Props>,
}

impl PointerStates {
    fn property_names(&self) -> impl Iterator<Item = &String> {
        self.hover
            .iter()
            .chain(self.active.iter())
            .flat_map(|props| props.keys())
    }
}

/// What an internal pointer listener does to the state flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerStateAction {
    Enter,
    Leave,
    Press,
    Release,
}

impl PointerStateAction {
    /// Internal listeners installed on every pointer-state facade
    pub(crate) const LISTENERS: [(EventType, PointerStateAction); 4] = [
        (EventType::MouseOver, PointerStateAction::Enter),
        (EventType::MouseOut, PointerStateAction::Leave),
        (EventType::MouseDown, PointerStateAction::Press),
        (EventType::MouseUp, PointerStateAction::Release),
    ];
}

/// Per-instance pointer-state capability
#[derive(Debug, Default)]
pub(crate) struct PointerStateLayer {
    spec: PointerStates,
    hovering: bool,
    active: bool,
    /// Assigned value of every property the overlays mention
    base: Props,
    /// Properties currently showing an overlay value, and that value
    applied: IndexMap<String, Value>,
}

impl PointerStateLayer {
    /// Adopt a new spec, capturing the base value of newly mentioned
    /// properties from the facade
    pub(crate) fn configure(&mut self, spec: PointerStates, facade: &dyn Facade) -> Result<()> {
        for name in spec.property_names() {
            if self.base.contains_key(name) {
                continue;
            }
            if !facade.can_read(name) {
                return Err(FacadeError::PropertyNotReadable {
                    facade: facade.type_name(),
                    property: name.clone(),
                });
            }
            let value = facade.get(name).unwrap_or(Value::Null);
            self.base.insert(name.clone(), value);
        }
        self.spec = spec;
        Ok(())
    }

    /// Route a base write. Returns the value to display now, or `None` while
    /// an overlay holds the property.
    pub(crate) fn intercept(&mut self, name: &str, value: Value) -> Option<Value> {
        if let Some(base) = self.base.get_mut(name) {
            *base = value.clone();
            if self.applied.contains_key(name) {
                return None;
            }
        }
        Some(value)
    }

    /// Apply a listener action. Returns true when a flag changed.
    pub(crate) fn apply_action(&mut self, action: PointerStateAction) -> bool {
        let before = (self.hovering, self.active);
        match action {
            PointerStateAction::Enter => self.hovering = true,
            PointerStateAction::Leave => {
                self.hovering = false;
                self.active = false;
            }
            PointerStateAction::Press => self.active = true,
            PointerStateAction::Release => self.active = false,
        }
        before != (self.hovering, self.active)
    }

    pub(crate) fn is_hovering(&self) -> bool {
        self.hovering
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    fn overlay(&self) -> Props {
        let mut overlay = Props::new();
        if self.hovering {
            if let Some(hover) = &self.spec.hover {
                overlay.extend(hover.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        if self.active {
            if let Some(active) = &self.spec.active {
                overlay.extend(active.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        overlay
    }

    /// Writes needed to bring the display in line with the current flags:
    /// new or changed overlay values, and base values for properties the
    /// overlay released
    pub(crate) fn reconcile(&mut self) -> Vec<(String, Value)> {
        let overlay = self.overlay();
        let mut writes = Vec::new();

        let released: Vec<String> = self
            .applied
            .keys()
            .filter(|name| !overlay.contains_key(*name))
            .cloned()
            .collect();
        for name in released {
            self.applied.shift_remove(&name);
            if let Some(base) = self.base.get(&name) {
                writes.push((name, base.clone()));
            }
        }

        for (name, value) in overlay {
            if self.applied.get(&name) != Some(&value) {
                self.applied.insert(name.clone(), value.clone());
                writes.push((name, value));
            }
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Group;

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

    fn props(pairs: &[(&str, f64)]) -> Props {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn group_with(pairs: &[(&str, f64)]) -> Group {
        let mut group = Group::default();
        for (k, v) in pairs {
            group.set(k, Value::from(*v)).unwrap();
        }
        group
    }

    #[test]
    fn test_unreadable_property_is_rejected() {
        let mut layer = PointerStateLayer::default();
        let spec = PointerStates {
            hover: Some(props(&[("glow", 1.0)])),
            active: None,
        };
        let err = layer.configure(spec, &WriteOnly).unwrap_err();
        assert!(matches!(err, FacadeError::PropertyNotReadable { .. }));
    }

    #[test]
    fn test_active_overrides_hover_overrides_base() {
        let mut layer = PointerStateLayer::default();
        let spec = PointerStates {
            hover: Some(props(&[("scale", 1.1), ("opacity", 0.9)])),
            active: Some(props(&[("scale", 0.95)])),
        };
        layer
            .configure(spec, &group_with(&[("scale", 1.0), ("opacity", 1.0)]))
            .unwrap();

        assert!(layer.apply_action(PointerStateAction::Enter));
        let writes = layer.reconcile();
        assert_eq!(
            writes,
            vec![
                ("scale".to_string(), Value::from(1.1)),
                ("opacity".to_string(), Value::from(0.9)),
            ]
        );

        layer.apply_action(PointerStateAction::Press);
        assert_eq!(
            layer.reconcile(),
            vec![("scale".to_string(), Value::from(0.95))]
        );

        // Leaving clears both flags and restores base values
        layer.apply_action(PointerStateAction::Leave);
        let restored: Props = layer.reconcile().into_iter().collect();
        assert_eq!(restored, props(&[("scale", 1.0), ("opacity", 1.0)]));
    }

    #[test]
    fn test_base_write_held_while_overlaid() {
        let mut layer = PointerStateLayer::default();
        let spec = PointerStates {
            hover: Some(props(&[("x", 5.0)])),
            active: None,
        };
        layer.configure(spec, &group_with(&[("x", 0.0)])).unwrap();

        layer.apply_action(PointerStateAction::Enter);
        layer.reconcile();
        assert_eq!(layer.intercept("x", Value::from(2.0)), None);
        assert_eq!(layer.intercept("y", Value::from(3.0)), Some(Value::from(3.0)));

        layer.apply_action(PointerStateAction::Leave);
        assert_eq!(layer.reconcile(), vec![("x".to_string(), Value::from(2.0))]);
    }

    #[test]
    fn test_repeated_action_reports_no_change() {
        let mut layer = PointerStateLayer::default();
        assert!(layer.apply_action(PointerStateAction::Enter));
        assert!(!layer.apply_action(PointerStateAction::Enter));
        assert!(layer.is_hovering());
        assert!(!layer.is_active());
    }
}
