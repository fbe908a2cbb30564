//! Keyed child reconciliation
//!
//! Children are matched to descriptors by key. A descriptor without a key
//! gets a synthesized one, `auto:<type>:<n>`, where `n` counts descriptors of
//! that type within the current pass; a key already used in the pass gets
//! `|dupe` appended until it is unique.
//!
//! A matched child is reused only when its facade type and capabilities are
//! unchanged; otherwise it is destroyed and a fresh facade takes the key.
//! Children with no matching descriptor are destroyed, in their previous
//! order, after the new set is in place.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use veneer_core::FacadeId;

use crate::descriptor::Descriptor;
use crate::error::{FacadeError, Result};
use crate::world::World;

/// Synthesizes keys for one reconciliation pass
#[derive(Debug, Default)]
pub(crate) struct KeyAllocator {
    counters: FxHashMap<&'static str, usize>,
}

impl KeyAllocator {
    /// Key for `descriptor`, unique against `taken`
    pub(crate) fn allocate(&mut self, descriptor: &Descriptor, taken: impl Fn(&str) -> bool) -> String {
        let mut key = match &descriptor.key {
            Some(key) => key.clone(),
            None => {
                let name = descriptor.facade.name();
                let counter = self.counters.entry(name).or_insert(0);
                let key = format!("auto:{name}:{counter}");
                *counter += 1;
                key
            }
        };
        while taken(&key) {
            key.push_str("|dupe");
        }
        key
    }
}

#[derive(Debug, Default)]
struct ReconcileStats {
    created: usize,
    reused: usize,
    replaced: usize,
}

impl World {
    /// Reconcile `parent`'s children against `descriptors`. `None` entries
    /// are skipped.
    ///
    /// On error the children map is restored to every child still alive,
    /// matched or not, and nothing further is destroyed.
    pub(crate) fn reconcile_children(
        &mut self,
        parent: FacadeId,
        descriptors: Vec<Option<Descriptor>>,
    ) -> Result<()> {
        let mut previous = match self.nodes.get_mut(parent) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Err(FacadeError::UnknownFacade(parent)),
        };
        let mut next = IndexMap::with_capacity(descriptors.len());
        let mut stats = ReconcileStats::default();

        let result = self.place_children(parent, descriptors, &mut previous, &mut next, &mut stats);

        if let Err(err) = result {
            next.extend(previous);
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children = next;
            }
            return Err(err);
        }

        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = next;
        }
        let removed = previous.len();
        for (_, id) in previous {
            self.destroy_node(id, false);
        }

        tracing::trace!(
            ?parent,
            created = stats.created,
            reused = stats.reused,
            replaced = stats.replaced,
            removed,
            "reconciled children"
        );
        Ok(())
    }

    fn place_children(
        &mut self,
        parent: FacadeId,
        descriptors: Vec<Option<Descriptor>>,
        previous: &mut IndexMap<String, FacadeId>,
        next: &mut IndexMap<String, FacadeId>,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let mut keys = KeyAllocator::default();

        for descriptor in descriptors.into_iter().flatten() {
            let key = keys.allocate(&descriptor, |key| next.contains_key(key));

            let reused = match previous.shift_remove(&key) {
                Some(id) if self.can_reuse(id, &descriptor) => Some(id),
                Some(stale) => {
                    self.destroy_node(stale, false);
                    stats.replaced += 1;
                    None
                }
                None => None,
            };

            let id = match reused {
                Some(id) => {
                    stats.reused += 1;
                    id
                }
                None => {
                    stats.created += 1;
                    self.create_node(parent, key.clone(), &descriptor)
                }
            };
            next.insert(key, id);
            self.apply_descriptor(id, descriptor)?;
        }
        Ok(())
    }

    fn can_reuse(&self, id: FacadeId, descriptor: &Descriptor) -> bool {
        self.nodes.get(id).is_some_and(|node| {
            node.facade_type == descriptor.facade
                && node.capabilities == descriptor.capabilities()
                && !node.is_exiting
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::Group;

    #[test]
    fn test_auto_keys_count_per_type() {
        let mut keys = KeyAllocator::default();
        let group = Descriptor::of::<Group>();
        assert_eq!(keys.allocate(&group, |_| false), "auto:Group:0");
        assert_eq!(keys.allocate(&group, |_| false), "auto:Group:1");
    }

    #[test]
    fn test_collisions_get_dupe_suffix() {
        let mut keys = KeyAllocator::default();
        let desc = Descriptor::of::<Group>().key("a");
        let taken = ["a", "a|dupe"];
        assert_eq!(
            keys.allocate(&desc, |key| taken.contains(&key)),
            "a|dupe|dupe"
        );
    }
}
