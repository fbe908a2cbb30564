//! Facade identity

use slotmap::{new_key_type, Key};

new_key_type! {
    /// Stable identity of a live facade instance.
    ///
    /// Assigned once at construction and never reused while the instance
    /// lives; slotmap versioning keeps stale ids from aliasing new facades.
    pub struct FacadeId;
}

impl FacadeId {
    /// Convert to a raw u64 representation
    ///
    /// This is useful for storing ids in type-erased contexts, such as
    /// messages sent across the worker boundary.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation
    ///
    /// The raw value must have been created by `to_raw()` from a valid id.
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_raw_round_trip_preserves_identity() {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        let id = map.insert(());
        assert_eq!(FacadeId::from_raw(id.to_raw()), id);
    }

    #[test]
    fn test_removed_slot_gets_new_identity() {
        let mut map: SlotMap<FacadeId, ()> = SlotMap::with_key();
        let first = map.insert(());
        map.remove(first);
        let second = map.insert(());
        assert_ne!(first, second);
        assert!(!map.contains_key(first));
    }
}
