//! Heterogeneous storage keyed by type identity and an instance id.
//!
//! [`TypeMap`] owns one value per `(type, instance)` pair, type-erased behind
//! `dyn Any` and checked against the recorded [`TypeKey`] on retrieval. The
//! [`InstanceId`] discriminator lets several instances of the same type
//! coexist (per-tenant sinks, per-channel endpoints); its default slot is the
//! all-ones sentinel so enum-valued ids counting up from zero never collide
//! with it.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::error::MapError;
use crate::type_key::TypeKey;

/// Discriminator separating multiple instances of one type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The default slot. All-ones, so ids starting at 0 stay distinct.
    pub const DEFAULT: InstanceId = InstanceId(u64::MAX);

    /// An explicit id.
    pub const fn new(id: u64) -> Self {
        InstanceId(id)
    }

    /// The raw id value.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        InstanceId(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DEFAULT {
            f.write_str("default")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

struct Slot {
    key: TypeKey,
    value: Box<dyn Any + Send + Sync>,
}

/// Map from `(type hash, instance id)` to an owned value of that type.
#[derive(Default)]
pub struct TypeMap {
    slots: HashMap<(u32, InstanceId), Slot>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry exists under `(hash, id)`.
    pub fn contains(&self, hash: u32, id: InstanceId) -> bool {
        self.slots.contains_key(&(hash, id))
    }

    /// Looks up the entry for `T` at `id`.
    pub fn find<T: Send + Sync + 'static>(&self, id: InstanceId) -> Option<&T> {
        self.find_keyed(TypeKey::of::<T>(), id)
    }

    /// Looks up a `T` stored under an explicit key.
    pub fn find_keyed<T: Send + Sync + 'static>(&self, key: TypeKey, id: InstanceId) -> Option<&T> {
        self.slots
            .get(&(key.hash(), id))
            .and_then(|slot| slot.value.downcast_ref::<T>())
    }

    /// Stores `value` under its own type key.
    ///
    /// Fails with [`MapError::AlreadyPresent`] when the slot is taken.
    pub fn insert<T: Send + Sync + 'static>(
        &mut self,
        value: T,
        id: InstanceId,
    ) -> Result<&T, MapError> {
        self.insert_keyed(TypeKey::of::<T>(), value, id)
    }

    /// Stores `value` under an explicit key.
    ///
    /// The caller owns the association between `key` and `T`; retrieval
    /// re-checks it by downcast.
    pub fn insert_keyed<T: Send + Sync + 'static>(
        &mut self,
        key: TypeKey,
        value: T,
        id: InstanceId,
    ) -> Result<&T, MapError> {
        match self.slots.entry((key.hash(), id)) {
            Entry::Occupied(_) => Err(MapError::AlreadyPresent {
                type_name: key.name(),
                id,
            }),
            Entry::Vacant(vacant) => {
                let slot = vacant.insert(Slot {
                    key,
                    value: Box::new(value),
                });
                Ok(slot
                    .value
                    .downcast_ref::<T>()
                    .expect("freshly inserted slot holds the inserted type"))
            }
        }
    }

    /// Retrieves the `T` at `id`, verifying the stored identity.
    ///
    /// Fails with [`MapError::NotFound`] when the slot is empty and
    /// [`MapError::IdentityMismatch`] when the slot holds another type.
    pub fn get<T: Send + Sync + 'static>(&self, id: InstanceId) -> Result<&T, MapError> {
        let key = TypeKey::of::<T>();
        let slot = self
            .slots
            .get(&(key.hash(), id))
            .ok_or(MapError::NotFound {
                type_name: key.name(),
                id,
            })?;
        slot.value
            .downcast_ref::<T>()
            .ok_or(MapError::IdentityMismatch {
                expected: key.name(),
                found: slot.key.name(),
                id,
            })
    }

    /// Removes the entry under `(hash, id)`, dropping the stored value.
    pub fn remove(&mut self, hash: u32, id: InstanceId) -> bool {
        self.slots.remove(&(hash, id)).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find() {
        let mut map = TypeMap::new();
        map.insert(String::from("hello"), InstanceId::DEFAULT).unwrap();
        assert_eq!(
            map.find::<String>(InstanceId::DEFAULT).map(String::as_str),
            Some("hello")
        );
        assert!(map.contains(TypeKey::of::<String>().hash(), InstanceId::DEFAULT));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut map = TypeMap::new();
        map.insert(1u32, InstanceId::DEFAULT).unwrap();
        let err = map.insert(2u32, InstanceId::DEFAULT).unwrap_err();
        assert!(matches!(err, MapError::AlreadyPresent { .. }));
        assert_eq!(map.get::<u32>(InstanceId::DEFAULT).copied().unwrap(), 1);
    }

    #[test]
    fn missing_entry_reports_not_found() {
        let map = TypeMap::new();
        assert!(matches!(
            map.get::<u32>(InstanceId::DEFAULT),
            Err(MapError::NotFound { .. })
        ));
    }

    #[test]
    fn identity_self_check_catches_mismatched_keys() {
        let mut map = TypeMap::new();
        map.insert_keyed(TypeKey::of::<String>(), 7u32, InstanceId::DEFAULT)
            .unwrap();
        assert!(matches!(
            map.get::<String>(InstanceId::DEFAULT),
            Err(MapError::IdentityMismatch { .. })
        ));
    }

    #[test]
    fn instance_ids_separate_entries() {
        let mut map = TypeMap::new();
        map.insert(1u32, InstanceId::DEFAULT).unwrap();
        map.insert(2u32, InstanceId::new(0)).unwrap();
        map.insert(3u32, InstanceId::new(1)).unwrap();

        assert_eq!(map.get::<u32>(InstanceId::DEFAULT).copied().unwrap(), 1);
        assert_eq!(map.get::<u32>(InstanceId::new(0)).copied().unwrap(), 2);
        assert_eq!(map.get::<u32>(InstanceId::new(1)).copied().unwrap(), 3);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn default_slot_never_collides_with_numbered_ids() {
        assert_ne!(InstanceId::DEFAULT, InstanceId::new(0));
        assert_eq!(InstanceId::DEFAULT, InstanceId::from(u64::MAX));
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut map = TypeMap::new();
        map.insert(String::from("gone"), InstanceId::DEFAULT).unwrap();
        assert!(map.remove(TypeKey::of::<String>().hash(), InstanceId::DEFAULT));
        assert!(!map.remove(TypeKey::of::<String>().hash(), InstanceId::DEFAULT));
        assert!(map.is_empty());
    }
}
