use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Marker trait for types that can be stored as ECS components.
pub trait Component: 'static + Send + Sync {}

/// Blanket implementation: any `'static + Send + Sync` type is a valid component.
impl<T: 'static + Send + Sync> Component for T {}

/// Dense per-registry identifier for a component type. The first type a
/// registry sees gets 1.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentTypeId(u64);

impl ComponentTypeId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

/// Assigns component type ids lazily, the first time a type is named.
///
/// Ids are never reused and stay fixed for the lifetime of the owner. Only the
/// first assignment is synchronised; everything else about a registry still
/// needs external locking.
pub struct ComponentTypes {
    ids: RwLock<HashMap<TypeId, ComponentTypeId>>,
    next: AtomicU64,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    /// The id of `T`, assigning the next one if `T` has not been seen yet.
    pub fn id_of<T: Component>(&self) -> ComponentTypeId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.ids.read().get(&type_id) {
            return id;
        }
        *self
            .ids
            .write()
            .entry(type_id)
            .or_insert_with(|| ComponentTypeId(self.next.fetch_add(1, Ordering::Relaxed)))
    }

    /// The id of `T` if one has been assigned.
    pub fn get<T: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.read().get(&TypeId::of::<T>()).copied()
    }

    /// Number of distinct types that have an id.
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ComponentTypes {
    fn default() -> Self {
        Self::new()
    }
}
