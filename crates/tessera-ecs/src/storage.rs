use std::any::Any;
use std::collections::HashMap;

use tessera_core::RegistryConfig;
use tracing::debug;

use crate::component::{Component, ComponentTypeId, ComponentTypes};
use crate::entity::Entity;
use crate::sparse_set::SparseSet;

/// Type-erased component storage interface.
pub(crate) trait ErasedStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn erase(&mut self, entity: Entity) -> bool;
    fn has(&self, entity: Entity) -> bool;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn component_name(&self) -> &'static str;
}

impl<T: Component> ErasedStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn erase(&mut self, entity: Entity) -> bool {
        SparseSet::erase(self, entity)
    }

    fn has(&self, entity: Entity) -> bool {
        SparseSet::has(self, entity)
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self)
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

fn downcast_ref<T: Component>(storage: &dyn ErasedStorage) -> &SparseSet<T> {
    storage
        .as_any()
        .downcast_ref::<SparseSet<T>>()
        .expect("component type mismatch")
}

fn downcast_mut<T: Component>(storage: &mut dyn ErasedStorage) -> &mut SparseSet<T> {
    storage
        .as_any_mut()
        .downcast_mut::<SparseSet<T>>()
        .expect("component type mismatch")
}

/// Owns one sparse set per component type, keyed by lazily assigned type id.
pub struct ComponentStorages {
    types: ComponentTypes,
    storages: HashMap<ComponentTypeId, Box<dyn ErasedStorage>>,
    config: RegistryConfig,
}

impl ComponentStorages {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            types: ComponentTypes::new(),
            storages: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn types(&self) -> &ComponentTypes {
        &self.types
    }

    /// The storage for `T`, created on first use.
    pub fn get_or_insert<T: Component>(&mut self) -> &mut SparseSet<T> {
        let id = self.types.id_of::<T>();
        let config = &self.config;
        let storage = self.storages.entry(id).or_insert_with(|| {
            debug!(
                "Created storage for '{}' ({:?})",
                std::any::type_name::<T>(),
                id
            );
            Box::new(SparseSet::<T>::with_config(config))
        });
        downcast_mut::<T>(&mut **storage)
    }

    /// The storage for `T` if it exists. Never creates one; `None` behaves as
    /// an empty storage.
    pub fn get<T: Component>(&self) -> Option<&SparseSet<T>> {
        let id = self.types.id_of::<T>();
        self.storages
            .get(&id)
            .map(|storage| downcast_ref::<T>(&**storage))
    }

    /// Mutable access to an existing storage for `T`.
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        let id = self.types.id_of::<T>();
        self.storages
            .get_mut(&id)
            .map(|storage| downcast_mut::<T>(&mut **storage))
    }

    /// Live component count for `T`; zero if it has no storage.
    pub fn len_of<T: Component>(&self) -> usize {
        self.get::<T>().map_or(0, SparseSet::len)
    }

    /// Erase `entity` from every storage. Returns how many components were dropped.
    pub fn erase_all(&mut self, entity: Entity) -> usize {
        self.storages
            .values_mut()
            .map(|storage| storage.erase(entity))
            .filter(|&erased| erased)
            .count()
    }

    /// Names of the components `entity` currently has, in no particular order.
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.storages
            .values()
            .filter(|storage| storage.has(entity))
            .map(|storage| storage.component_name())
            .collect()
    }

    /// Empty every storage, keeping the storages and their type ids.
    pub fn clear(&mut self) {
        for storage in self.storages.values_mut() {
            storage.clear();
        }
    }

    /// Number of component types with a storage.
    pub fn len(&self) -> usize {
        self.storages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storages.is_empty()
    }
}

impl Default for ComponentStorages {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);

    #[derive(Debug, PartialEq)]
    struct Armor(u32);

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn storage_created_lazily() {
        let mut storages = ComponentStorages::default();
        assert!(storages.get::<Health>().is_none());
        assert!(storages.is_empty());

        storages.get_or_insert::<Health>().emplace(e(1), Health(10)).unwrap();
        assert_eq!(storages.len(), 1);
        assert_eq!(storages.get::<Health>().unwrap().get(e(1)), Some(&Health(10)));
    }

    #[test]
    fn read_path_never_allocates() {
        let storages = ComponentStorages::default();
        assert!(storages.get::<Armor>().is_none());
        assert_eq!(storages.len_of::<Armor>(), 0);
        assert!(storages.is_empty());
        // The type still gets its identity.
        assert!(storages.types().get::<Armor>().is_some());
    }

    #[test]
    fn storages_use_config() {
        let mut storages = ComponentStorages::new(RegistryConfig::with_max_sparse_capacity(10));
        let set = storages.get_or_insert::<Health>();
        assert_eq!(set.max_capacity(), 10);
        assert_eq!(set.sparse_capacity(), 10);
        assert!(set.emplace(e(10), Health(1)).is_err());
    }

    #[test]
    fn erase_all_reaches_every_type() {
        let mut storages = ComponentStorages::default();
        storages.get_or_insert::<Health>().emplace(e(1), Health(1)).unwrap();
        storages.get_or_insert::<Armor>().emplace(e(1), Armor(2)).unwrap();
        storages.get_or_insert::<Armor>().emplace(e(2), Armor(3)).unwrap();

        assert_eq!(storages.component_names(e(1)).len(), 2);

        assert_eq!(storages.erase_all(e(1)), 2);
        assert_eq!(storages.erase_all(e(1)), 0);
        assert_eq!(storages.len_of::<Health>(), 0);
        assert_eq!(storages.len_of::<Armor>(), 1);
        assert!(storages.component_names(e(1)).is_empty());
    }

    #[test]
    fn clear_keeps_storages() {
        let mut storages = ComponentStorages::default();
        storages.get_or_insert::<Health>().emplace(e(3), Health(1)).unwrap();
        storages.clear();
        assert_eq!(storages.len(), 1);
        assert_eq!(storages.len_of::<Health>(), 0);
    }
}
