use tessera_core::RegistryConfig;
use tracing::{trace, warn};

use crate::component::{Component, ComponentTypeId};
use crate::entity::{Entity, EntityAllocator};
use crate::error::EcsError;
use crate::query::ComponentSet;
use crate::sparse_set::SparseSet;
use crate::storage::ComponentStorages;

/// The central ECS container. Owns all entities and their components.
///
/// Not internally synchronised; wrap it in a [`SharedRegistry`](crate::SharedRegistry)
/// to use it from several threads.
pub struct Registry {
    pub(crate) entities: EntityAllocator,
    pub(crate) components: ComponentStorages,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            entities: EntityAllocator::new(),
            components: ComponentStorages::new(config),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        self.components.config()
    }

    // ---- Entity management ----

    /// Create a new entity with no components. Recently removed ids are reused first.
    pub fn new_entity(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Remove an entity and every component attached to it.
    ///
    /// Visits each registered component type, so the cost grows with the
    /// number of types rather than the entity's components. Returns `true` if
    /// the entity was alive; only then is its id recycled.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let dropped = self.components.erase_all(entity);
        let was_alive = self.entities.deallocate(entity);
        trace!("Removed entity {entity} ({dropped} components, alive: {was_alive})");
        was_alive
    }

    /// Check whether an entity id is currently allocated.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterate over all alive entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    // ---- Component management ----

    /// Attach a component, replacing any existing component of the same type.
    ///
    /// The entity does not have to come from [`Registry::new_entity`]. Fails
    /// with [`EcsError::CapacityExceeded`] if its id is beyond the configured
    /// sparse capacity, in which case nothing is changed.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<(), EcsError> {
        let max = self.components.config().max_sparse_capacity;
        if let Err(err) = SparseSet::<T>::ensure_fits(entity, max) {
            warn!("Rejected component: {err}");
            return Err(err);
        }
        self.components.get_or_insert::<T>().emplace(entity, component)
    }

    /// Detach a component. Returns `true` if it was present.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.components
            .get_mut::<T>()
            .is_some_and(|storage| storage.erase(entity))
    }

    /// Check whether an entity has a component of the given type.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.components
            .get::<T>()
            .is_some_and(|storage| storage.has(entity))
    }

    /// Check whether an entity has every component in `Q`, e.g. `(Position, Velocity)`.
    pub fn has_all<Q: ComponentSet>(&self, entity: Entity) -> bool {
        Q::has_all(&self.components, entity)
    }

    /// Get a component the caller knows is present.
    ///
    /// # Panics
    /// If the entity has no `T`. Use [`Registry::try_get_component`] when
    /// absence is possible.
    pub fn get_component<T: Component>(&self, entity: Entity) -> &T {
        match self.components.get::<T>() {
            Some(storage) => &storage[entity],
            None => panic!(
                "entity {entity} has no '{}' component",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Mutable form of [`Registry::get_component`].
    ///
    /// # Panics
    /// If the entity has no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.components.get_mut::<T>() {
            Some(storage) => &mut storage[entity],
            None => panic!(
                "entity {entity} has no '{}' component",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Get a component if the entity has one.
    pub fn try_get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.components.get::<T>()?.get(entity)
    }

    /// Get a mutable reference to a component if the entity has one.
    pub fn try_get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.get_mut::<T>()?.get_mut(entity)
    }

    // ---- Storage introspection ----

    /// The storage for `T`, if any component of that type was ever added.
    pub fn storage<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.components.get::<T>()
    }

    /// Iterate over every `(entity, &T)` in dense order. Useful for snapshots.
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.components
            .get::<T>()
            .into_iter()
            .flat_map(|storage| storage.iter())
    }

    /// Number of entities that have a `T`.
    pub fn component_count<T: Component>(&self) -> usize {
        self.components.len_of::<T>()
    }

    /// Number of component types with a storage.
    pub fn component_type_count(&self) -> usize {
        self.components.len()
    }

    /// This registry's id for `T`, assigned on first use.
    pub fn component_type_id<T: Component>(&self) -> ComponentTypeId {
        self.components.types().id_of::<T>()
    }

    /// Names of the components attached to `entity`, in no particular order.
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        self.components.component_names(entity)
    }

    // ---- Queries ----

    /// Visit every entity that has a `T`, in dense order. Returns the number visited.
    pub fn each<T: Component>(&self, mut visitor: impl FnMut(Entity, &T)) -> usize {
        let Some(storage) = self.components.get::<T>() else {
            return 0;
        };
        for (entity, component) in storage.iter() {
            visitor(entity, component);
        }
        storage.len()
    }

    /// Visit every entity that has a `T` with mutable access. Returns the number visited.
    pub fn each_mut<T: Component>(&mut self, mut visitor: impl FnMut(Entity, &mut T)) -> usize {
        let Some(storage) = self.components.get_mut::<T>() else {
            return 0;
        };
        for (entity, component) in storage.iter_mut() {
            visitor(entity, component);
        }
        storage.len()
    }

    /// Visit every entity that has all components in `Q`. Returns the number of matches.
    ///
    /// Iteration is driven by the smallest storage in `Q` (the first one named
    /// on a tie), so order follows that storage's dense layout.
    ///
    /// # Example
    /// ```ignore
    /// registry.view::<(Position, Velocity)>(|entity, (pos, vel)| {
    ///     // ...
    /// });
    /// ```
    pub fn view<'w, Q: ComponentSet>(
        &'w self,
        visitor: impl FnMut(Entity, Q::Refs<'w>),
    ) -> usize {
        Q::view(&self.components, visitor)
    }

    /// Like [`Registry::view`] with mutable access to the components.
    ///
    /// # Panics
    /// If `Q` names the same component type twice.
    pub fn view_mut<'w, Q: ComponentSet>(
        &'w mut self,
        visitor: impl FnMut(Entity, Q::Muts<'w>),
    ) -> usize {
        Q::view_mut(&mut self.components, visitor)
    }

    /// Remove every entity and component. Component type ids are kept.
    pub fn clear(&mut self) {
        self.components.clear();
        self.entities = EntityAllocator::new();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
