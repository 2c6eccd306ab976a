use std::ops::{Index, IndexMut};

use tessera_core::RegistryConfig;

use crate::component::Component;
use crate::entity::Entity;
use crate::error::EcsError;

/// Sparse slot marker for "no component".
const ABSENT: usize = usize::MAX;

/// Sparse-set storage for a single component type. Provides O(1) insert/remove/lookup
/// and dense iteration.
///
/// Removal swaps the last entry into the hole, so dense order changes whenever
/// something is erased.
pub struct SparseSet<T> {
    /// Maps entity id → dense index, or `ABSENT`.
    sparse: Vec<usize>,
    /// Packed component values, live in `[0, len)`.
    dense: Vec<T>,
    /// Owning entity of each dense slot.
    entities: Vec<Entity>,
    /// Upper bound on `sparse.len()`.
    max_capacity: usize,
}

impl<T: Component> SparseSet<T> {
    /// An empty set sized by the default configuration.
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            sparse: vec![ABSENT; config.effective_initial_capacity()],
            dense: Vec::new(),
            entities: Vec::new(),
            max_capacity: config.max_sparse_capacity,
        }
    }

    /// Check that `entity` can be stored under a sparse limit of `max_capacity`,
    /// returning its sparse index.
    pub fn ensure_fits(entity: Entity, max_capacity: usize) -> Result<usize, EcsError> {
        usize::try_from(entity.id())
            .ok()
            .filter(|&index| index < max_capacity)
            .ok_or(EcsError::CapacityExceeded {
                entity: entity.id(),
                required: entity.id().saturating_add(1),
                max: max_capacity,
                component: std::any::type_name::<T>(),
            })
    }

    pub(crate) fn dense_index(&self, entity: Entity) -> Option<usize> {
        let index = usize::try_from(entity.id()).ok()?;
        let dense_index = *self.sparse.get(index)?;
        (dense_index < self.dense.len() && self.entities[dense_index] == entity)
            .then_some(dense_index)
    }

    /// Whether `entity` has a component in this set.
    pub fn has(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Insert a component, or overwrite the existing one in place.
    ///
    /// Fails without touching the set if the entity id does not fit under the
    /// sparse capacity limit.
    pub fn emplace(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        if let Some(dense_index) = self.dense_index(entity) {
            self.dense[dense_index] = value;
            return Ok(());
        }

        let index = Self::ensure_fits(entity, self.max_capacity)?;
        if index >= self.sparse.len() {
            let new_len = (self.sparse.len() * 2)
                .max(index + 1)
                .min(self.max_capacity);
            self.sparse.resize(new_len, ABSENT);
        }

        self.sparse[index] = self.dense.len();
        self.dense.push(value);
        self.entities.push(entity);
        Ok(())
    }

    /// Remove an entity's component. Returns `true` if it was present.
    pub fn erase(&mut self, entity: Entity) -> bool {
        let Some(dense_index) = self.dense_index(entity) else {
            return false;
        };
        // `dense_index` succeeded, so the id fits in `usize`.
        let index = entity.id() as usize;

        self.dense.swap_remove(dense_index);
        self.entities.swap_remove(dense_index);
        if let Some(&moved) = self.entities.get(dense_index) {
            self.sparse[moved.id() as usize] = dense_index;
        }
        self.sparse[index] = ABSENT;
        true
    }

    /// Get an immutable reference to the component for an entity.
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.dense[i])
    }

    /// Get a mutable reference to the component for an entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(|i| &mut self.dense[i])
    }

    /// Iterate over all `(entity, &component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.dense.iter())
    }

    /// Iterate over all `(entity, &mut component)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.dense.iter_mut())
    }

    /// Owners of the live dense slots.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The packed component values.
    pub fn components(&self) -> &[T] {
        &self.dense
    }

    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// Number of components stored.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Current length of the sparse index.
    pub fn sparse_capacity(&self) -> usize {
        self.sparse.len()
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Drop every component. The sparse index keeps its length.
    pub fn clear(&mut self) {
        for entity in &self.entities {
            self.sparse[entity.id() as usize] = ABSENT;
        }
        self.dense.clear();
        self.entities.clear();
    }
}

impl<T: Component> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unchecked access. Panics if the entity has no component in this set.
impl<T: Component> Index<Entity> for SparseSet<T> {
    type Output = T;

    fn index(&self, entity: Entity) -> &T {
        match self.get(entity) {
            Some(value) => value,
            None => panic!(
                "entity {entity} has no '{}' component",
                std::any::type_name::<T>()
            ),
        }
    }
}

impl<T: Component> IndexMut<Entity> for SparseSet<T> {
    fn index_mut(&mut self, entity: Entity) -> &mut T {
        match self.dense_index(entity) {
            Some(i) => &mut self.dense[i],
            None => panic!(
                "entity {entity} has no '{}' component",
                std::any::type_name::<T>()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn e(id: u64) -> Entity {
        Entity::from_raw(id)
    }

    #[test]
    fn insert_and_get() {
        let mut set = SparseSet::new();
        set.emplace(e(5), 42i32).unwrap();
        assert_eq!(set.get(e(5)), Some(&42));
        assert_eq!(set.get(e(0)), None);
        assert_eq!(set[e(5)], 42);
    }

    #[test]
    fn overwrite() {
        let mut set = SparseSet::new();
        set.emplace(e(1), 1i32).unwrap();
        set.emplace(e(1), 2).unwrap();
        assert_eq!(set.get(e(1)), Some(&2));
        assert_eq!(set.len(), 1);
        assert_eq!(set.entities(), &[e(1)]);
    }

    #[test]
    fn remove_and_swap() {
        let mut set = SparseSet::new();
        set.emplace(e(1), 'a').unwrap();
        set.emplace(e(2), 'b').unwrap();
        set.emplace(e(3), 'c').unwrap();
        assert!(set.erase(e(1)));
        assert_eq!(set.get(e(1)), None);
        assert_eq!(set.get(e(2)), Some(&'b'));
        assert_eq!(set.get(e(3)), Some(&'c'));
        assert_eq!(set.len(), 2);
        // The last entry filled the hole.
        assert_eq!(set.entities(), &[e(3), e(2)]);
    }

    #[test]
    fn erase_last_and_only() {
        let mut set = SparseSet::new();
        set.emplace(e(4), 4u8).unwrap();
        assert!(set.erase(e(4)));
        assert!(set.is_empty());
        assert!(!set.has(e(4)));
        set.emplace(e(4), 5).unwrap();
        assert_eq!(set[e(4)], 5);
    }

    #[test]
    fn erase_is_idempotent() {
        let mut set = SparseSet::new();
        set.emplace(e(1), 10u32).unwrap();
        set.emplace(e(2), 20).unwrap();
        assert!(set.erase(e(1)));
        let after_once: Vec<_> = set.iter().map(|(e, v)| (e, *v)).collect();
        assert!(!set.erase(e(1)));
        let after_twice: Vec<_> = set.iter().map(|(e, v)| (e, *v)).collect();
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn iteration() {
        let mut set = SparseSet::new();
        set.emplace(e(10), 100i32).unwrap();
        set.emplace(e(20), 200).unwrap();
        let mut items: Vec<_> = set.iter().collect();
        items.sort_by_key(|(entity, _)| *entity);
        assert_eq!(items, vec![(e(10), &100), (e(20), &200)]);

        // Iteration restarts from the beginning.
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn iter_mut_updates_in_place() {
        let mut set = SparseSet::new();
        set.emplace(e(1), 1i32).unwrap();
        set.emplace(e(2), 2).unwrap();
        for (_, value) in set.iter_mut() {
            *value *= 10;
        }
        assert_eq!(set[e(1)], 10);
        assert_eq!(set[e(2)], 20);
    }

    #[test]
    fn sparse_grows_geometrically() {
        let config = RegistryConfig {
            initial_sparse_capacity: 4,
            max_sparse_capacity: 1000,
        };
        let mut set = SparseSet::with_config(&config);
        assert_eq!(set.sparse_capacity(), 4);
        set.emplace(e(5), ()).unwrap();
        assert_eq!(set.sparse_capacity(), 8);
        set.emplace(e(100), ()).unwrap();
        assert_eq!(set.sparse_capacity(), 101);
    }

    #[test]
    fn growth_clamped_to_max() {
        let config = RegistryConfig {
            initial_sparse_capacity: 64,
            max_sparse_capacity: 100,
        };
        let mut set = SparseSet::with_config(&config);
        set.emplace(e(70), 1u8).unwrap();
        assert_eq!(set.sparse_capacity(), 100);
        set.emplace(e(99), 2).unwrap();
        assert_eq!(set.sparse_capacity(), 100);
    }

    #[test]
    fn capacity_exceeded_leaves_set_unchanged() {
        let mut set = SparseSet::with_config(&RegistryConfig::with_max_sparse_capacity(100));
        set.emplace(e(5), 1i32).unwrap();

        let err = set.emplace(e(500), 2).unwrap_err();
        assert_eq!(
            err,
            EcsError::CapacityExceeded {
                entity: 500,
                required: 501,
                max: 100,
                component: "i32",
            }
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(e(5)), Some(&1));
        assert!(!set.has(e(500)));
        assert_eq!(set.sparse_capacity(), 100);

        assert!(set.emplace(e(100), 3).is_err());
        assert!(set.emplace(e(99), 3).is_ok());
    }

    #[test]
    fn huge_ids_rejected_not_allocated() {
        let mut set = SparseSet::<u8>::new();
        assert!(set.emplace(e(u64::MAX), 1).is_err());
        assert!(!set.has(e(u64::MAX)));
        assert!(!set.erase(e(u64::MAX)));
        assert_eq!(set.sparse_capacity(), 1024);
    }

    #[test]
    fn clear_resets_membership() {
        let mut set = SparseSet::new();
        set.emplace(e(1), 1u8).unwrap();
        set.emplace(e(2), 2).unwrap();
        set.clear();
        assert!(set.is_empty());
        assert!(!set.has(e(1)));
        set.emplace(e(2), 3).unwrap();
        assert_eq!(set.entities(), &[e(2)]);
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn unchecked_access_on_absent_panics() {
        let set = SparseSet::<u32>::new();
        let value: u32 = set[e(3)];
        assert_eq!(value, 0);
    }

    #[test]
    fn matches_hashmap_model_under_random_churn() {
        let mut rng = StdRng::seed_from_u64(0x7e55e4a);
        let mut set = SparseSet::with_config(&RegistryConfig {
            initial_sparse_capacity: 8,
            max_sparse_capacity: 256,
        });
        let mut model: HashMap<Entity, u32> = HashMap::new();

        for step in 0..5000u32 {
            let entity = e(rng.gen_range(0..300));
            if rng.gen_bool(0.6) {
                let result = set.emplace(entity, step);
                if entity.id() < 256 {
                    assert!(result.is_ok());
                    model.insert(entity, step);
                } else {
                    assert!(result.is_err());
                }
            } else {
                assert_eq!(set.erase(entity), model.remove(&entity).is_some());
            }
        }

        assert_eq!(set.len(), model.len());
        for (entity, value) in set.iter() {
            assert_eq!(model.get(&entity), Some(value));
        }
        for (entity, value) in &model {
            assert!(set.has(*entity));
            assert_eq!(set[*entity], *value);
        }
    }
}
