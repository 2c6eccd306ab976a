use std::fmt;

use tracing::trace;

/// An opaque entity handle.
///
/// Ids are unique among live entities but are recycled after removal. There is
/// no generation tag, so a handle kept past `remove_entity` aliases whichever
/// entity later reuses the id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u64);

impl Entity {
    /// Create an entity from a raw id (mainly for testing and snapshots).
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// The raw id of this entity.
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints entity ids and recycles freed ones in LIFO order.
pub struct EntityAllocator {
    /// Highest id ever minted. Fresh ids start at 1.
    next_id: u64,
    /// Liveness bit per minted id, indexed by `id - 1`.
    alive: Vec<bool>,
    free_list: Vec<u64>,
    len: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Allocate an entity, reusing the most recently freed id if there is one.
    pub fn allocate(&mut self) -> Entity {
        self.len += 1;
        if let Some(id) = self.free_list.pop() {
            self.alive[Self::slot(id)] = true;
            return Entity(id);
        }
        self.next_id += 1;
        self.alive.push(true);
        Entity(self.next_id)
    }

    /// Return an entity's id to the free list. Returns `true` if it was alive.
    ///
    /// Ids that were never minted, or that are already free, are ignored so
    /// the same id can never be handed out twice.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            trace!("Ignoring release of non-live entity {entity}");
            return false;
        }
        self.alive[Self::slot(entity.0)] = false;
        self.free_list.push(entity.0);
        self.len -= 1;
        true
    }

    /// Check if an entity id is currently allocated.
    pub fn is_alive(&self, entity: Entity) -> bool {
        entity.0 != 0
            && usize::try_from(entity.0 - 1)
                .ok()
                .and_then(|slot| self.alive.get(slot).copied())
                .unwrap_or(false)
    }

    /// Iterate over all live entities in id order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(slot, _)| Entity(slot as u64 + 1))
    }

    /// Number of currently alive entities.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no alive entities.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of ids waiting on the free list.
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    // Only called for minted ids, whose slot always fits in `alive`.
    fn slot(id: u64) -> usize {
        (id - 1) as usize
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
