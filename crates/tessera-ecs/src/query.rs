use tracing::trace;

use crate::component::Component;
use crate::entity::Entity;
use crate::sparse_set::SparseSet;
use crate::storage::ComponentStorages;

/// A tuple of distinct component types that can be queried together, e.g.
/// `(Position,)` or `(Position, Velocity)`.
///
/// Queries drive iteration from whichever storage holds the fewest components
/// and filter the rest by membership, so the cost is bounded by the smallest
/// set plus the matches.
pub trait ComponentSet: 'static {
    /// Shared references to one entity's components, in tuple order.
    type Refs<'w>;
    /// Exclusive references to one entity's components, in tuple order.
    type Muts<'w>;

    /// Type names in tuple order.
    fn type_names() -> Vec<&'static str>;

    /// Whether `entity` has every component in the set. Short-circuits.
    fn has_all(storages: &ComponentStorages, entity: Entity) -> bool;

    /// Call `visitor` once per entity that has every component. Returns the
    /// number of matches.
    fn view<'w, Visit>(storages: &'w ComponentStorages, visitor: Visit) -> usize
    where
        Visit: FnMut(Entity, Self::Refs<'w>);

    /// Like [`ComponentSet::view`] with exclusive access to the components.
    ///
    /// # Panics
    /// If the same component type appears twice in the set.
    fn view_mut<'w, Visit>(storages: &'w mut ComponentStorages, visitor: Visit) -> usize
    where
        Visit: FnMut(Entity, Self::Muts<'w>);
}

/// Index of the smallest length; the earliest one wins a tie.
fn driver_index(lens: &[usize]) -> usize {
    let mut best = 0;
    for (i, &len) in lens.iter().enumerate() {
        if len < lens[best] {
            best = i;
        }
    }
    best
}

fn assert_distinct<T: PartialEq>(ids: &[T], names: impl FnOnce() -> Vec<&'static str>) {
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            panic!("component type listed twice in mutable view {:?}", names());
        }
    }
}

/// Raw access to one storage for the duration of a mutable view.
struct RawColumn<T> {
    set: *const SparseSet<T>,
    dense: *mut T,
}

impl<T: Component> RawColumn<T> {
    fn new(set: &mut SparseSet<T>) -> Self {
        let dense = set.components_mut().as_mut_ptr();
        Self {
            set: set as *const SparseSet<T>,
            dense,
        }
    }

    /// # Safety
    /// The storage must outlive the column and not be moved or resized.
    unsafe fn set(&self) -> &SparseSet<T> {
        &*self.set
    }

    /// # Safety
    /// As for [`RawColumn::set`], and each entity may be fetched at most once
    /// while its reference is alive.
    unsafe fn fetch<'w>(&self, entity: Entity) -> Option<&'w mut T> {
        self.set()
            .dense_index(entity)
            .map(|i| &mut *self.dense.add(i))
    }
}

macro_rules! impl_component_set {
    ($(($ty:ident, $var:ident)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Refs<'w> = ($(&'w $ty,)+);
            type Muts<'w> = ($(&'w mut $ty,)+);

            fn type_names() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$ty>()),+]
            }

            fn has_all(storages: &ComponentStorages, entity: Entity) -> bool {
                $(storages.get::<$ty>().is_some_and(|set| set.has(entity)))&&+
            }

            fn view<'w, Visit>(storages: &'w ComponentStorages, mut visitor: Visit) -> usize
            where
                Visit: FnMut(Entity, Self::Refs<'w>),
            {
                // A missing storage is empty, so nothing can match.
                let ($(Some($var),)+) = ($(storages.get::<$ty>(),)+) else {
                    return 0;
                };

                let driver = driver_index(&[$($var.len()),+]);
                let candidates: &'w [Entity] = [$($var.entities()),+][driver];
                trace!(
                    "view {:?} driven by '{}' ({} candidates)",
                    Self::type_names(),
                    Self::type_names()[driver],
                    candidates.len()
                );

                let mut matched = 0;
                for &entity in candidates {
                    if !($($var.has(entity))&&+) {
                        continue;
                    }
                    visitor(entity, ($(&$var[entity],)+));
                    matched += 1;
                }
                matched
            }

            fn view_mut<'w, Visit>(storages: &'w mut ComponentStorages, mut visitor: Visit) -> usize
            where
                Visit: FnMut(Entity, Self::Muts<'w>),
            {
                let ids = [$(storages.types().id_of::<$ty>()),+];
                assert_distinct(&ids, Self::type_names);

                $(
                    let Some(set) = storages.get_mut::<$ty>() else {
                        return 0;
                    };
                    let $var = RawColumn::new(set);
                )+

                // Safety: the ids are distinct, so every column points at a
                // different boxed storage. `storages` stays mutably borrowed
                // for 'w, so nothing else can move, resize or free them.
                // Candidates come from a dense array and are unique, so each
                // component is handed out at most once.
                unsafe {
                    let driver = driver_index(&[$($var.set().len()),+]);
                    let candidates: Vec<Entity> = [$($var.set().entities()),+][driver].to_vec();

                    let mut matched = 0;
                    for entity in candidates {
                        if let ($(Some($var),)+) = ($($var.fetch(entity),)+) {
                            visitor(entity, ($($var,)+));
                            matched += 1;
                        }
                    }
                    matched
                }
            }
        }
    };
}

impl_component_set!((A, a));
impl_component_set!((A, a), (B, b));
impl_component_set!((A, a), (B, b), (C, c));
impl_component_set!((A, a), (B, b), (C, c), (D, d));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));
