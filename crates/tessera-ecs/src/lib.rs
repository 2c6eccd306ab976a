//! Tessera ECS - Entity Component System
//!
//! Entities are plain recycled `u64` ids. Every component type gets its own
//! sparse-set storage, and multi-component views iterate the smallest storage
//! first.

mod component;
mod entity;
mod error;
mod query;
mod registry;
mod shared;
mod sparse_set;
mod storage;

pub use component::{Component, ComponentTypeId, ComponentTypes};
pub use entity::{Entity, EntityAllocator};
pub use error::EcsError;
pub use query::ComponentSet;
pub use registry::Registry;
pub use shared::SharedRegistry;
pub use sparse_set::SparseSet;
pub use storage::ComponentStorages;
pub use tessera_core::RegistryConfig;
