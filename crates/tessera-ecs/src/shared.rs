use std::sync::Arc;

use parking_lot::Mutex;
use tessera_core::RegistryConfig;

use crate::registry::Registry;

/// A registry behind one exclusive lock, cloneable across threads.
///
/// Every call holds the lock for its whole duration, including iteration, so
/// a view never observes a concurrent insert or removal.
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self::new(Registry::with_config(config))
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Run `f` only if the lock is free right now.
    pub fn try_with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> Option<R> {
        self.inner.try_lock().map(|mut guard| f(&mut guard))
    }

    /// Unwrap the registry if this is the last handle.
    pub fn into_inner(self) -> Result<Registry, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
