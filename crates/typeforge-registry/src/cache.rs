//! Memoization of synthesized types.
//!
//! One finalized type per [`CacheKey`] for the lifetime of the cache. The
//! key is the recipe plus the contract identity and never the base type, so
//! a later request with a different base gets the type built first.
//!
//! # Locking
//!
//! A short coarse lock guards the slot map; each key then has its own slot
//! lock held for the duration of the build. Concurrent first requests for
//! the same key build once, requests for unrelated keys never wait on each
//! other, and a build may itself request other keys.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;
use typeforge_core::{BuildResult, TypeHash};

/// Which synthesis recipe produced a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipe {
    Model,
    SelfViewModel,
    ViewModel,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recipe::Model => "model",
            Recipe::SelfViewModel => "self view model",
            Recipe::ViewModel => "view model",
        })
    }
}

/// Cache key: recipe plus contract identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub recipe: Recipe,
    pub contract: TypeHash,
}

impl CacheKey {
    pub fn new(recipe: Recipe, contract: TypeHash) -> Self {
        Self { recipe, contract }
    }
}

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Thread-safe build-once cache.
pub struct TypeCache<T> {
    slots: Mutex<FxHashMap<CacheKey, Slot<T>>>,
}

impl<T> Default for TypeCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<T> TypeCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: CacheKey) -> Slot<T> {
        self.slots.lock().entry(key).or_default().clone()
    }

    /// Return the cached value for `key`, building it on first use.
    ///
    /// A failed build stores nothing; the next request builds again.
    pub fn get_or_build(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> BuildResult<Arc<T>>,
    ) -> BuildResult<Arc<T>> {
        let slot = self.slot(key);
        let mut guard = slot.lock();

        if let Some(existing) = guard.as_ref() {
            debug!(recipe = %key.recipe, contract = %key.contract, "served from cache");
            return Ok(Arc::clone(existing));
        }

        let built = build()?;
        *guard = Some(Arc::clone(&built));
        debug!(recipe = %key.recipe, contract = %key.contract, "cached new type");
        Ok(built)
    }

    /// Cached value for `key`, without building.
    pub fn get(&self, key: CacheKey) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(&key).cloned()?;
        let value = slot.lock().clone();
        value
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of successfully built entries.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<T>> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|s| s.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for TypeCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCache")
            .field("slots", &self.slots.lock().len())
            .finish()
    }
}
