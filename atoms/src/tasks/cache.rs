//! Read-through cache in front of the task store.
//!
//! Two independent tiers:
//!
//! - the list tier holds at most one entry, the full task list;
//! - the item tier maps a task id to its task.
//!
//! The cache never invalidates itself. Callers evict after every
//! successful store write (see `TaskService`). There is no TTL.
//!
//! Loads run without holding any lock, so two cold readers may both hit the
//! store. Each tier carries a generation that every eviction bumps. A load
//! only populates the tier if no eviction happened while it was in flight,
//! which keeps a slow reader from re-caching a value a writer has already
//! superseded.

use super::model::{Task, TaskId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache.
    Hit,
    /// Loaded from the store and cached.
    Miss,
    /// Cache disabled; loaded from the store.
    Bypass,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("HIT"),
            Self::Miss => f.write_str("MISS"),
            Self::Bypass => f.write_str("BYPASS"),
        }
    }
}

/// A value together with how the cache produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

impl<T> Cached<T> {
    pub fn new(value: T, status: CacheStatus) -> Self {
        Self { value, status }
    }
}

#[derive(Debug, Default)]
struct ListTier {
    entry: Option<Arc<Vec<Task>>>,
    generation: u64,
}

#[derive(Debug, Default)]
struct ItemTier {
    entries: HashMap<TaskId, Task>,
    generation: u64,
}

#[derive(Debug)]
pub struct TaskCache {
    enabled: bool,
    list: RwLock<ListTier>,
    items: RwLock<ItemTier>,
}

impl Default for TaskCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TaskCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            list: RwLock::new(ListTier::default()),
            items: RwLock::new(ItemTier::default()),
        }
    }

    /// Cached list if present, otherwise run `loader` and cache its result.
    /// Loader errors are returned as-is and never cached.
    pub async fn get_or_load_list<F, Fut, E>(&self, loader: F) -> Result<Cached<Arc<Vec<Task>>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Task>, E>>,
    {
        if !self.enabled {
            let tasks = loader().await?;
            return Ok(Cached::new(Arc::new(tasks), CacheStatus::Bypass));
        }

        let generation = {
            let tier = self.list.read().await;
            if let Some(tasks) = &tier.entry {
                return Ok(Cached::new(Arc::clone(tasks), CacheStatus::Hit));
            }
            tier.generation
        };

        let tasks = Arc::new(loader().await?);

        let mut tier = self.list.write().await;
        if tier.generation == generation {
            tier.entry = Some(Arc::clone(&tasks));
        }
        Ok(Cached::new(tasks, CacheStatus::Miss))
    }

    /// Cached task for `id` if present, otherwise run `loader`.
    ///
    /// Only found tasks are cached. A `None` from the loader is passed
    /// through, so an absent id never shadows a later insert.
    pub async fn get_or_load_item<F, Fut, E>(
        &self,
        id: TaskId,
        loader: F,
    ) -> Result<Cached<Option<Task>>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Task>, E>>,
    {
        if !self.enabled {
            let task = loader().await?;
            return Ok(Cached::new(task, CacheStatus::Bypass));
        }

        let generation = {
            let tier = self.items.read().await;
            if let Some(task) = tier.entries.get(&id) {
                return Ok(Cached::new(Some(task.clone()), CacheStatus::Hit));
            }
            tier.generation
        };

        let task = loader().await?;

        if let Some(found) = &task {
            let mut tier = self.items.write().await;
            if tier.generation == generation {
                tier.entries.insert(id, found.clone());
            }
        }
        Ok(Cached::new(task, CacheStatus::Miss))
    }

    /// Drop the list entry. No-op if absent.
    pub async fn evict_list(&self) {
        if !self.enabled {
            return;
        }
        let mut tier = self.list.write().await;
        tier.entry = None;
        tier.generation = tier.generation.wrapping_add(1);
    }

    /// Drop the entry for `id`. No-op if absent.
    pub async fn evict_item(&self, id: TaskId) {
        if !self.enabled {
            return;
        }
        let mut tier = self.items.write().await;
        tier.entries.remove(&id);
        tier.generation = tier.generation.wrapping_add(1);
    }

    /// Drop both tiers.
    pub async fn clear(&self) {
        if !self.enabled {
            return;
        }
        {
            let mut list = self.list.write().await;
            list.entry = None;
            list.generation = list.generation.wrapping_add(1);
        }
        let mut items = self.items.write().await;
        items.entries.clear();
        items.generation = items.generation.wrapping_add(1);
    }

    pub async fn cached_item_count(&self) -> usize {
        self.items.read().await.entries.len()
    }

    pub async fn has_list(&self) -> bool {
        self.list.read().await.entry.is_some()
    }
}
