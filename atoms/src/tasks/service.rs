use super::cache::{Cached, TaskCache};
use super::merge::merge;
use super::model::{Task, TaskId, TaskPayload};
use super::store::{StoreError, TaskStore};
use super::validation::{validate, validate_new, FieldErrors, Ruleset};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Payload rejected before any store access.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Task operations: validation, merge, store access and cache upkeep.
///
/// Every write evicts only after the store acknowledged it:
///
/// | operation | eviction          |
/// |-----------|-------------------|
/// | create    | list              |
/// | update    | list, item(id)    |
/// | delete    | list, item(id)    |
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    cache: TaskCache,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, cache: TaskCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &TaskCache {
        &self.cache
    }

    /// All tasks in store order, read through the list cache.
    pub async fn list_all(&self) -> Result<Cached<Arc<Vec<Task>>>, ServiceError> {
        let store = Arc::clone(&self.store);
        let listed = self
            .cache
            .get_or_load_list(|| async move { store.list_all().await })
            .await?;
        tracing::debug!(cache = %listed.status, count = listed.value.len(), "Listed tasks");
        Ok(listed)
    }

    /// Absent ids yield `None`, not an error.
    pub async fn get_by_id(&self, id: TaskId) -> Result<Cached<Option<Task>>, ServiceError> {
        let store = Arc::clone(&self.store);
        let found = self
            .cache
            .get_or_load_item(id, || async move { store.find_by_id(id).await })
            .await?;
        tracing::debug!(cache = %found.status, task_id = %id, hit = found.value.is_some(), "Loaded task");
        Ok(found)
    }

    /// Validate under the creation ruleset, insert, then evict the list.
    pub async fn create(&self, payload: &TaskPayload) -> Result<TaskId, ServiceError> {
        let new_task = validate_new(payload, Utc::now())?;
        let task = self.store.insert(new_task).await?;
        self.cache.evict_list().await;
        tracing::info!(task_id = %task.id, "Created task");
        Ok(task.id)
    }

    /// Validate under the editing ruleset and merge onto the stored task.
    ///
    /// An unknown id is a silent no-op: nothing is written and nothing is
    /// evicted.
    pub async fn update(&self, id: TaskId, payload: &TaskPayload) -> Result<(), ServiceError> {
        let patch = validate(payload, Ruleset::Editing, Utc::now())?;

        let Some(existing) = self.store.find_by_id(id).await? else {
            tracing::debug!(task_id = %id, "Update skipped, task not found");
            return Ok(());
        };

        let updated = merge(existing, patch);
        self.store.save(&updated).await?;
        self.cache.evict_list().await;
        self.cache.evict_item(id).await;
        tracing::info!(task_id = %id, "Updated task");
        Ok(())
    }

    /// Idempotent; unknown ids are not an error.
    pub async fn delete(&self, id: TaskId) -> Result<(), ServiceError> {
        self.store.delete(id).await?;
        self.cache.evict_list().await;
        self.cache.evict_item(id).await;
        tracing::info!(task_id = %id, "Deleted task");
        Ok(())
    }
}
