//! Persistence seam for tasks.
//!
//! `TaskStore` is the contract the service relies on: each call is atomic
//! and durable once it returns `Ok`. Ids are assigned by the store on
//! insert and never reused, even after deletion.

use super::model::{NewTask, Task, TaskId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing service rejected or failed the call.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored record could not be decoded into a task.
    #[error("Corrupt task record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// The id sequence cannot advance any further.
    #[error("Task id sequence exhausted")]
    Exhausted,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Persist a new task, assigning it a fresh id.
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Overwrite an existing task in place.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;

    /// Remove a task. Deleting an unknown id is not an error.
    async fn delete(&self, id: TaskId) -> Result<(), StoreError>;

    /// Every task, in ascending id order.
    async fn list_all(&self) -> Result<Vec<Task>, StoreError>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<TaskId, Task>,
    last_id: u64,
}

/// Process-local store for local runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    table: Arc<RwLock<Table>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut table = self.table.write().await;
        let next = table.last_id.checked_add(1).ok_or(StoreError::Exhausted)?;
        let id = TaskId::new(next).ok_or(StoreError::Exhausted)?;
        table.last_id = next;
        let task = task.with_id(id);
        table.rows.insert(id, task.clone());
        Ok(task)
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        self.table.write().await.rows.insert(task.id, task.clone());
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.table.write().await.rows.remove(&id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: "desc".to_string(),
            due_date: Utc::now() + Duration::days(1),
            completed: false,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn insert_assigns_sequential_ids_from_one() {
        let store = InMemoryTaskStore::new();
        let first = store.insert(new_task("first")).await.unwrap();
        let second = store.insert(new_task("second")).await.unwrap();
        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryTaskStore::new();
        let first = store.insert(new_task("first")).await.unwrap();
        store.delete(first.id).await.unwrap();
        let second = store.insert(new_task("second")).await.unwrap();
        assert_eq!(second.id.get(), 2);
        assert_eq!(store.find_by_id(first.id).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_unknown_id_is_ok() {
        let store = InMemoryTaskStore::new();
        let id = TaskId::new(9).unwrap();
        assert!(store.delete(id).await.is_ok());
        assert!(store.delete(id).await.is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn list_all_is_in_id_order() {
        let store = InMemoryTaskStore::new();
        for title in ["one", "two", "three"] {
            store.insert(new_task(title)).await.unwrap();
        }
        let titles: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[rstest]
    #[tokio::test]
    async fn save_overwrites_existing_row() {
        let store = InMemoryTaskStore::new();
        let mut task = store.insert(new_task("draft")).await.unwrap();
        task.completed = true;
        store.save(&task).await.unwrap();
        assert_eq!(store.find_by_id(task.id).await.unwrap(), Some(task));
    }
}
