// Re-export model types and service functions
pub mod cache;
pub mod dynamo;
pub mod http;
pub mod merge;
pub mod model;
pub mod service;
pub mod store;
pub mod validation;

pub use cache::{CacheStatus, Cached, TaskCache};
pub use dynamo::DynamoTaskStore;
pub use http::*;
pub use model::{CreatedTask, NewTask, Task, TaskId, TaskList, TaskPatch, TaskPayload};
pub use service::{ServiceError, TaskService};
pub use store::{InMemoryTaskStore, StoreError, TaskStore};
pub use validation::{FieldErrors, Ruleset};
