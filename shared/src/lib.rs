pub mod config;
pub mod cors;

pub use config::{Config, ConfigError, LogFormat, StoreKind};

use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;
use taskapi_atoms::tasks::{DynamoTaskStore, InMemoryTaskStore, TaskCache, TaskService, TaskStore};

/// Process-wide state shared by every invocation of a warm Lambda.
pub struct AppState {
    pub tasks: TaskService,
    pub config: Config,
}

impl AppState {
    /// Wire the configured store behind a fresh cache.
    pub async fn from_config(config: Config) -> Self {
        let store: Arc<dyn TaskStore> = match config.store {
            StoreKind::DynamoDb => {
                let aws_config = aws_config::load_from_env().await;
                let dynamo_client = DynamoClient::new(&aws_config);
                Arc::new(DynamoTaskStore::new(dynamo_client, config.table_name.clone()))
            }
            StoreKind::Memory => Arc::new(InMemoryTaskStore::new()),
        };

        tracing::info!(
            store = %config.store,
            table = %config.table_name,
            cache_enabled = config.cache_enabled,
            "Task state initialized"
        );

        Self {
            tasks: TaskService::new(store, TaskCache::new(config.cache_enabled)),
            config,
        }
    }

    /// In-memory store with the given config. No AWS calls are made.
    pub fn in_memory(config: Config) -> Self {
        Self {
            tasks: TaskService::new(
                Arc::new(InMemoryTaskStore::new()),
                TaskCache::new(config.cache_enabled),
            ),
            config,
        }
    }
}
