//! DynamoDB-backed task store.
//!
//! Single-table layout:
//!   tasks:    PK = "TASK",     SK = "TASK#{id:020}"
//!   sequence: PK = "SEQUENCE", SK = "TASK", attribute `seq`
//!
//! Zero-padded sort keys make a partition query return tasks in id order.
//! Ids come from an atomic `ADD` on the sequence item, so they are never
//! reused after a delete.

use super::model::{NewTask, Task, TaskId};
use super::store::{StoreError, TaskStore};
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

const TASK_PK: &str = "TASK";
const TASK_SK_PREFIX: &str = "TASK#";
const SEQUENCE_PK: &str = "SEQUENCE";
const SEQUENCE_SK: &str = "TASK";

type Item = HashMap<String, AttributeValue>;

pub fn task_sort_key(id: TaskId) -> String {
    format!("{}{:020}", TASK_SK_PREFIX, id.get())
}

pub struct DynamoTaskStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoTaskStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Atomically advance the id sequence and return the new value.
    async fn next_id(&self) -> Result<TaskId, StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(SEQUENCE_PK.to_string()))
            .key("SK", AttributeValue::S(SEQUENCE_SK.to_string()))
            .update_expression("ADD seq :one")
            .expression_attribute_values(":one", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB update_item error: {}", e)))?;

        sequence_id(result.attributes())
    }
}

/// Decode the `seq` attribute returned by the sequence update.
pub fn sequence_id(attributes: Option<&Item>) -> Result<TaskId, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        id: "sequence".to_string(),
        reason,
    };

    let seq = attributes
        .and_then(|attrs| attrs.get("seq"))
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| corrupt("missing seq attribute".to_string()))?;

    let value = seq
        .parse::<u64>()
        .map_err(|e| corrupt(format!("seq '{}' is not a sequence value: {}", seq, e)))?;
    TaskId::new(value).ok_or(StoreError::Exhausted)
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASK_PK.to_string()))
            .key("SK", AttributeValue::S(task_sort_key(id)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB get_item error: {}", e)))?;

        result.item().map(task_from_item).transpose()
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let id = self.next_id().await?;
        let task = task.with_id(id);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_task(&task)))
            .condition_expression("attribute_not_exists(SK)")
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB put_item error: {}", e)))?;

        Ok(task)
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_from_task(task)))
            .condition_expression("attribute_exists(SK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            // Deleted between read and write; the delete wins.
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(PutItemError::ConditionalCheckFailedException(_))
                ) =>
            {
                tracing::warn!(task_id = %task.id, "Task vanished before save, skipping");
                Ok(())
            }
            Err(e) => Err(StoreError::Backend(format!("DynamoDB put_item error: {}", e))),
        }
    }

    async fn delete(&self, id: TaskId) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASK_PK.to_string()))
            .key("SK", AttributeValue::S(task_sort_key(id)))
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("DynamoDB delete_item error: {}", e)))?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(TASK_PK.to_string()))
                .expression_attribute_values(
                    ":sk_prefix",
                    AttributeValue::S(TASK_SK_PREFIX.to_string()),
                )
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend(format!("DynamoDB query error: {}", e)))?;

            for item in result.items() {
                tasks.push(task_from_item(item)?);
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(tasks)
    }
}

pub fn item_from_task(task: &Task) -> Item {
    HashMap::from([
        ("PK".to_string(), AttributeValue::S(TASK_PK.to_string())),
        ("SK".to_string(), AttributeValue::S(task_sort_key(task.id))),
        ("title".to_string(), AttributeValue::S(task.title.clone())),
        (
            "description".to_string(),
            AttributeValue::S(task.description.clone()),
        ),
        (
            "due_date".to_string(),
            AttributeValue::S(task.due_date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        ),
        ("completed".to_string(), AttributeValue::Bool(task.completed)),
    ])
}

pub fn task_from_item(item: &Item) -> Result<Task, StoreError> {
    let sk = string_attr(item, "SK", "?")?;
    let corrupt = |reason: &str| StoreError::Corrupt {
        id: sk.to_string(),
        reason: reason.to_string(),
    };

    let id = sk
        .strip_prefix(TASK_SK_PREFIX)
        .and_then(|raw| raw.parse::<u64>().ok())
        .and_then(TaskId::new)
        .ok_or_else(|| corrupt("sort key is not a task id"))?;

    let due_date = DateTime::parse_from_rfc3339(string_attr(item, "due_date", sk)?)
        .map_err(|e| corrupt(&format!("due_date: {}", e)))?
        .with_timezone(&Utc);

    let completed = item
        .get("completed")
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| corrupt("missing completed"))?;

    Ok(Task {
        id,
        title: string_attr(item, "title", sk)?.to_string(),
        description: string_attr(item, "description", sk)?.to_string(),
        due_date,
        completed,
    })
}

fn string_attr<'a>(item: &'a Item, name: &str, sk: &str) -> Result<&'a str, StoreError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.as_str())
        .ok_or_else(|| StoreError::Corrupt {
            id: sk.to_string(),
            reason: format!("missing {}", name),
        })
}
