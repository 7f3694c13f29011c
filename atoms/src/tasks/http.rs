use super::cache::CacheStatus;
use super::model::{CreatedTask, TaskId, TaskList, TaskPayload};
use super::service::{ServiceError, TaskService};
use super::validation::FieldErrors;
use super::model::Task;
use lambda_http::{http::StatusCode, Body, Error as LambdaError, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{OpenApi, ToSchema};

/// Header reporting how a read was served.
pub const CACHE_HEADER: &str = "X-Cache";

/// Body of conversion and internal errors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Failures rendered at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with a field -> message map.
    #[error("{0}")]
    Validation(FieldErrors),

    /// 400 with `{"error": ...}`: a path id or the body could not be parsed.
    #[error("{0}")]
    Conversion(String),

    /// 500 with `{"error": ...}`.
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Validation(errors) => Self::Validation(errors),
            ServiceError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Conversion(format!("Invalid request body: {}", error))
    }
}

impl From<lambda_http::http::Error> for ApiError {
    fn from(error: lambda_http::http::Error) -> Self {
        Self::Internal(format!("Failed to build response: {}", error))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conversion(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Result<Response<Body>, LambdaError> {
        let status = self.status();
        let body = match &self {
            Self::Validation(errors) => serde_json::to_string(errors)?,
            Self::Conversion(message) => {
                tracing::warn!("Rejected request: {}", message);
                serde_json::to_string(&ErrorBody {
                    error: message.clone(),
                })?
            }
            Self::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                serde_json::to_string(&ErrorBody {
                    error: message.clone(),
                })?
            }
        };

        Ok(Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(body.into())
            .map_err(Box::new)?)
    }
}

/// Parse a path segment into a task id. Only positive integers are accepted.
pub fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse::<u64>()
        .ok()
        .and_then(TaskId::new)
        .ok_or_else(|| {
            ApiError::Conversion(format!(
                "Invalid task id '{}': must be a positive integer",
                raw
            ))
        })
}

fn cached_json_response(status: CacheStatus, body: String) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header(CACHE_HEADER, status.to_string())
        .body(body.into())?)
}

fn empty_response(status: StatusCode) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder().status(status).body(Body::Empty)?)
}

fn respond(result: Result<Response<Body>, ApiError>) -> Result<Response<Body>, LambdaError> {
    match result {
        Ok(resp) => Ok(resp),
        Err(e) => e.into_response(),
    }
}

async fn list_tasks(service: &TaskService) -> Result<Response<Body>, ApiError> {
    let listed = service.list_all().await?;
    let body = serde_json::to_string(&TaskList {
        tasks: listed.value.to_vec(),
    })?;
    cached_json_response(listed.status, body)
}

async fn get_task(service: &TaskService, task_id: TaskId) -> Result<Response<Body>, ApiError> {
    let found = service.get_by_id(task_id).await?;
    match found.value {
        Some(task) => cached_json_response(found.status, serde_json::to_string(&task)?),
        None => empty_response(StatusCode::NOT_FOUND),
    }
}

async fn create_task(service: &TaskService, body: &[u8]) -> Result<Response<Body>, ApiError> {
    let payload: TaskPayload = serde_json::from_slice(body)?;
    let id = service.create(&payload).await?;
    let body = serde_json::to_string(&CreatedTask { id })?;

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("Content-Type", "application/json")
        .header("Location", format!("/tasks/{}", id))
        .body(body.into())?)
}

async fn update_task(
    service: &TaskService,
    task_id: TaskId,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    let payload: TaskPayload = serde_json::from_slice(body)?;
    service.update(task_id, &payload).await?;
    empty_response(StatusCode::NO_CONTENT)
}

async fn delete_task(service: &TaskService, task_id: TaskId) -> Result<Response<Body>, ApiError> {
    service.delete(task_id).await?;
    empty_response(StatusCode::NO_CONTENT)
}

/// HTTP Handler: GET /tasks
#[utoipa::path(
    get,
    path = "/tasks",
    tag = "tasks",
    summary = "Get all tasks",
    responses(
        (status = 200, description = "List of all tasks", body = TaskList,
            headers(("X-Cache" = String, description = "HIT, MISS or BYPASS"))),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn list_tasks_handler(service: &TaskService) -> Result<Response<Body>, LambdaError> {
    respond(list_tasks(service).await)
}

/// HTTP Handler: GET /tasks/{id}
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Get task by id",
    params(("id" = u64, Path, description = "id of the task")),
    responses(
        (status = 200, description = "Task got by id", body = Task,
            headers(("X-Cache" = String, description = "HIT, MISS or BYPASS"))),
        (status = 404, description = "Task not found by id"),
        (status = 400, description = "Bad request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn get_task_handler(
    service: &TaskService,
    task_id: TaskId,
) -> Result<Response<Body>, LambdaError> {
    respond(get_task(service, task_id).await)
}

/// HTTP Handler: POST /tasks
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    summary = "Create task",
    request_body(content = TaskPayload, description = "task body to create, id is ignored"),
    responses(
        (status = 201, description = "Id of the created task", body = CreatedTask,
            headers(("Location" = String, description = "/tasks/{id} of the new task"))),
        (status = 400, description = "Field errors or malformed body", body = FieldErrors),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn create_task_handler(
    service: &TaskService,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    respond(create_task(service, body).await)
}

/// HTTP Handler: PUT /tasks/{id}
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Update task by id",
    params(("id" = u64, Path, description = "id of the task to update")),
    request_body(content = TaskPayload, description = "task body containing fields to update"),
    responses(
        (status = 204, description = "Updated, or no task with this id"),
        (status = 400, description = "Field errors, malformed body or bad id", body = FieldErrors),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn update_task_handler(
    service: &TaskService,
    task_id: TaskId,
    body: &[u8],
) -> Result<Response<Body>, LambdaError> {
    respond(update_task(service, task_id, body).await)
}

/// HTTP Handler: DELETE /tasks/{id}
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "tasks",
    summary = "Delete task by id",
    params(("id" = u64, Path, description = "id of the task to delete")),
    responses(
        (status = 204, description = "Deleted, or no task with this id"),
        (status = 400, description = "Bad request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    )
)]
pub async fn delete_task_handler(
    service: &TaskService,
    task_id: TaskId,
) -> Result<Response<Body>, LambdaError> {
    respond(delete_task(service, task_id).await)
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Task API", description = "CRUD over task records"),
    paths(
        list_tasks_handler,
        get_task_handler,
        create_task_handler,
        update_task_handler,
        delete_task_handler
    ),
    components(schemas(Task, TaskPayload, TaskList, CreatedTask, FieldErrors, ErrorBody)),
    tags((name = "tasks", description = "Task records"))
)]
pub struct ApiDoc;

/// HTTP Handler: GET /openapi.json
pub async fn openapi_handler() -> Result<Response<Body>, LambdaError> {
    respond(openapi_document())
}

fn openapi_document() -> Result<Response<Body>, ApiError> {
    let body = ApiDoc::openapi()
        .to_json()
        .map_err(|e| ApiError::Internal(format!("Failed to render OpenAPI document: {}", e)))?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(body.into())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::cache::TaskCache;
    use crate::tasks::store::{InMemoryTaskStore, StoreError};
    use crate::tasks::validation::TITLE_SIZE;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn service() -> TaskService {
        TaskService::new(Arc::new(InMemoryTaskStore::new()), TaskCache::new(true))
    }

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(resp.body().as_ref()).unwrap()
    }

    #[rstest]
    #[case("1", Some(1))]
    #[case("42", Some(42))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("abc", None)]
    #[case("1.5", None)]
    #[case("", None)]
    fn task_id_must_be_positive_integer(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_task_id(raw).ok().map(TaskId::get), expected);
    }

    #[rstest]
    fn conversion_error_renders_error_key() {
        let resp = parse_task_id("abc").unwrap_err().into_response().unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(&resp);
        assert!(json["error"].as_str().unwrap().contains("abc"));
    }

    #[rstest]
    fn store_error_renders_raw_message_as_500() {
        let error: ApiError =
            ServiceError::Store(StoreError::Backend("disk on fire".to_string())).into();
        let resp = error.into_response().unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(&resp),
            serde_json::json!({ "error": "Store backend error: disk on fire" })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn create_returns_location_and_id(service: TaskService) {
        let body = serde_json::json!({
            "title": "Buy milk",
            "description": "2%",
            "dueDate": (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })
        .to_string();

        let resp = create_task_handler(&service, body.as_bytes()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["Location"], "/tasks/1");
        assert_eq!(body_json(&resp), serde_json::json!({ "id": 1 }));
    }

    #[rstest]
    #[tokio::test]
    async fn create_with_short_title_returns_field_map(service: TaskService) {
        let body = serde_json::json!({
            "title": "Hi",
            "description": "2%",
            "dueDate": (chrono::Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })
        .to_string();

        let resp = create_task_handler(&service, body.as_bytes()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(&resp), serde_json::json!({ "title": TITLE_SIZE }));
    }

    #[rstest]
    #[tokio::test]
    async fn malformed_body_is_conversion_error(service: TaskService) {
        let resp = create_task_handler(&service, b"{not json").await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(&resp)["error"].is_string());
    }

    #[rstest]
    #[tokio::test]
    async fn list_reports_cache_status(service: TaskService) {
        let first = list_tasks_handler(&service).await.unwrap();
        let second = list_tasks_handler(&service).await.unwrap();

        assert_eq!(first.headers()[CACHE_HEADER], "MISS");
        assert_eq!(second.headers()[CACHE_HEADER], "HIT");
        assert_eq!(body_json(&second), serde_json::json!({ "tasks": [] }));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_task_is_404_with_empty_body(service: TaskService) {
        let resp = get_task_handler(&service, TaskId::new(999).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.body().is_empty());
        assert!(resp.headers().get(CACHE_HEADER).is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn create_accepts_local_due_date_and_any_payload_id(service: TaskService) {
        let body = br#"{"id":-1,"title":"Buy milk","description":"2%","dueDate":"2999-01-01T10:00:00"}"#;

        let resp = create_task_handler(&service, body).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(&resp), serde_json::json!({ "id": 1 }));
        let task = service
            .get_by_id(TaskId::new(1).unwrap())
            .await
            .unwrap()
            .value
            .unwrap();
        assert_eq!(task.due_date.to_rfc3339(), "2999-01-01T10:00:00+00:00");
    }

    #[rstest]
    #[tokio::test]
    async fn openapi_document_describes_task_routes() {
        let resp = openapi_handler().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let doc = body_json(&resp);
        assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
        for method in ["get", "post"] {
            assert!(doc["paths"]["/tasks"][method].is_object(), "GET/POST /tasks");
        }
        for method in ["get", "put", "delete"] {
            assert!(doc["paths"]["/tasks/{id}"][method].is_object(), "{method} /tasks/{{id}}");
        }
        let schemas = &doc["components"]["schemas"];
        for name in ["Task", "TaskPayload", "TaskList", "CreatedTask", "FieldErrors", "ErrorBody"] {
            assert!(schemas[name].is_object(), "schema {name}");
        }
        assert!(schemas["Task"]["properties"]["dueDate"].is_object());
    }

    #[rstest]
    #[tokio::test]
    async fn update_and_delete_return_no_content(service: TaskService) {
        let id = TaskId::new(5).unwrap();
        let update = update_task_handler(&service, id, br#"{"completed":true}"#)
            .await
            .unwrap();
        let delete = delete_task_handler(&service, id).await.unwrap();

        assert_eq!(update.status(), StatusCode::NO_CONTENT);
        assert_eq!(delete.status(), StatusCode::NO_CONTENT);
    }
}
