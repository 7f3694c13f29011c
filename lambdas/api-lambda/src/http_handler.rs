use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use std::sync::Arc;
use taskapi_atoms::tasks::{self as atoms, ApiError};
use taskapi_shared::{
    cors::{finalize_response, with_cors_headers},
    AppState,
};

/// Main Lambda handler - routes /tasks and /openapi.json requests
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body: &[u8] = event.body().as_ref();
    let allow_origin = state.config.cors_allow_origin.as_str();
    tracing::info!("Task API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp, allow_origin));
    }

    let tasks = &state.tasks;
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // GET /tasks - list all tasks
        (&Method::GET, ["tasks"]) => atoms::list_tasks_handler(tasks).await,
        // POST /tasks - create task
        (&Method::POST, ["tasks"]) => atoms::create_task_handler(tasks, body).await,
        (_, ["tasks"]) => method_not_allowed(),
        // GET | PUT | DELETE /tasks/{id}
        (&Method::GET | &Method::PUT | &Method::DELETE, ["tasks", raw_id]) => {
            match atoms::parse_task_id(raw_id) {
                Err(e) => e.into_response(),
                Ok(task_id) => match *method {
                    Method::GET => atoms::get_task_handler(tasks, task_id).await,
                    Method::PUT => atoms::update_task_handler(tasks, task_id, body).await,
                    Method::DELETE => atoms::delete_task_handler(tasks, task_id).await,
                    _ => method_not_allowed(),
                },
            }
        }
        (_, ["tasks", _]) => method_not_allowed(),
        // GET /openapi.json - API description
        (&Method::GET, ["openapi.json"]) => atoms::openapi_handler().await,
        (_, ["openapi.json"]) => method_not_allowed(),
        _ => not_found(),
    };

    // Anything that escaped the handlers still leaves as a JSON 500.
    let resp = match resp {
        Ok(r) => Ok(r),
        Err(e) => ApiError::Internal(e.to_string()).into_response(),
    };

    finalize_response(resp, allow_origin)
}

fn method_not_allowed() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "application/json")
        .body(
            serde_json::json!({"error": "Method not allowed"})
                .to_string()
                .into(),
        )
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
