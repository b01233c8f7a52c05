use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::task::{self, TaskState};

#[derive(OpenApi)]
#[openapi(
    paths(
        task::api::v1::list_tasks_handler,
        task::api::v1::get_task_handler,
        task::api::v1::create_task_handler,
        task::api::v1::update_task_handler,
        task::api::v1::delete_task_handler,
    ),
    components(schemas(task::api::v1::TaskJson, task::api::v1::ErrorResponse)),
    tags((name = "Tasks", description = "Task list management"))
)]
pub struct ApiDoc;

/// Creates the JSON API routes plus the Swagger UI serving their OpenAPI document.
pub fn create_api_router(task_state: TaskState) -> Router {
    task::api::v1::create_api_router(task_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
