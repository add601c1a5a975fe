pub mod learning_paths;
pub mod sub_chapters;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::StatusCode,
    middleware::map_response,
    response::{IntoResponse, Response},
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{curriculum::Library, error::ErrorBody};

#[derive(OpenApi)]
#[openapi(
    paths(
        learning_paths::create_learning_paths,
        learning_paths::list_learning_paths,
        learning_paths::update_learning_paths,
        learning_paths::get_learning_path,
        learning_paths::get_learning_path_progress,
        sub_chapters::set_completed,
    ),
    info(title = "Learning path server", version = "0.1.0")
)]
pub struct ApiDoc;

/// Routes plus the Swagger UI, without transport middleware.
pub fn router(library: Arc<Library>) -> Router {
    Router::new()
        .merge(learning_paths::get_learning_paths_scope())
        .merge(sub_chapters::get_sub_chapters_scope())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(library)
}

/// The router as served: request tracing, timeout, CORS and compression.
pub fn app(library: Arc<Library>, request_timeout: Duration) -> Router {
    with_transport(router(library), request_timeout)
}

fn with_transport(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(map_response(timeout_body))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Handlers never answer 408 themselves, so any 408 here is the timeout layer's
/// empty response.
async fn timeout_body(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(ErrorBody {
            error: "Request timed out".to_string(),
        }),
    )
        .into_response()
}

pub fn get_openapi_json() -> anyhow::Result<String> {
    Ok(ApiDoc::openapi().to_pretty_json()?)
}
