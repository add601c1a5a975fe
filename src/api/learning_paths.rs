use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::{
    curriculum::{LearningPath, LearningPathInput, Library, PathProgress},
    error::{Error, ErrorBody, Result},
};

fn forest_from(
    payload: Result<Json<Vec<LearningPathInput>>, JsonRejection>,
) -> Result<Vec<LearningPathInput>> {
    payload
        .map(|Json(forest)| forest)
        .map_err(|e| Error::InvalidInput(e.body_text()))
}

#[utoipa::path(
    path = "/learning-paths",
    method(post),
    request_body = Vec<LearningPathInput>,
    responses(
        (status = 201, description = "Forest persisted with fresh ids", body = Vec<LearningPath>),
        (status = 400, description = "Malformed forest", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn create_learning_paths(
    State(library): State<Arc<Library>>,
    payload: Result<Json<Vec<LearningPathInput>>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let created = library.create(forest_from(payload)?).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    path = "/learning-paths",
    method(get),
    responses(
        (status = 200, description = "Every stored learning path", body = Vec<LearningPath>),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_learning_paths(
    State(library): State<Arc<Library>>,
) -> Result<Json<Vec<LearningPath>>> {
    Ok(Json(library.read_all().await?))
}

#[utoipa::path(
    path = "/learning-paths",
    method(put),
    request_body = Vec<LearningPathInput>,
    responses(
        (status = 200, description = "Canonical forest after the upsert", body = Vec<LearningPath>),
        (status = 400, description = "Malformed forest or path without id", body = ErrorBody),
        (status = 404, description = "A path id is unknown", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn update_learning_paths(
    State(library): State<Arc<Library>>,
    payload: Result<Json<Vec<LearningPathInput>>, JsonRejection>,
) -> Result<Json<Vec<LearningPath>>> {
    Ok(Json(library.update(forest_from(payload)?).await?))
}

#[utoipa::path(
    path = "/learning-paths/{id}",
    method(get),
    params(
        ("id" = String, Path, description = "Learning path id")
    ),
    responses(
        (status = 200, description = "The learning path", body = LearningPath),
        (status = 404, description = "Unknown learning path", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn get_learning_path(
    State(library): State<Arc<Library>>,
    Path(id): Path<String>,
) -> Result<Json<LearningPath>> {
    Ok(Json(library.read_one(&id).await?))
}

#[utoipa::path(
    path = "/learning-paths/{id}/progress",
    method(get),
    params(
        ("id" = String, Path, description = "Learning path id")
    ),
    responses(
        (status = 200, description = "Derived completion", body = PathProgress),
        (status = 404, description = "Unknown learning path", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn get_learning_path_progress(
    State(library): State<Arc<Library>>,
    Path(id): Path<String>,
) -> Result<Json<PathProgress>> {
    Ok(Json(library.progress(&id).await?))
}

pub fn get_learning_paths_scope() -> Router<Arc<Library>> {
    Router::new()
        .route(
            "/learning-paths",
            get(list_learning_paths)
                .post(create_learning_paths)
                .put(update_learning_paths),
        )
        .route("/learning-paths/{id}", get(get_learning_path))
        .route("/learning-paths/{id}/progress", get(get_learning_path_progress))
}
