use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::patch,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    curriculum::{Library, SubChapter},
    error::{Error, ErrorBody, Result},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetCompletedRequest {
    pub completed: bool,
}

#[utoipa::path(
    path = "/sub-chapters/{id}",
    method(patch),
    params(
        ("id" = String, Path, description = "Sub-chapter id")
    ),
    request_body = SetCompletedRequest,
    responses(
        (status = 200, description = "Sub-chapter after the update", body = SubChapter),
        (status = 400, description = "Body is not {\"completed\": bool}", body = ErrorBody),
        (status = 404, description = "Unknown sub-chapter", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn set_completed(
    State(library): State<Arc<Library>>,
    Path(id): Path<String>,
    payload: Result<Json<SetCompletedRequest>, JsonRejection>,
) -> Result<Json<SubChapter>> {
    let Json(SetCompletedRequest { completed }) =
        payload.map_err(|e| Error::InvalidInput(e.body_text()))?;
    Ok(Json(library.set_completed(&id, completed).await?))
}

pub fn get_sub_chapters_scope() -> Router<Arc<Library>> {
    Router::new().route("/sub-chapters/{id}", patch(set_completed))
}
