//! Kind-agnostic content endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use rapshare_common::AppResult;

use crate::{
    extractors::{AuthUser, ContentPath},
    middleware::AppState,
    response::{ContentResponse, no_content},
};

/// Fetch an entity.
async fn show(State(state): State<AppState>, path: ContentPath) -> AppResult<Json<ContentResponse>> {
    let item = state.content_service.get(path.kind, &path.id).await?;
    Ok(Json(item.into()))
}

/// Delete an entity the caller owns.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    path: ContentPath,
) -> AppResult<StatusCode> {
    state
        .content_service
        .delete(&user, path.kind, &path.id)
        .await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{kind}/{id}", get(show).delete(delete))
}
