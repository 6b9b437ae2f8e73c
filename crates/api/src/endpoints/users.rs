//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use rapshare_common::{AppError, AppResult};
use rapshare_db::entities::ContentKind;
use serde::Deserialize;

use crate::{
    middleware::AppState,
    response::{ContentResponse, UserResponse},
};

/// Show a user.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get(&id).await?;
    Ok(Json(user.into()))
}

/// Pagination query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

/// A user's posts, beats or recordings.
async fn content(
    State(state): State<AppState>,
    Path((id, kind)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Vec<ContentResponse>>> {
    let kind: ContentKind = kind.parse().map_err(AppError::NotFound)?;
    let limit = query.limit.clamp(1, 100);

    let items = state
        .content_service
        .list_by_user(&id, kind, limit, query.until_id.as_deref())
        .await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(show))
        .route("/{id}/{kind}", get(content))
}
