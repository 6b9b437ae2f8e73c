//! Reaction endpoints: toggle, status, likers and reconciliation.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use rapshare_common::AppResult;
use rapshare_core::{ReactionStatus, ToggleOutcome};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, ContentPath, MaybeAuthUser},
    middleware::AppState,
    response::LikerResponse,
};

/// Like or unlike an entity.
async fn toggle(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    path: ContentPath,
) -> AppResult<Json<ToggleOutcome>> {
    let outcome = state
        .reaction_service
        .toggle(&user, path.kind, &path.id)
        .await?;
    Ok(Json(outcome))
}

/// Like state of an entity for the caller.
async fn status(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
    path: ContentPath,
) -> AppResult<Json<ReactionStatus>> {
    let status = state
        .reaction_service
        .status(user.as_ref(), path.kind, &path.id)
        .await?;
    Ok(Json(status))
}

/// Likers query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikersQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    10
}

/// Likes on an entity, newest first.
async fn likers(
    State(state): State<AppState>,
    path: ContentPath,
    Query(query): Query<LikersQuery>,
) -> AppResult<Json<Vec<LikerResponse>>> {
    let limit = query.limit.clamp(1, 100);
    let reactions = state
        .reaction_service
        .likers(path.kind, &path.id, limit, query.until_id.as_deref())
        .await?;

    Ok(Json(reactions.into_iter().map(Into::into).collect()))
}

/// Reconcile response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    pub likes_count: i32,
}

/// Recount likes on an entity the caller owns.
async fn reconcile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    path: ContentPath,
) -> AppResult<Json<ReconcileResponse>> {
    let likes_count = state
        .reaction_service
        .reconcile(&user, path.kind, &path.id)
        .await?;
    Ok(Json(ReconcileResponse { likes_count }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{kind}/{id}", post(toggle))
        .route("/{kind}/{id}/status", get(status))
        .route("/{kind}/{id}/likers", get(likers))
        .route("/{kind}/{id}/reconcile", post(reconcile))
}
