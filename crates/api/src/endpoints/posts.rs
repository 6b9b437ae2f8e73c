//! Post and comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::post,
};
use rapshare_common::AppResult;
use rapshare_core::{CreateCommentInput, CreatePostInput};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{CommentResponse, PostResponse},
};

/// Publish a post.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreatePostInput>,
) -> AppResult<Json<PostResponse>> {
    let post = state.content_service.create_post(&user, input).await?;
    Ok(Json(post.into()))
}

/// Comment on a post.
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .content_service
        .create_comment(&user, &post_id, input)
        .await?;
    Ok(Json(comment.into()))
}

/// Comments query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub since_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

/// Comments on a post, oldest first.
async fn comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    let limit = query.limit.clamp(1, 100);
    let comments = state
        .content_service
        .comments(&post_id, limit, query.since_id.as_deref())
        .await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}/comments", post(create_comment).get(comments))
}
