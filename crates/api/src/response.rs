//! API response types.

#![allow(missing_docs)]

use axum::http::StatusCode;
use rapshare_core::ContentItem;
use rapshare_db::entities::{beat, comment, post, reaction, recording, user};
use serde::Serialize;

/// Post response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub created_at: String,
    pub user_id: String,
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_id: Option<String>,
    pub likes_count: i32,
    pub comments_count: i32,
}

impl From<post::Model> for PostResponse {
    fn from(p: post::Model) -> Self {
        Self {
            id: p.id,
            created_at: p.created_at.to_rfc3339(),
            user_id: p.user_id,
            text: p.text,
            recording_id: p.recording_id,
            likes_count: p.likes_count,
            comments_count: p.comments_count,
        }
    }
}

/// Comment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub created_at: String,
    pub post_id: String,
    pub user_id: String,
    pub text: String,
    pub likes_count: i32,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            created_at: c.created_at.to_rfc3339(),
            post_id: c.post_id,
            user_id: c.user_id,
            text: c.text,
            likes_count: c.likes_count,
        }
    }
}

/// Beat response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatResponse {
    pub id: String,
    pub created_at: String,
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<i32>,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub likes_count: i32,
}

impl From<beat::Model> for BeatResponse {
    fn from(b: beat::Model) -> Self {
        Self {
            id: b.id,
            created_at: b.created_at.to_rfc3339(),
            user_id: b.user_id,
            title: b.title,
            bpm: b.bpm,
            url: b.url,
            content_type: b.content_type,
            size: b.size,
            likes_count: b.likes_count,
        }
    }
}

/// Recording response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResponse {
    pub id: String,
    pub created_at: String,
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beat_id: Option<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: i64,
    pub likes_count: i32,
    pub comments_count: i32,
}

impl From<recording::Model> for RecordingResponse {
    fn from(r: recording::Model) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at.to_rfc3339(),
            user_id: r.user_id,
            title: r.title,
            beat_id: r.beat_id,
            url: r.url,
            content_type: r.content_type,
            size: r.size,
            likes_count: r.likes_count,
            comments_count: r.comments_count,
        }
    }
}

/// Any content entity, tagged with its kind.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentResponse {
    Post(PostResponse),
    Recording(RecordingResponse),
    Beat(BeatResponse),
    Comment(CommentResponse),
}

impl From<ContentItem> for ContentResponse {
    fn from(item: ContentItem) -> Self {
        match item {
            ContentItem::Post(m) => Self::Post(m.into()),
            ContentItem::Recording(m) => Self::Recording(m.into()),
            ContentItem::Beat(m) => Self::Beat(m.into()),
            ContentItem::Comment(m) => Self::Comment(m.into()),
        }
    }
}

/// One like, as listed under an entity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikerResponse {
    pub id: String,
    pub created_at: String,
    pub user_id: String,
}

impl From<reaction::Model> for LikerResponse {
    fn from(r: reaction::Model) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at.to_rfc3339(),
            user_id: r.user_id,
        }
    }
}

/// Public user response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            username: u.username,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Empty success response.
#[must_use]
pub const fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_content_response_is_tagged_with_kind() {
        let item = ContentItem::Comment(comment::Model {
            id: "c1".to_string(),
            post_id: "p1".to_string(),
            user_id: "u1".to_string(),
            text: "fire".to_string(),
            likes_count: 2,
            created_at: Utc::now().into(),
        });

        let json = serde_json::to_value(ContentResponse::from(item)).unwrap();

        assert_eq!(json["kind"], "comment");
        assert_eq!(json["postId"], "p1");
        assert_eq!(json["likesCount"], 2);
    }
}
