//! Content service: posts, comments, beats and recordings.

use std::sync::Arc;

use crate::services::storage_cleanup::StorageCleanup;
use rapshare_common::{AppError, AppResult, IdGenerator, SharedStorage, generate_storage_key};
use rapshare_db::{
    entities::{ContentKind, beat, comment, post, recording, user},
    repositories::{
        BeatRepository, ContentRepository, CounterRepository, PostRepository, ReactionRepository,
        RecordingRepository,
    },
};
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use validator::Validate;

/// Default upload limit when none is configured (50MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Input for creating a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    #[validate(length(max = 3000))]
    pub text: Option<String>,

    pub recording_id: Option<String>,
}

/// Input for commenting on a post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

/// An uploaded audio file, before it reaches storage.
#[derive(Debug, Clone)]
pub struct AudioFile {
    /// Client-side file name; only its extension is kept.
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Input for uploading a beat.
#[derive(Debug, Validate)]
pub struct UploadBeatInput {
    #[validate(length(min = 1, max = 128))]
    pub title: String,

    #[validate(range(min = 1, max = 400))]
    pub bpm: Option<i32>,

    pub file: AudioFile,
}

/// Input for uploading a recording.
#[derive(Debug, Validate)]
pub struct UploadRecordingInput {
    #[validate(length(min = 1, max = 128))]
    pub title: String,

    pub beat_id: Option<String>,

    pub file: AudioFile,
}

/// Any content entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Post(post::Model),
    Recording(recording::Model),
    Beat(beat::Model),
    Comment(comment::Model),
}

impl ContentItem {
    /// Owning user.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Post(m) => &m.user_id,
            Self::Recording(m) => &m.user_id,
            Self::Beat(m) => &m.user_id,
            Self::Comment(m) => &m.user_id,
        }
    }

    /// Object-store key, for kinds that own a file.
    #[must_use]
    pub fn storage_key(&self) -> Option<&str> {
        match self {
            Self::Recording(m) => Some(&m.storage_key),
            Self::Beat(m) => Some(&m.storage_key),
            Self::Post(_) | Self::Comment(_) => None,
        }
    }
}

/// Content service for business logic.
#[derive(Clone)]
pub struct ContentService {
    post_repo: PostRepository,
    beat_repo: BeatRepository,
    recording_repo: RecordingRepository,
    content_repo: ContentRepository,
    reaction_repo: ReactionRepository,
    counter_repo: CounterRepository,
    storage: SharedStorage,
    cleanup: StorageCleanup,
    max_upload_bytes: usize,
    id_gen: IdGenerator,
}

impl ContentService {
    /// Create a new content service backed by `db` and `storage`.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, storage: SharedStorage, cleanup: StorageCleanup) -> Self {
        Self {
            post_repo: PostRepository::new(Arc::clone(&db)),
            beat_repo: BeatRepository::new(Arc::clone(&db)),
            recording_repo: RecordingRepository::new(Arc::clone(&db)),
            content_repo: ContentRepository::new(Arc::clone(&db)),
            reaction_repo: ReactionRepository::new(Arc::clone(&db)),
            counter_repo: CounterRepository::new(db),
            storage,
            cleanup,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the largest accepted upload.
    #[must_use]
    pub const fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    // ==================== Creation ====================

    /// Publish a post. Needs text, a recording, or both.
    pub async fn create_post(
        &self,
        caller: &user::Model,
        input: CreatePostInput,
    ) -> AppResult<post::Model> {
        input.validate()?;

        let text = input.text.filter(|t| !t.trim().is_empty());
        if text.is_none() && input.recording_id.is_none() {
            return Err(AppError::Validation(
                "Post needs text or a recording".to_string(),
            ));
        }

        if let Some(ref recording_id) = input.recording_id {
            self.recording_repo.get_by_id(recording_id).await?;
        }

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(caller.id.clone()),
            text: Set(text),
            recording_id: Set(input.recording_id),
            likes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = self.post_repo.create(model).await?;
        tracing::info!(post_id = %created.id, user_id = %caller.id, "Post created");
        Ok(created)
    }

    /// Comment on a post and bump its `comments_count` in the same transaction.
    pub async fn create_comment(
        &self,
        caller: &user::Model,
        post_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;
        self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post_id.to_string()),
            user_id: Set(caller.id.clone()),
            text: Set(input.text),
            likes_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        let txn = self.post_repo.begin().await?;
        let created = self.post_repo.create_comment(&txn, model).await?;
        self.counter_repo
            .increment_comments(&txn, ContentKind::Post, post_id)
            .await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Comments on a post, oldest first.
    pub async fn comments(
        &self,
        post_id: &str,
        limit: u64,
        since_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        self.post_repo.get_by_id(post_id).await?;
        self.post_repo.find_comments(post_id, limit, since_id).await
    }

    /// Store an instrumental and record it.
    pub async fn upload_beat(
        &self,
        caller: &user::Model,
        input: UploadBeatInput,
    ) -> AppResult<beat::Model> {
        input.validate()?;
        self.check_audio(&input.file)?;

        let key = generate_storage_key("beats", &caller.id, &input.file.name);
        let uploaded = self
            .storage
            .upload(&key, &input.file.data, &input.file.content_type)
            .await?;
        let size = match stored_size(uploaded.size) {
            Ok(size) => size,
            Err(e) => {
                self.discard_file(&uploaded.key).await;
                return Err(e);
            }
        };

        let model = beat::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(caller.id.clone()),
            title: Set(input.title),
            bpm: Set(input.bpm),
            storage_key: Set(uploaded.key.clone()),
            url: Set(uploaded.url),
            content_type: Set(uploaded.content_type),
            size: Set(size),
            likes_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        match self.beat_repo.create(model).await {
            Ok(created) => {
                tracing::info!(beat_id = %created.id, user_id = %caller.id, "Beat uploaded");
                Ok(created)
            }
            Err(e) => {
                self.discard_file(&uploaded.key).await;
                Err(e)
            }
        }
    }

    /// Store a vocal take and record it.
    pub async fn upload_recording(
        &self,
        caller: &user::Model,
        input: UploadRecordingInput,
    ) -> AppResult<recording::Model> {
        input.validate()?;
        self.check_audio(&input.file)?;

        if let Some(ref beat_id) = input.beat_id {
            self.beat_repo.get_by_id(beat_id).await?;
        }

        let key = generate_storage_key("recordings", &caller.id, &input.file.name);
        let uploaded = self
            .storage
            .upload(&key, &input.file.data, &input.file.content_type)
            .await?;
        let size = match stored_size(uploaded.size) {
            Ok(size) => size,
            Err(e) => {
                self.discard_file(&uploaded.key).await;
                return Err(e);
            }
        };

        let model = recording::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(caller.id.clone()),
            title: Set(input.title),
            beat_id: Set(input.beat_id),
            storage_key: Set(uploaded.key.clone()),
            url: Set(uploaded.url),
            content_type: Set(uploaded.content_type),
            size: Set(size),
            likes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
        };

        match self.recording_repo.create(model).await {
            Ok(created) => {
                tracing::info!(
                    recording_id = %created.id,
                    user_id = %caller.id,
                    "Recording uploaded"
                );
                Ok(created)
            }
            Err(e) => {
                self.discard_file(&uploaded.key).await;
                Err(e)
            }
        }
    }

    fn check_audio(&self, file: &AudioFile) -> AppResult<()> {
        if !file.content_type.starts_with("audio/") {
            return Err(AppError::Validation(format!(
                "Unsupported content type: {}",
                file.content_type
            )));
        }
        if file.data.is_empty() {
            return Err(AppError::Validation("Empty file".to_string()));
        }
        if file.data.len() > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File exceeds {} bytes",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    // ==================== Lookup ====================

    /// Fetch any entity by kind and ID.
    pub async fn get(&self, kind: ContentKind, id: &str) -> AppResult<ContentItem> {
        Ok(match kind {
            ContentKind::Post => ContentItem::Post(self.post_repo.get_by_id(id).await?),
            ContentKind::Recording => {
                ContentItem::Recording(self.recording_repo.get_by_id(id).await?)
            }
            ContentKind::Beat => ContentItem::Beat(self.beat_repo.get_by_id(id).await?),
            ContentKind::Comment => ContentItem::Comment(self.post_repo.get_comment(id).await?),
        })
    }

    /// A user's posts, beats or recordings, newest first.
    pub async fn list_by_user(
        &self,
        user_id: &str,
        kind: ContentKind,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<ContentItem>> {
        Ok(match kind {
            ContentKind::Post => self
                .post_repo
                .find_by_user(user_id, limit, until_id)
                .await?
                .into_iter()
                .map(ContentItem::Post)
                .collect(),
            ContentKind::Recording => self
                .recording_repo
                .find_by_user(user_id, limit, until_id)
                .await?
                .into_iter()
                .map(ContentItem::Recording)
                .collect(),
            ContentKind::Beat => self
                .beat_repo
                .find_by_user(user_id, limit, until_id)
                .await?
                .into_iter()
                .map(ContentItem::Beat)
                .collect(),
            ContentKind::Comment => {
                return Err(AppError::BadRequest(
                    "Comments are listed per post".to_string(),
                ));
            }
        })
    }

    // ==================== Deletion ====================

    /// Delete an entity owned by `caller`.
    ///
    /// The stored file, if any, is removed first on a best-effort basis: a
    /// failure is logged and handed to the cleanup queue, and the row is
    /// deleted regardless. Reactions on the entity (and on a post's comments)
    /// go in the same transaction as the row.
    pub async fn delete(&self, caller: &user::Model, kind: ContentKind, id: &str) -> AppResult<()> {
        let item = self.get(kind, id).await?;

        if item.owner_id() != caller.id {
            return Err(AppError::Forbidden(format!("Not your {kind}")));
        }

        if let Some(key) = item.storage_key() {
            self.discard_file(key).await;
        }

        let txn = self.content_repo.begin().await?;

        let reactions_removed = self.reaction_repo.delete_for_target(&txn, kind, id).await?;
        match &item {
            ContentItem::Post(post) => {
                self.reaction_repo
                    .delete_for_post_comments(&txn, &post.id)
                    .await?;
            }
            ContentItem::Comment(comment) => {
                self.counter_repo
                    .decrement_comments(&txn, ContentKind::Post, &comment.post_id)
                    .await?;
            }
            ContentItem::Recording(_) | ContentItem::Beat(_) => {}
        }

        if !self.content_repo.delete(&txn, kind, id).await? {
            return Err(AppError::NotFound(format!("{kind}: {id}")));
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            kind = %kind,
            id = %id,
            user_id = %caller.id,
            reactions_removed,
            "Content deleted"
        );
        Ok(())
    }

    async fn discard_file(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(
                storage_key = %key,
                error = %e,
                "Failed to delete file from storage, queued for retry"
            );
            self.cleanup.enqueue(key.to_string());
        }
    }
}

fn stored_size(size: u64) -> AppResult<i64> {
    i64::try_from(size).map_err(|_| AppError::Internal(format!("File size {size} out of range")))
}
