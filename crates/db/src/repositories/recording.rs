//! Recording repository.

use std::sync::Arc;

use crate::entities::{Recording, recording};
use rapshare_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Recording repository for database operations.
#[derive(Clone)]
pub struct RecordingRepository {
    db: Arc<DatabaseConnection>,
}

impl RecordingRepository {
    /// Create a new recording repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a recording by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<recording::Model>> {
        Recording::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a recording by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<recording::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recording: {id}")))
    }

    /// Recordings uploaded by a user, newest first (paginated).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<recording::Model>> {
        let mut query = Recording::find()
            .filter(recording::Column::UserId.eq(user_id))
            .order_by_desc(recording::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(recording::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new recording.
    pub async fn create(&self, model: recording::ActiveModel) -> AppResult<recording::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
