//! Beat repository.

use std::sync::Arc;

use crate::entities::{Beat, beat};
use rapshare_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Beat repository for database operations.
#[derive(Clone)]
pub struct BeatRepository {
    db: Arc<DatabaseConnection>,
}

impl BeatRepository {
    /// Create a new beat repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a beat by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<beat::Model>> {
        Beat::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a beat by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<beat::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("beat: {id}")))
    }

    /// Beats uploaded by a user, newest first (paginated).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<beat::Model>> {
        let mut query = Beat::find()
            .filter(beat::Column::UserId.eq(user_id))
            .order_by_desc(beat::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(beat::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new beat.
    pub async fn create(&self, model: beat::ActiveModel) -> AppResult<beat::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
