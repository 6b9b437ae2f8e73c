//! Reaction repository (the reaction store).
//!
//! Write operations take the connection explicitly so the toggle can run the
//! existence check, the row mutation and the counter update in one
//! transaction.

use std::sync::Arc;

use crate::entities::{Comment, ContentKind, Reaction, comment, reaction};
use rapshare_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set, SqlErr,
    TransactionTrait,
};

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// The pooled connection, for reads outside a transaction.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Start a transaction on the pooled connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the reaction of `user_id` on a target.
    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetKind.eq(kind))
            .filter(reaction::Column::TargetId.eq(target_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether `user_id` currently likes the target.
    pub async fn exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<bool> {
        Ok(self.find(conn, user_id, kind, target_id).await?.is_some())
    }

    /// Insert a reaction.
    ///
    /// Fails with [`AppError::Conflict`] when the `(user, target)` pair already
    /// has one; the unique index enforces this even for concurrent inserts.
    pub async fn create<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<reaction::Model> {
        let model = reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            target_kind: Set(kind),
            target_id: Set(target_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        model.insert(conn).await.map_err(|e| map_insert_err(&e, kind, target_id))
    }

    /// Delete the reaction of `user_id` on a target.
    ///
    /// Fails with [`AppError::NotFound`] when there was nothing to delete.
    pub async fn remove<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<()> {
        let result = Reaction::delete_many()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetKind.eq(kind))
            .filter(reaction::Column::TargetId.eq(target_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Reaction on {kind} {target_id}"
            )));
        }
        Ok(())
    }

    /// Count reaction rows for a target.
    pub async fn count_for<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<u64> {
        Reaction::find()
            .filter(reaction::Column::TargetKind.eq(kind))
            .filter(reaction::Column::TargetId.eq(target_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reactions on a target, newest first (paginated).
    pub async fn list_for(
        &self,
        kind: ContentKind,
        target_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<reaction::Model>> {
        let mut query = Reaction::find()
            .filter(reaction::Column::TargetKind.eq(kind))
            .filter(reaction::Column::TargetId.eq(target_id))
            .order_by_desc(reaction::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(reaction::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every reaction on a target. Returns the number of rows removed.
    pub async fn delete_for_target<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        target_id: &str,
    ) -> AppResult<u64> {
        let result = Reaction::delete_many()
            .filter(reaction::Column::TargetKind.eq(kind))
            .filter(reaction::Column::TargetId.eq(target_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete reactions on every comment of a post.
    ///
    /// The comments themselves go away through the foreign-key cascade, but
    /// reactions have no foreign key to their target.
    pub async fn delete_for_post_comments<C: ConnectionTrait>(
        &self,
        conn: &C,
        post_id: &str,
    ) -> AppResult<u64> {
        let comment_ids = Comment::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::PostId.eq(post_id))
            .into_query();

        let result = Reaction::delete_many()
            .filter(reaction::Column::TargetKind.eq(ContentKind::Comment))
            .filter(reaction::Column::TargetId.in_subquery(comment_ids))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

fn map_insert_err(err: &DbErr, kind: ContentKind, target_id: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("Already liked {kind} {target_id}"))
        }
        _ => AppError::Database(err.to_string()),
    }
}
