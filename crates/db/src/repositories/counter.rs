//! Counter repository (denormalized like/comment counts).
//!
//! All four content tables share the `id`, `user_id` and `likes_count`
//! columns, so the counter statements are built once against the table named
//! by [`ContentKind`]. Every change is a single `UPDATE` relative to the
//! stored value; nothing here reads a count and writes it back.

use std::sync::Arc;

use crate::entities::ContentKind;
use rapshare_common::{AppError, AppResult};
use sea_orm::sea_query::{Alias, Expr, Query, SimpleExpr, UpdateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection};

const ID: &str = "id";
const USER_ID: &str = "user_id";
const LIKES_COUNT: &str = "likes_count";
const COMMENTS_COUNT: &str = "comments_count";

/// Owner and counters of one content entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCounters {
    /// Owning user.
    pub owner_id: String,
    /// Denormalized like count.
    pub likes_count: i32,
    /// Denormalized comment count, for kinds that have comments.
    pub comments_count: Option<i32>,
}

/// Counter repository for database operations.
#[derive(Clone)]
pub struct CounterRepository {
    db: Arc<DatabaseConnection>,
}

impl CounterRepository {
    /// Create a new counter repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// The pooled connection, for reads outside a transaction.
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    /// Read the owner and counters of an entity. `None` if it does not exist.
    pub async fn get<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<Option<ContentCounters>> {
        let mut select = Query::select();
        select
            .column(Alias::new(USER_ID))
            .column(Alias::new(LIKES_COUNT))
            .from(Alias::new(kind.table_name()))
            .and_where(Expr::col(Alias::new(ID)).eq(id));
        if kind.has_comments() {
            select.column(Alias::new(COMMENTS_COUNT));
        }

        let row = conn
            .query_one(conn.get_database_backend().build(&select))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let owner_id = row
            .try_get::<String>("", USER_ID)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let likes_count = row
            .try_get::<i32>("", LIKES_COUNT)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let comments_count = if kind.has_comments() {
            Some(
                row.try_get::<i32>("", COMMENTS_COUNT)
                    .map_err(|e| AppError::Database(e.to_string()))?,
            )
        } else {
            None
        };

        Ok(Some(ContentCounters {
            owner_id,
            likes_count,
            comments_count,
        }))
    }

    /// `likes_count = likes_count + 1`.
    pub async fn increment<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<()> {
        let expr = Expr::col(Alias::new(LIKES_COUNT)).add(1);
        self.update(conn, kind, id, LIKES_COUNT, expr).await
    }

    /// `likes_count = GREATEST(likes_count - 1, 0)`.
    pub async fn decrement<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<()> {
        let expr = Expr::cust(format!("GREATEST({LIKES_COUNT} - 1, 0)"));
        self.update(conn, kind, id, LIKES_COUNT, expr).await
    }

    /// Overwrite `likes_count`; used by reconciliation.
    pub async fn set<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
        value: i32,
    ) -> AppResult<()> {
        self.update(conn, kind, id, LIKES_COUNT, Expr::value(value.max(0)))
            .await
    }

    /// `comments_count = comments_count + 1`.
    pub async fn increment_comments<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<()> {
        Self::ensure_has_comments(kind)?;
        let expr = Expr::col(Alias::new(COMMENTS_COUNT)).add(1);
        self.update(conn, kind, id, COMMENTS_COUNT, expr).await
    }

    /// `comments_count = GREATEST(comments_count - 1, 0)`.
    pub async fn decrement_comments<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<()> {
        Self::ensure_has_comments(kind)?;
        let expr = Expr::cust(format!("GREATEST({COMMENTS_COUNT} - 1, 0)"));
        self.update(conn, kind, id, COMMENTS_COUNT, expr).await
    }

    fn ensure_has_comments(kind: ContentKind) -> AppResult<()> {
        if kind.has_comments() {
            Ok(())
        } else {
            Err(AppError::Internal(format!("{kind} has no comments_count")))
        }
    }

    async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
        column: &'static str,
        expr: SimpleExpr,
    ) -> AppResult<()> {
        let stmt = update_statement(kind, id, column, expr);

        let result = conn
            .execute(conn.get_database_backend().build(&stmt))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{kind}: {id}")));
        }

        tracing::trace!(kind = %kind, id = %id, column, "Counter updated");
        Ok(())
    }
}

fn update_statement(
    kind: ContentKind,
    id: &str,
    column: &'static str,
    expr: SimpleExpr,
) -> UpdateStatement {
    Query::update()
        .table(Alias::new(kind.table_name()))
        .value(Alias::new(column), expr)
        .and_where(Expr::col(Alias::new(ID)).eq(id))
        .to_owned()
}
