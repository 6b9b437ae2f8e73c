//! Content repository: kind-agnostic row deletion.

use std::sync::Arc;

use crate::entities::ContentKind;
use rapshare_common::{AppError, AppResult};
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};

/// Content repository for operations shared by every content kind.
#[derive(Clone)]
pub struct ContentRepository {
    db: Arc<DatabaseConnection>,
}

impl ContentRepository {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction on the pooled connection.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the row of an entity. Returns whether a row was removed.
    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<bool> {
        let stmt = Query::delete()
            .from_table(Alias::new(kind.table_name()))
            .and_where(Expr::col(Alias::new("id")).eq(id))
            .to_owned();

        let result = conn
            .execute(conn.get_database_backend().build(&stmt))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
