//! Reaction service: like/unlike toggling for every content kind.

use rapshare_common::{AppError, AppResult};
use rapshare_db::{
    entities::{ContentKind, reaction, user},
    repositories::{ContentCounters, CounterRepository, ReactionRepository},
};
use sea_orm::ConnectionTrait;
use serde::Serialize;

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    /// Whether the caller likes the entity after the toggle.
    pub liked: bool,
    /// Like count read back after the change.
    pub likes_count: i32,
}

/// Reaction state of an entity as seen by one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionStatus {
    /// Whether the caller likes the entity.
    pub is_liked: bool,
    pub likes_count: i32,
    /// Present for posts and recordings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_count: Option<i32>,
}

/// What a single toggle attempt did to the `(user, entity)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flip {
    Liked,
    Unliked,
    /// Another toggle by the same user changed the pair first.
    Raced { liked: bool },
}

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    counter_repo: CounterRepository,
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub const fn new(reaction_repo: ReactionRepository, counter_repo: CounterRepository) -> Self {
        Self {
            reaction_repo,
            counter_repo,
        }
    }

    /// Flip the caller's like on an entity.
    ///
    /// The existence check, the reaction row change and the counter update
    /// run in one transaction, and the returned count is read back inside it.
    /// A concurrent toggle by the same caller can change the pair between the
    /// check and the write: an insert then hits the unique index, a delete
    /// finds nothing. Either way this transaction is rolled back and the state
    /// the other toggle left behind is reported with a fresh count.
    pub async fn toggle(
        &self,
        caller: &user::Model,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<ToggleOutcome> {
        let txn = self.reaction_repo.begin().await?;

        let liked = match self.flip(&txn, &caller.id, kind, id).await? {
            Flip::Liked => true,
            Flip::Unliked => false,
            Flip::Raced { liked } => {
                txn.rollback()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                tracing::debug!(
                    user_id = %caller.id,
                    kind = %kind,
                    id = %id,
                    liked,
                    "Concurrent toggle already applied"
                );
                let counters = self.counters(self.counter_repo.db(), kind, id).await?;
                return Ok(ToggleOutcome {
                    liked,
                    likes_count: counters.likes_count,
                });
            }
        };

        let counters = self.counters(&txn, kind, id).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(
            user_id = %caller.id,
            kind = %kind,
            id = %id,
            liked,
            likes_count = counters.likes_count,
            "Reaction toggled"
        );

        Ok(ToggleOutcome {
            liked,
            likes_count: counters.likes_count,
        })
    }

    async fn flip<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<Flip> {
        // Resolve the target before touching anything; past this point a
        // NotFound from the store means the reaction row, not the entity.
        self.counters(conn, kind, id).await?;

        if self.reaction_repo.exists(conn, user_id, kind, id).await? {
            match self.reaction_repo.remove(conn, user_id, kind, id).await {
                Ok(()) => {}
                Err(AppError::NotFound(_)) => return Ok(Flip::Raced { liked: false }),
                Err(e) => return Err(e),
            }
            self.counter_repo.decrement(conn, kind, id).await?;
            Ok(Flip::Unliked)
        } else {
            match self.reaction_repo.create(conn, user_id, kind, id).await {
                Ok(_) => {}
                Err(AppError::Conflict(_)) => return Ok(Flip::Raced { liked: true }),
                Err(e) => return Err(e),
            }
            self.counter_repo.increment(conn, kind, id).await?;
            Ok(Flip::Liked)
        }
    }

    /// Like state and counters of an entity. Anonymous callers never like anything.
    pub async fn status(
        &self,
        caller: Option<&user::Model>,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<ReactionStatus> {
        let db = self.counter_repo.db();
        let counters = self.counters(db, kind, id).await?;

        let is_liked = match caller {
            Some(user) => self.reaction_repo.exists(db, &user.id, kind, id).await?,
            None => false,
        };

        Ok(ReactionStatus {
            is_liked,
            likes_count: counters.likes_count,
            comments_count: counters.comments_count,
        })
    }

    /// Reactions on an entity, newest first.
    pub async fn likers(
        &self,
        kind: ContentKind,
        id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<reaction::Model>> {
        self.counters(self.counter_repo.db(), kind, id).await?;
        self.reaction_repo.list_for(kind, id, limit, until_id).await
    }

    /// Recount reaction rows and overwrite `likes_count`. Only the owner may do this.
    pub async fn reconcile(
        &self,
        caller: &user::Model,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<i32> {
        let txn = self.reaction_repo.begin().await?;

        let counters = self.counters(&txn, kind, id).await?;
        if counters.owner_id != caller.id {
            return Err(AppError::Forbidden(format!("Not your {kind}")));
        }

        let actual = self.reaction_repo.count_for(&txn, kind, id).await?;
        let actual = i32::try_from(actual)
            .map_err(|_| AppError::Internal(format!("Reaction count overflow on {kind} {id}")))?;

        if actual != counters.likes_count {
            tracing::warn!(
                kind = %kind,
                id = %id,
                stored = counters.likes_count,
                actual,
                "Like counter drifted, resetting"
            );
            self.counter_repo.set(&txn, kind, id, actual).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(actual)
    }

    async fn counters<C: ConnectionTrait>(
        &self,
        conn: &C,
        kind: ContentKind,
        id: &str,
    ) -> AppResult<ContentCounters> {
        self.counter_repo
            .get(conn, kind, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{kind}: {id}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            token: Some(format!("token-{id}")),
            created_at: Utc::now().into(),
        }
    }

    fn counters_row(owner: &str, likes: i32) -> BTreeMap<&'static str, Value> {
        btreemap! {
            "user_id" => Into::<Value>::into(owner),
            "likes_count" => Into::<Value>::into(likes),
            "comments_count" => Into::<Value>::into(0i32),
        }
    }

    fn reaction_row(user_id: &str, target_id: &str) -> reaction::Model {
        reaction::Model {
            id: format!("r-{user_id}"),
            user_id: user_id.to_string(),
            target_kind: ContentKind::Post,
            target_id: target_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: MockDatabase) -> ReactionService {
        let db = Arc::new(db.into_connection());
        ReactionService::new(
            ReactionRepository::new(Arc::clone(&db)),
            CounterRepository::new(db),
        )
    }

    /// Mock results for a toggle-on: counters, no existing reaction, insert,
    /// increment, counters read back.
    fn like_results(db: MockDatabase, user_id: &str, before: i32) -> MockDatabase {
        db.append_query_results([[counters_row("author", before)]])
            .append_query_results([Vec::<reaction::Model>::new()])
            .append_query_results([[reaction_row(user_id, "post1")]])
            .append_exec_results([exec(1)])
            .append_query_results([[counters_row("author", before + 1)]])
    }

    /// Mock results for a toggle-off.
    fn unlike_results(db: MockDatabase, user_id: &str, before: i32) -> MockDatabase {
        db.append_query_results([[counters_row("author", before)]])
            .append_query_results([[reaction_row(user_id, "post1")]])
            .append_exec_results([exec(1), exec(1)])
            .append_query_results([[counters_row("author", before - 1)]])
    }

    #[tokio::test]
    async fn test_toggle_on() {
        let svc = service(like_results(
            MockDatabase::new(DatabaseBackend::Postgres),
            "fan",
            4,
        ));

        let outcome = svc
            .toggle(&user("fan"), ContentKind::Post, "post1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome {
                liked: true,
                likes_count: 5
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);
        let db = unlike_results(like_results(db, "fan", 3), "fan", 4);
        let svc = service(db);
        let fan = user("fan");

        let first = svc.toggle(&fan, ContentKind::Post, "post1").await.unwrap();
        let second = svc.toggle(&fan, ContentKind::Post, "post1").await.unwrap();

        assert!(first.liked);
        assert_eq!(first.likes_count, 4);
        assert!(!second.liked);
        assert_eq!(second.likes_count, 3);
    }

    #[tokio::test]
    async fn test_two_users_then_first_unlikes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);
        let db = like_results(db, "u1", 0);
        let db = like_results(db, "u2", 1);
        let db = unlike_results(db, "u1", 2);
        let svc = service(db);

        let a = svc
            .toggle(&user("u1"), ContentKind::Post, "post1")
            .await
            .unwrap();
        let b = svc
            .toggle(&user("u2"), ContentKind::Post, "post1")
            .await
            .unwrap();
        let c = svc
            .toggle(&user("u1"), ContentKind::Post, "post1")
            .await
            .unwrap();

        assert_eq!((a.liked, a.likes_count), (true, 1));
        assert_eq!((b.liked, b.likes_count), (true, 2));
        assert_eq!((c.liked, c.likes_count), (false, 1));
    }

    #[tokio::test]
    async fn test_toggle_missing_entity_is_not_found() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<BTreeMap<&str, Value>>::new()]),
        );

        let result = svc.toggle(&user("fan"), ContentKind::Beat, "ghost").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_unlike_reports_unliked() {
        // The reaction was seen, but another toggle deleted it first.
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[counters_row("author", 1)]])
                .append_query_results([[reaction_row("fan", "post1")]])
                .append_exec_results([exec(0)])
                .append_query_results([[counters_row("author", 0)]]),
        );

        let outcome = svc
            .toggle(&user("fan"), ContentKind::Post, "post1")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ToggleOutcome {
                liked: false,
                likes_count: 0
            }
        );
    }

    #[tokio::test]
    async fn test_status_anonymous() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[counters_row("author", 5)]]),
        );

        let status = svc.status(None, ContentKind::Post, "post1").await.unwrap();

        assert_eq!(
            status,
            ReactionStatus {
                is_liked: false,
                likes_count: 5,
                comments_count: Some(0),
            }
        );
    }

    #[tokio::test]
    async fn test_status_for_liker() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[counters_row("author", 1)]])
                .append_query_results([[reaction_row("fan", "post1")]]),
        );

        let fan = user("fan");
        let status = svc
            .status(Some(&fan), ContentKind::Post, "post1")
            .await
            .unwrap();

        assert!(status.is_liked);
        assert_eq!(status.likes_count, 1);
    }

    #[tokio::test]
    async fn test_status_serializes_camel_case() {
        let json = serde_json::to_value(ReactionStatus {
            is_liked: false,
            likes_count: 5,
            comments_count: None,
        })
        .unwrap();

        assert_eq!(json, serde_json::json!({"isLiked": false, "likesCount": 5}));
    }

    #[tokio::test]
    async fn test_reconcile_resets_drifted_counter() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[counters_row("author", 7)]])
                .append_query_results([[btreemap! {
                    "num_items" => Into::<Value>::into(2i64),
                }]])
                .append_exec_results([exec(1)]),
        );

        let count = svc
            .reconcile(&user("author"), ContentKind::Post, "post1")
            .await
            .unwrap();

        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_reconcile_requires_owner() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[counters_row("author", 7)]]),
        );

        let result = svc
            .reconcile(&user("someone"), ContentKind::Post, "post1")
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
