//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `rapshare_test`)
//!   `TEST_DB_PASSWORD` (default: `rapshare_test`)
//!   `TEST_DB_NAME` (default: `rapshare_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rapshare_common::AppError;
use rapshare_db::entities::ContentKind;
use rapshare_db::repositories::{ContentRepository, CounterRepository, ReactionRepository};
use rapshare_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::TransactionTrait;

struct Repos {
    reactions: ReactionRepository,
    counters: CounterRepository,
    content: ContentRepository,
}

fn repos(db: &TestDatabase) -> Repos {
    let conn = db.shared();
    Repos {
        reactions: ReactionRepository::new(Arc::clone(&conn)),
        counters: CounterRepository::new(Arc::clone(&conn)),
        content: ContentRepository::new(conn),
    }
}

async fn likes(repos: &Repos, kind: ContentKind, id: &str) -> i32 {
    repos
        .counters
        .get(repos.counters.db(), kind, id)
        .await
        .unwrap()
        .unwrap()
        .likes_count
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_like_then_unlike_restores_count() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let author = db.seed_user("author").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let post = db.seed_post(&author.id, "first verse").await.unwrap();

    let txn = db.connection().begin().await.unwrap();
    repos
        .reactions
        .create(&txn, &fan.id, ContentKind::Post, &post.id)
        .await
        .unwrap();
    repos
        .counters
        .increment(&txn, ContentKind::Post, &post.id)
        .await
        .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(likes(&repos, ContentKind::Post, &post.id).await, 1);

    let txn = db.connection().begin().await.unwrap();
    repos
        .reactions
        .remove(&txn, &fan.id, ContentKind::Post, &post.id)
        .await
        .unwrap();
    repos
        .counters
        .decrement(&txn, ContentKind::Post, &post.id)
        .await
        .unwrap();
    txn.commit().await.unwrap();

    assert_eq!(likes(&repos, ContentKind::Post, &post.id).await, 0);
    assert!(
        !repos
            .reactions
            .exists(repos.reactions.db(), &fan.id, ContentKind::Post, &post.id)
            .await
            .unwrap()
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_reaction_is_conflict() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let producer = db.seed_user("producer").await.unwrap();
    let beat = db.seed_beat(&producer.id, "beats/a.mp3").await.unwrap();

    repos
        .reactions
        .create(repos.reactions.db(), &producer.id, ContentKind::Beat, &beat.id)
        .await
        .unwrap();
    let second = repos
        .reactions
        .create(repos.reactions.db(), &producer.id, ContentKind::Beat, &beat.id)
        .await;

    assert!(matches!(second, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_same_user_inserts_create_one_row() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let author = db.seed_user("author").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let post = db.seed_post(&author.id, "hook").await.unwrap();

    let attempts = (0..8).map(|_| {
        repos
            .reactions
            .create(repos.reactions.db(), &fan.id, ContentKind::Post, &post.id)
    });
    let results = futures::future::join_all(attempts).await;

    let created = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(
        repos
            .reactions
            .count_for(repos.reactions.db(), ContentKind::Post, &post.id)
            .await
            .unwrap(),
        1
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_increments_are_not_lost() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let author = db.seed_user("author").await.unwrap();
    let post = db.seed_post(&author.id, "crowd").await.unwrap();

    let increments = (0..20).map(|_| {
        repos
            .counters
            .increment(repos.counters.db(), ContentKind::Post, &post.id)
    });
    for result in futures::future::join_all(increments).await {
        result.unwrap();
    }

    assert_eq!(likes(&repos, ContentKind::Post, &post.id).await, 20);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_decrement_is_floored_at_zero() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let author = db.seed_user("author").await.unwrap();
    let post = db.seed_post(&author.id, "zero").await.unwrap();

    repos
        .counters
        .decrement(repos.counters.db(), ContentKind::Post, &post.id)
        .await
        .unwrap();

    assert_eq!(likes(&repos, ContentKind::Post, &post.id).await, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_deleting_post_removes_reactions_on_post_and_comments() {
    use rapshare_db::entities::comment;
    use sea_orm::{ActiveModelTrait, Set};

    let db = TestDatabase::create_unique().await.unwrap();
    let repos = repos(&db);
    let author = db.seed_user("author").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let post = db.seed_post(&author.id, "with comments").await.unwrap();

    let comment = comment::ActiveModel {
        id: Set("c1".to_string()),
        post_id: Set(post.id.clone()),
        user_id: Set(fan.id.clone()),
        text: Set("fire".to_string()),
        likes_count: Set(0),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(db.connection())
    .await
    .unwrap();

    let conn = repos.reactions.db();
    repos
        .reactions
        .create(conn, &fan.id, ContentKind::Post, &post.id)
        .await
        .unwrap();
    repos
        .reactions
        .create(conn, &author.id, ContentKind::Comment, &comment.id)
        .await
        .unwrap();

    let txn = repos.content.begin().await.unwrap();
    repos
        .reactions
        .delete_for_post_comments(&txn, &post.id)
        .await
        .unwrap();
    repos
        .reactions
        .delete_for_target(&txn, ContentKind::Post, &post.id)
        .await
        .unwrap();
    assert!(
        repos
            .content
            .delete(&txn, ContentKind::Post, &post.id)
            .await
            .unwrap()
    );
    txn.commit().await.unwrap();

    assert_eq!(
        repos
            .reactions
            .count_for(conn, ContentKind::Comment, &comment.id)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        repos
            .reactions
            .count_for(conn, ContentKind::Post, &post.id)
            .await
            .unwrap(),
        0
    );

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
