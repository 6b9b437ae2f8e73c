//! Reaction and content integration tests against a real database.
//!
//! Run with: `cargo test -p rapshare-core --test reaction_integration -- --ignored`

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rapshare_common::{AppError, LocalStorage, StorageBackend};
use rapshare_core::{ContentService, ReactionService, StorageCleanup, ToggleOutcome};
use rapshare_db::entities::ContentKind;
use rapshare_db::repositories::{CounterRepository, ReactionRepository};
use rapshare_db::test_utils::TestDatabase;

fn reaction_service(db: &TestDatabase) -> ReactionService {
    let conn = db.shared();
    ReactionService::new(
        ReactionRepository::new(Arc::clone(&conn)),
        CounterRepository::new(conn),
    )
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_two_fans_like_then_first_unlikes() {
    let db = TestDatabase::create_unique().await.unwrap();
    let svc = reaction_service(&db);
    let author = db.seed_user("author").await.unwrap();
    let u1 = db.seed_user("u1").await.unwrap();
    let u2 = db.seed_user("u2").await.unwrap();
    let post = db.seed_post(&author.id, "sixteen bars").await.unwrap();

    let steps = [
        svc.toggle(&u1, ContentKind::Post, &post.id).await.unwrap(),
        svc.toggle(&u2, ContentKind::Post, &post.id).await.unwrap(),
        svc.toggle(&u1, ContentKind::Post, &post.id).await.unwrap(),
    ];

    assert_eq!(
        steps,
        [
            ToggleOutcome { liked: true, likes_count: 1 },
            ToggleOutcome { liked: true, likes_count: 2 },
            ToggleOutcome { liked: false, likes_count: 1 },
        ]
    );

    let anonymous = svc.status(None, ContentKind::Post, &post.id).await.unwrap();
    assert!(!anonymous.is_liked);
    assert_eq!(anonymous.likes_count, 1);

    let u2_status = svc
        .status(Some(&u2), ContentKind::Post, &post.id)
        .await
        .unwrap();
    assert!(u2_status.is_liked);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_many_users_count_matches_rows() {
    let db = TestDatabase::create_unique().await.unwrap();
    let svc = reaction_service(&db);
    let producer = db.seed_user("producer").await.unwrap();
    let beat = db.seed_beat(&producer.id, "beats/x.mp3").await.unwrap();

    let mut fans = Vec::new();
    for i in 0..10 {
        fans.push(db.seed_user(&format!("fan{i}")).await.unwrap());
    }

    let toggles = fans
        .iter()
        .map(|fan| svc.toggle(fan, ContentKind::Beat, &beat.id));
    for outcome in futures::future::join_all(toggles).await {
        assert!(outcome.unwrap().liked);
    }

    let status = svc.status(None, ContentKind::Beat, &beat.id).await.unwrap();
    assert_eq!(status.likes_count, 10);
    assert_eq!(
        svc.likers(ContentKind::Beat, &beat.id, 100, None)
            .await
            .unwrap()
            .len(),
        10
    );
    assert_eq!(
        svc.reconcile(&producer, ContentKind::Beat, &beat.id)
            .await
            .unwrap(),
        10
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_same_user_toggles_keep_counter_consistent() {
    let db = TestDatabase::create_unique().await.unwrap();
    let svc = reaction_service(&db);
    let author = db.seed_user("author").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let post = db.seed_post(&author.id, "double tap").await.unwrap();

    let toggles = (0..2).map(|_| svc.toggle(&fan, ContentKind::Post, &post.id));
    for outcome in futures::future::join_all(toggles).await {
        outcome.unwrap();
    }

    // Whichever order the two toggles land in, the counter equals the rows.
    let status = svc
        .status(Some(&fan), ContentKind::Post, &post.id)
        .await
        .unwrap();
    assert_eq!(status.likes_count, i32::from(status.is_liked));
    assert_eq!(
        svc.reconcile(&author, ContentKind::Post, &post.id)
            .await
            .unwrap(),
        status.likes_count
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_toggle_pairs_after_like_never_fail() {
    let db = TestDatabase::create_unique().await.unwrap();
    let svc = reaction_service(&db);
    let author = db.seed_user("author").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let post = db.seed_post(&author.id, "run it back").await.unwrap();

    svc.toggle(&fan, ContentKind::Post, &post.id).await.unwrap();

    // Each pair races from whatever state the previous pair left behind.
    for _ in 0..20 {
        let (a, b) = tokio::join!(
            svc.toggle(&fan, ContentKind::Post, &post.id),
            svc.toggle(&fan, ContentKind::Post, &post.id),
        );
        a.unwrap();
        b.unwrap();

        let status = svc
            .status(Some(&fan), ContentKind::Post, &post.id)
            .await
            .unwrap();
        assert_eq!(status.likes_count, i32::from(status.is_liked));
    }

    let status = svc.status(None, ContentKind::Post, &post.id).await.unwrap();
    assert_eq!(
        svc.reconcile(&author, ContentKind::Post, &post.id)
            .await
            .unwrap(),
        status.likes_count
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_toggle_missing_target_mutates_nothing() {
    let db = TestDatabase::create_unique().await.unwrap();
    let svc = reaction_service(&db);
    let fan = db.seed_user("fan").await.unwrap();

    let result = svc.toggle(&fan, ContentKind::Recording, "nope").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let rows = ReactionRepository::new(db.shared())
        .count_for(db.connection(), ContentKind::Recording, "nope")
        .await
        .unwrap();
    assert_eq!(rows, 0);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_beat_removes_file_row_and_reactions() {
    let db = TestDatabase::create_unique().await.unwrap();
    let dir = std::env::temp_dir().join(format!("rapshare-it-{}", std::process::id()));
    let storage = Arc::new(LocalStorage::new(dir.clone(), "/files".to_string()));
    storage
        .upload("beats/p/b.mp3", b"ID3", "audio/mpeg")
        .await
        .unwrap();

    let producer = db.seed_user("producer").await.unwrap();
    let fan = db.seed_user("fan").await.unwrap();
    let beat = db.seed_beat(&producer.id, "beats/p/b.mp3").await.unwrap();

    let reactions = reaction_service(&db);
    reactions
        .toggle(&fan, ContentKind::Beat, &beat.id)
        .await
        .unwrap();

    let content = ContentService::new(
        db.shared(),
        storage.clone(),
        StorageCleanup::disabled(),
    );
    content
        .delete(&producer, ContentKind::Beat, &beat.id)
        .await
        .unwrap();

    assert!(!storage.exists("beats/p/b.mp3").await.unwrap());
    assert!(matches!(
        content.get(ContentKind::Beat, &beat.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(
        ReactionRepository::new(db.shared())
            .count_for(db.connection(), ContentKind::Beat, &beat.id)
            .await
            .unwrap(),
        0
    );

    tokio::fs::remove_dir_all(&dir).await.ok();
    db.drop_database().await.unwrap();
}
