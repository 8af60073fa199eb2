//! Integration tests for the database connection and repositories
//!
//! Run with: cargo test --package puerta-storage --test integration_database

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use puerta_storage::{
    Database, Session, SessionRepository, SqliteSessionRepository,
    SqliteUserRepository, User, UserRepository,
};
use tokio::sync::Barrier;

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('users', 'credentials', 'sessions', 'audit_log')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(result.0, 4);
    db.close().await;
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("puerta.db");
    let path = path.to_string_lossy().to_string();

    {
        let db = Database::open(&path).await.unwrap();
        SqliteUserRepository::new(db.pool().clone())
            .create(&User::new("alice", "Alice", "hash"))
            .await
            .unwrap();
        db.close().await;
    }

    let db = Database::open(&path).await.unwrap();
    let alice = SqliteUserRepository::new(db.pool().clone())
        .find_by_handle("alice")
        .await
        .unwrap();
    assert!(alice.is_some());
    db.close().await;
}

#[tokio::test]
async fn test_deleting_user_cascades_to_sessions() {
    let db = Database::in_memory().await.unwrap();
    let users = SqliteUserRepository::new(db.pool().clone());
    let sessions = SqliteSessionRepository::new(db.pool().clone());

    let id = users.create(&User::new("alice", "Alice", "hash")).await.unwrap();
    sessions
        .create_replacing(&Session::new("tok", id, Utc::now() + TimeDelta::days(1)))
        .await
        .unwrap();

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(db.pool())
        .await
        .unwrap();

    assert!(sessions.find_with_user("tok").await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_leave_one_session() {
    const NUM_CONCURRENT_TASKS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("puerta.db").to_string_lossy().to_string();
    let db = Database::open(path).await.unwrap();
    let user_id = SqliteUserRepository::new(db.pool().clone())
        .create(&User::new("alice", "Alice", "hash"))
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));
    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_TASKS {
        let sessions = SqliteSessionRepository::new(db.pool().clone());
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            sessions
                .create_replacing(&Session::new(
                    format!("token-{i}"),
                    user_id,
                    Utc::now() + TimeDelta::days(1),
                ))
                .await
        }));
    }

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 1);

    db.close().await;
}
