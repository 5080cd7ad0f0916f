//! Shared fixture: a small blog database in memory

use modelql::ModelRegistry;
use modelql::runtime::{IntrospectOptions, SqliteRuntime, introspect};

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        active BOOLEAN,
        deleted_at DATETIME
    )",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        title TEXT,
        views INTEGER,
        author_id INTEGER REFERENCES users(id),
        deleted_at DATETIME
    )",
    "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)",
    "CREATE TABLE post_tags (
        post_id INTEGER REFERENCES posts(id),
        tag_id INTEGER REFERENCES tags(id),
        PRIMARY KEY (post_id, tag_id)
    )",
    "CREATE TABLE profiles (
        id INTEGER PRIMARY KEY,
        user_id INTEGER UNIQUE REFERENCES users(id),
        bio TEXT
    )",
];

const SEED: &[&str] = &[
    "INSERT INTO users (id, name, active) VALUES (1, 'ann', 1), (2, 'bob', 0)",
    "INSERT INTO posts (id, title, views, author_id) VALUES
        (1, 'hello', 5, 1),
        (2, 'xylophone', 20, 1),
        (3, 'box', 50, 2),
        (4, 'other', 11, 2),
        (5, 'orphan', 0, NULL)",
    "INSERT INTO tags (id, label) VALUES (1, 'rust'), (2, 'sql')",
    "INSERT INTO post_tags (post_id, tag_id) VALUES (1, 1), (1, 2), (3, 2)",
    "INSERT INTO profiles (id, user_id, bio) VALUES (1, 1, 'writes things')",
];

/// Fresh seeded database plus its introspected registry
pub async fn blog() -> (SqliteRuntime, ModelRegistry) {
    let statements: Vec<&str> = SCHEMA.iter().chain(SEED).copied().collect();
    database(&statements).await
}

/// In-memory database built from `statements`, introspected with
/// `deleted_at` as the soft-delete column
pub async fn database(statements: &[&str]) -> (SqliteRuntime, ModelRegistry) {
    // a single connection keeps every query on the same in-memory database
    let runtime = SqliteRuntime::connect("sqlite::memory:", 1).await.unwrap();
    for statement in statements {
        sqlx::query(statement).execute(runtime.pool()).await.unwrap();
    }

    let options = IntrospectOptions::default().soft_delete_column("deleted_at");
    let registry = introspect(runtime.pool(), &options).await.unwrap();
    (runtime, registry)
}
