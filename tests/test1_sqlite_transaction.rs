#![cfg(feature = "sqlite")]

use std::time::Duration;

use sql_chain::prelude::*;
use tempfile::tempdir;

const SCHEMA: &str = "
CREATE TABLE users (
    userID INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    pass TEXT NOT NULL,
    firstName TEXT,
    isAdmin INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE ratings (
    ratingID INTEGER PRIMARY KEY AUTOINCREMENT,
    userID INTEGER NOT NULL REFERENCES users(userID),
    rate INTEGER NOT NULL
);
";

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn setup(prefix: &str) -> Result<ConfigAndPool, SqlChainError> {
    let cap = PoolOptions::sqlite(unique_db_path(prefix))
        .max_size(2)
        .build()
        .await?;
    cap.executor().execute_batch(SCHEMA).await?;
    Ok(cap)
}

async fn count(exec: &mut Executor<DatabasePool>, table: &str) -> Result<i64, SqlChainError> {
    let rows = exec
        .select(table, ["COUNT(*) AS n"])
        .execute()
        .await?
        .into_rows()?;
    Ok(rows
        .first()
        .and_then(|r| r.get("n"))
        .and_then(RowValues::as_int)
        .unwrap_or(-1))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dependent_inserts_commit_together() -> Result<(), SqlChainError> {
    let cap = setup("commit").await?;
    let mut exec = cap.executor();

    exec.begin_transaction().await?;
    let user = exec
        .insert("users", [("email", "a@b.com"), ("pass", "x")])
        .execute()
        .await?
        .into_mutation()?;
    assert_eq!(user.affected_rows, 1);
    let user_id = user.insert_id.expect("sqlite reports the new rowid");

    let rating = exec
        .insert("ratings", [("userID", user_id), ("rate", 5)])
        .execute()
        .await?
        .into_mutation()?;
    assert!(rating.insert_id.is_some());
    exec.commit().await?;

    assert_eq!(count(&mut exec, "users").await?, 1);
    assert_eq!(count(&mut exec, "ratings").await?, 1);

    let rows = exec
        .select("users", ["users.email", "ratings.rate"])
        .inner_join("ratings", ("ratings.userID", "users.userID"))
        .where_("users.userID", "=", user_id)
        .execute()
        .await?
        .into_rows()?;
    let row = rows.first().expect("joined row");
    assert_eq!(row.get("email").and_then(RowValues::as_text), Some("a@b.com"));
    assert_eq!(row.get("rate").and_then(RowValues::as_int), Some(5));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_key_failure_then_rollback_leaves_nothing() -> Result<(), SqlChainError> {
    let cap = setup("rollback").await?;
    let mut exec = cap.executor();

    exec.begin_transaction().await?;
    exec.insert("users", [("email", "b@b.com"), ("pass", "y")])
        .execute()
        .await?;

    let err = exec
        .insert("ratings", [("userID", 9999), ("rate", 1)])
        .execute()
        .await
        .unwrap_err();
    match &err {
        SqlChainError::QueryExecutionError { statement, .. } => {
            assert_eq!(statement, "INSERT INTO ratings (userID,rate) VALUES(?,?)");
        }
        other => panic!("expected QueryExecutionError, got {other:?}"),
    }
    assert_eq!(exec.transaction_state(), TransactionState::Active);
    assert_eq!(exec.sql(), "");

    assert!(matches!(exec.rollback().await, RollbackOutcome::RolledBack));
    assert_eq!(exec.transaction_state(), TransactionState::Idle);

    assert_eq!(count(&mut exec, "users").await?, 0);
    assert_eq!(count(&mut exec, "ratings").await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_binds_set_values_and_reports_changes() -> Result<(), SqlChainError> {
    let cap = setup("update").await?;
    let mut exec = cap.executor();

    for email in ["u1@x.com", "u2@x.com", "u3@x.com"] {
        exec.insert("users", [("email", email), ("pass", "p")])
            .execute()
            .await?;
    }

    let updated = exec
        .update("users", [("firstName", "Jane")])
        .where_("email", "=", "u2@x.com")
        .or("email", "=", "u3@x.com")
        .execute()
        .await?
        .into_mutation()?;
    assert_eq!(updated.affected_rows, 2);
    assert_eq!(updated.changed_rows, 2);
    assert_eq!(updated.insert_id, None);

    let rows = exec
        .select("users", ["email"])
        .where_("firstName", "=", "Jane")
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn predicate_clauses_filter_real_rows() -> Result<(), SqlChainError> {
    let cap = setup("predicates").await?;
    let mut exec = cap.executor();

    for (email, admin) in [("ann@x.com", true), ("bob@y.com", false), ("cat@x.com", false)] {
        exec.insert(
            "users",
            [
                ("email", RowValues::from(email)),
                ("pass", "p".into()),
                ("isAdmin", admin.into()),
            ],
        )
        .execute()
        .await?;
    }

    let rows = exec
        .select("users", ["email"])
        .like("email", Connector::Where, "%@x.com")
        .and("isAdmin", "=", false)
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.rows()[0].get("email").and_then(RowValues::as_text), Some("cat@x.com"));

    let rows = exec
        .select("users", ["userID"])
        .in_("email", ["ann@x.com", "bob@y.com"], Connector::Where)
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 2);

    let rows = exec
        .select("users", ["email"])
        .between("userID", (2, 3), Connector::Where)
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 2);

    let rows = exec
        .select("users", ["users.email", "ratings.rate"])
        .left_join("ratings", ("ratings.userID", "users.userID"))
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.get("rate").is_some_and(RowValues::is_null)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transaction_macro_against_sqlite() -> Result<(), SqlChainError> {
    let cap = setup("macro").await?;
    let mut exec = cap.executor();

    let user_id = sql_chain::transaction!(exec, {
        let user = exec
            .insert("users", [("email", "m@x.com"), ("pass", "p")])
            .execute()
            .await?
            .into_mutation()?;
        let user_id = user.insert_id.unwrap_or_default();
        exec.insert("ratings", [("userID", user_id), ("rate", 4)])
            .execute()
            .await?;
        Ok::<_, SqlChainError>(user_id)
    })?;
    assert!(user_id > 0);

    let failed = sql_chain::transaction!(exec, {
        exec.insert("users", [("email", "n@x.com"), ("pass", "p")])
            .execute()
            .await?;
        exec.insert("ratings", [("userID", 9999), ("rate", 1)])
            .execute()
            .await?;
        Ok::<_, SqlChainError>(())
    });
    assert!(failed.is_err());

    assert_eq!(count(&mut exec, "users").await?, 1);
    assert_eq!(count(&mut exec, "ratings").await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn held_transaction_exhausts_a_single_connection_pool() -> Result<(), SqlChainError> {
    let cap = PoolOptions::sqlite(unique_db_path("exhausted"))
        .max_size(1)
        .connection_timeout(Duration::from_secs(1))
        .build()
        .await?;
    let mut holder = cap.executor();
    holder.execute_batch(SCHEMA).await?;
    holder.begin_transaction().await?;

    let mut other = cap.executor();
    let err = other
        .select("users", ["email"])
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlChainError::ConnectionError(_)));

    holder.commit().await?;
    assert_eq!(count(&mut other, "users").await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_transaction_is_rolled_back() -> Result<(), SqlChainError> {
    let cap = setup("dropped").await?;
    {
        let mut exec = cap.executor();
        exec.begin_transaction().await?;
        exec.insert("users", [("email", "gone@x.com"), ("pass", "p")])
            .execute()
            .await?;
    }

    let mut exec = cap.executor();
    assert_eq!(count(&mut exec, "users").await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connection_dropped_mid_transaction_is_not_reused() -> Result<(), SqlChainError> {
    let cap = PoolOptions::sqlite(unique_db_path("discarded"))
        .max_size(1)
        .build()
        .await?;
    cap.executor().execute_batch(SCHEMA).await?;
    {
        let mut exec = cap.executor();
        exec.begin_transaction().await?;
        exec.insert("users", [("email", "left@x.com"), ("pass", "p")])
            .execute()
            .await?;
    }

    // A reused connection would still be inside the first BEGIN and refuse a second one.
    let mut exec = cap.executor();
    exec.begin_transaction().await?;
    assert_eq!(count(&mut exec, "users").await?, 0);
    exec.insert("users", [("email", "kept@x.com"), ("pass", "p")])
        .execute()
        .await?;
    exec.commit().await?;
    assert_eq!(count(&mut exec, "users").await?, 1);
    Ok(())
}

#[tokio::test]
async fn invalid_options_are_config_errors() {
    let err = PoolOptions::sqlite("").build().await.unwrap_err();
    assert!(matches!(err, SqlChainError::ConfigError(_)));

    let err = ConfigAndPool::from_json(r#"{"db_type":"oracle","target":"x"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, SqlChainError::ConfigError(_)));
}
