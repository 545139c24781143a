#![cfg(feature = "test-utils")]

use std::error::Error;

use sql_chain::prelude::*;
use sql_chain::test_utils::EmbeddedPostgres;

// Postgres folds unquoted identifiers to lower case, hence snake_case here.
const SCHEMA: &str = "
CREATE TABLE users (
    user_id BIGSERIAL PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    pass TEXT NOT NULL,
    first_name TEXT,
    score DOUBLE PRECISION
);
CREATE TABLE ratings (
    rating_id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(user_id),
    rate INTEGER NOT NULL,
    weight REAL
);
";

type TestResult = Result<(), Box<dyn Error>>;

async fn setup(
    db_name: &str,
    max_size: u32,
) -> Result<(EmbeddedPostgres, ConfigAndPool), Box<dyn Error>> {
    let pg = EmbeddedPostgres::start(db_name).await?;
    let cap = PoolOptions::postgres(pg.database_url.clone())
        .max_size(max_size)
        .build()
        .await?;
    cap.executor().execute_batch(SCHEMA).await?;
    Ok((pg, cap))
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

async fn user_id(exec: &mut Executor<DatabasePool>, email: &str) -> Result<i64, SqlChainError> {
    let rows = exec
        .select("users", ["user_id"])
        .where_("email", "=", email)
        .execute()
        .await?
        .into_rows()?;
    Ok(rows
        .first()
        .and_then(|r| r.get("user_id"))
        .and_then(RowValues::as_int)
        .unwrap_or(-1))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dependent_inserts_commit_together() -> TestResult {
    let (pg, cap) = setup("chain_commit", 2).await?;
    let mut exec = cap.executor();

    exec.begin_transaction().await?;
    let user = exec
        .insert("users", [("email", "a@b.com"), ("pass", "x")])
        .execute()
        .await?
        .into_mutation()?;
    assert_eq!(user.affected_rows, 1);
    assert_eq!(user.insert_id, None);

    let id = user_id(&mut exec, "a@b.com").await?;
    assert!(id > 0);
    // integers bound to int4 and real columns
    exec.insert(
        "ratings",
        [("user_id", RowValues::Int(id)), ("rate", 5.into()), ("weight", 5.into())],
    )
    .execute()
    .await?;
    exec.commit().await?;
    assert_eq!(exec.transaction_state(), TransactionState::Idle);

    let rows = exec
        .select("users", ["users.email", "ratings.rate", "ratings.weight"])
        .inner_join("ratings", ("ratings.user_id", "users.user_id"))
        .where_("ratings.weight", "=", 5)
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 1);
    let row = &rows.rows()[0];
    assert_eq!(row.get("email").and_then(RowValues::as_text), Some("a@b.com"));
    assert_eq!(row.get("rate").and_then(RowValues::as_int), Some(5));
    assert_eq!(row.get("weight").and_then(RowValues::as_float), Some(5.0));

    let updated = exec
        .update("users", [("score", 4)])
        .where_("user_id", "=", id)
        .execute()
        .await?
        .into_mutation()?;
    assert_eq!(updated.changed_rows, 1);
    let rows = exec
        .select("users", ["email"])
        .between("score", (3.5, 4.5), Connector::Where)
        .execute()
        .await?
        .into_rows()?;
    assert_eq!(rows.len(), 1);

    drop(exec);
    drop(cap);
    pg.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn foreign_key_failure_then_rollback_leaves_nothing() -> TestResult {
    let (pg, cap) = setup("chain_rollback", 2).await?;
    let mut exec = cap.executor();

    exec.begin_transaction().await?;
    exec.insert("users", [("email", "b@b.com"), ("pass", "y")])
        .execute()
        .await?;
    let err = exec
        .insert("ratings", [("user_id", 9999), ("rate", 1)])
        .execute()
        .await
        .unwrap_err();
    match &err {
        SqlChainError::QueryExecutionError { statement, .. } => {
            assert_eq!(statement, "INSERT INTO ratings (user_id,rate) VALUES(?,?)");
        }
        other => panic!("expected QueryExecutionError, got {other:?}"),
    }
    assert_eq!(exec.transaction_state(), TransactionState::Active);

    assert!(matches!(exec.rollback().await, RollbackOutcome::RolledBack));
    assert_eq!(count(&mut exec, "users").await?, 0);
    assert_eq!(count(&mut exec, "ratings").await?, 0);

    // A value that does not match the column type is refused, not reinterpreted.
    let err = exec
        .insert("users", [("email", RowValues::from("c@b.com")), ("pass", 1234.into())])
        .execute()
        .await
        .unwrap_err();
    assert!(err.is_execution_error());
    assert_eq!(count(&mut exec, "users").await?, 0);

    drop(exec);
    drop(cap);
    pg.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commit_after_a_failed_statement_is_an_error() -> TestResult {
    let (pg, cap) = setup("chain_aborted", 2).await?;
    let mut exec = cap.executor();

    exec.begin_transaction().await?;
    exec.insert("users", [("email", "d@b.com"), ("pass", "z")])
        .execute()
        .await?;
    assert!(
        exec.insert("ratings", [("user_id", 9999), ("rate", 1)])
            .execute()
            .await
            .is_err()
    );

    match exec.commit().await {
        Err(SqlChainError::QueryExecutionError { statement, .. }) => {
            assert_eq!(statement, "COMMIT");
        }
        other => panic!("expected a failed COMMIT, got {other:?}"),
    }
    assert_eq!(exec.transaction_state(), TransactionState::Idle);
    assert_eq!(count(&mut exec, "users").await?, 0);

    // the pool hands out a connection that can start a new transaction
    exec.begin_transaction().await?;
    exec.insert("users", [("email", "d@b.com"), ("pass", "z")])
        .execute()
        .await?;
    exec.commit().await?;
    assert_eq!(count(&mut exec, "users").await?, 1);

    drop(exec);
    drop(cap);
    pg.stop().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_transaction_is_rolled_back() -> TestResult {
    let (pg, cap) = setup("chain_dropped", 2).await?;
    {
        let mut exec = cap.executor();
        exec.begin_transaction().await?;
        exec.insert("users", [("email", "gone@x.com"), ("pass", "p")])
            .execute()
            .await?;
    }

    let mut exec = cap.executor();
    assert_eq!(count(&mut exec, "users").await?, 0);

    drop(exec);
    drop(cap);
    pg.stop().await?;
    Ok(())
}

#[test]
fn connection_abandoned_outside_a_runtime_is_not_reused() -> TestResult {
    let rt = tokio::runtime::Runtime::new()?;
    let (pg, cap, exec) = rt.block_on(async {
        let (pg, cap) = setup("chain_no_runtime", 1).await?;
        let mut exec = cap.executor();
        exec.begin_transaction().await?;
        exec.insert("users", [("email", "orphan@x.com"), ("pass", "p")])
            .execute()
            .await?;
        Ok::<_, Box<dyn Error>>((pg, cap, exec))
    })?;

    // No runtime context here, so the rollback cannot be spawned.
    drop(exec);

    rt.block_on(async {
        let mut exec = cap.executor();
        exec.begin_transaction().await?;
        assert_eq!(count(&mut exec, "users").await?, 0);
        exec.commit().await?;

        drop(exec);
        drop(cap);
        pg.stop().await?;
        Ok::<_, Box<dyn Error>>(())
    })
}
