//! Statement execution and transaction interface

use crate::builder::{DeleteBuilder, InsertBuilder, NamedQuery, QueryBuilder, UpdateBuilder};
use crate::expand::{expand, interpolate, PositionalQuery};
use crate::row::{materialize, RawRow, ResultSet, Row};
use crate::{Result, Value};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

#[cfg(feature = "mysql")]
pub mod mysql;

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// Anything that can run positional SQL: a pool or an open transaction.
pub trait Executor: Send {
    /// Raw row type handed to the materializer
    type Row: RawRow + Send;

    /// Rewrite `?` placeholders into the driver's syntax. MySQL keeps `?`.
    fn rebind(&self, sql: String) -> Result<String> {
        Ok(sql)
    }

    /// Whether statements are logged before they run
    fn show_sql(&self) -> bool {
        false
    }

    /// Run a statement that returns no rows
    fn execute(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<ExecResult>> + Send;

    /// Run a statement and return its raw rows
    fn query(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<ResultSet<Self::Row>>> + Send;
}

/// An open transaction
pub trait Transaction: Executor + Sized {
    fn commit(self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(self) -> impl Future<Output = Result<()>> + Send;
}

/// A pool that can open transactions
pub trait TransactionalPool: Send + Sync {
    type Transaction: Transaction;

    fn begin_transaction(&self) -> impl Future<Output = Result<Self::Transaction>> + Send;
}

/// Expand, rebind and (optionally) log a named statement.
fn prepare<E: Executor>(conn: &E, query: &NamedQuery) -> Result<PositionalQuery> {
    let PositionalQuery { sql, args } = expand(&query.sql, &query.params)?;
    if conn.show_sql() {
        tracing::debug!(
            target: "quarry::sql",
            args = args.len(),
            "{}",
            interpolate(&sql, &args)
        );
    }
    let sql = conn.rebind(sql)?;
    Ok(PositionalQuery { sql, args })
}

/// Run a rendered SELECT and materialize its rows.
pub async fn fetch_rows<E: Executor>(conn: &mut E, query: &NamedQuery) -> Result<Vec<Row>> {
    let prepared = prepare(conn, query)?;
    let result = conn.query(&prepared.sql, &prepared.args).await?;
    materialize(result)
}

/// Run a rendered write statement.
pub async fn exec<E: Executor>(conn: &mut E, query: &NamedQuery) -> Result<ExecResult> {
    let prepared = prepare(conn, query)?;
    conn.execute(&prepared.sql, &prepared.args).await
}

/// Run `f` inside a transaction.
///
/// Commits when `f` succeeds; a failed commit is returned as is. When `f`
/// fails the transaction is rolled back and `f`'s error is returned, with
/// any rollback failure only logged. A panic inside `f` rolls back and then
/// resumes unwinding.
///
/// ```ignore
/// let id = transaction(&db, |tx| Box::pin(async move {
///     let id = insert_into("users").columns("name").values("ann").execute_last_id(tx).await?;
///     update("stats").set(add("users", 1)).execute_count(tx).await?;
///     Ok(id)
/// })).await?;
/// ```
pub async fn transaction<P, F, T>(pool: &P, f: F) -> Result<T>
where
    P: TransactionalPool,
    F: for<'t> FnOnce(&'t mut P::Transaction) -> BoxFuture<'t, Result<T>>,
{
    let mut txn = pool.begin_transaction().await?;

    let outcome = AssertUnwindSafe(f(&mut txn)).catch_unwind().await;
    match outcome {
        Ok(Ok(value)) => {
            txn.commit().await?;
            Ok(value)
        }
        Ok(Err(e)) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(
                    target: "quarry::tx",
                    error = %rollback_err,
                    "rollback failed after transaction error: {}",
                    e
                );
            }
            Err(e)
        }
        Err(panic) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(
                    target: "quarry::tx",
                    error = %rollback_err,
                    "rollback failed after panic in transaction"
                );
            }
            std::panic::resume_unwind(panic)
        }
    }
}

/// Extension trait for write statements (INSERT, UPDATE, DELETE)
pub trait ExecutableModification: QueryBuilder {
    /// Execute and return the number of affected rows
    fn execute_count<E: Executor>(self, conn: &mut E) -> impl Future<Output = Result<u64>> + Send;
}

impl ExecutableModification for InsertBuilder {
    async fn execute_count<E: Executor>(self, conn: &mut E) -> Result<u64> {
        let query = self.to_sql()?;
        Ok(exec(conn, &query).await?.rows_affected)
    }
}

impl ExecutableModification for UpdateBuilder {
    async fn execute_count<E: Executor>(self, conn: &mut E) -> Result<u64> {
        let query = self.to_sql()?;
        Ok(exec(conn, &query).await?.rows_affected)
    }
}

impl ExecutableModification for DeleteBuilder {
    async fn execute_count<E: Executor>(self, conn: &mut E) -> Result<u64> {
        let query = self.to_sql()?;
        Ok(exec(conn, &query).await?.rows_affected)
    }
}
