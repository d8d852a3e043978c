//! MySQL driver built on a sqlx pool

use super::{ExecResult, Executor, Transaction, TransactionalPool};
use crate::config::DbConfig;
use crate::row::{ColumnMeta, RawRow, ResultSet, ValueKind};
use crate::{Error, Result, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo};
use std::future::Future;
use std::time::Duration;

/// MySQL connection pool wrapper
#[derive(Debug, Clone)]
pub struct MySqlDatabase {
    inner: MySqlPool,
    show_sql: bool,
    statement_timeout: Option<Duration>,
}

impl MySqlDatabase {
    /// Open a pool as described by `config`.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        config.validate()?;
        let max_connections = config.effective_max_connections();

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .max_lifetime(config.max_lifetime())
            .connect(&config.url)
            .await?;

        tracing::info!(
            target: "quarry::db",
            max_connections,
            max_lifetime_secs = config.max_lifetime_secs,
            show_sql = config.show_sql,
            "MySQL pool ready"
        );

        Ok(Self {
            inner: pool,
            show_sql: config.show_sql,
            statement_timeout: config.statement_timeout(),
        })
    }

    /// Wrap an existing pool; statement logging and timeouts start off.
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self {
            inner: pool,
            show_sql: false,
            statement_timeout: None,
        }
    }

    pub fn with_show_sql(mut self, show_sql: bool) -> Self {
        self.show_sql = show_sql;
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.inner
    }

    /// Start a transaction on a pooled connection.
    pub async fn begin(&self) -> Result<MySqlTransaction> {
        let inner = self.inner.begin().await?;
        Ok(MySqlTransaction {
            inner,
            show_sql: self.show_sql,
            statement_timeout: self.statement_timeout,
        })
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}

impl Executor for MySqlDatabase {
    type Row = MySqlRow;

    fn show_sql(&self) -> bool {
        self.show_sql
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let query = bind_values_to_query(sqlx::query(sql), args)?;
        let done = with_timeout(self.statement_timeout, query.execute(&self.inner)).await?;
        Ok(ExecResult {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<ResultSet<MySqlRow>> {
        let query = bind_values_to_query(sqlx::query(sql), args)?;
        let rows = with_timeout(self.statement_timeout, query.fetch_all(&self.inner)).await?;
        Ok(into_result_set(rows))
    }
}

impl TransactionalPool for MySqlDatabase {
    type Transaction = MySqlTransaction;

    async fn begin_transaction(&self) -> Result<MySqlTransaction> {
        self.begin().await
    }
}

/// A MySQL transaction holding one pooled connection
///
/// Dropping it without [`commit`](Transaction::commit) rolls back.
pub struct MySqlTransaction {
    inner: sqlx::Transaction<'static, MySql>,
    show_sql: bool,
    statement_timeout: Option<Duration>,
}

impl Executor for MySqlTransaction {
    type Row = MySqlRow;

    fn show_sql(&self) -> bool {
        self.show_sql
    }

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let query = bind_values_to_query(sqlx::query(sql), args)?;
        let done = with_timeout(self.statement_timeout, query.execute(&mut *self.inner)).await?;
        Ok(ExecResult {
            rows_affected: done.rows_affected(),
            last_insert_id: done.last_insert_id(),
        })
    }

    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<ResultSet<MySqlRow>> {
        let query = bind_values_to_query(sqlx::query(sql), args)?;
        let rows = with_timeout(self.statement_timeout, query.fetch_all(&mut *self.inner)).await?;
        Ok(into_result_set(rows))
    }
}

impl Transaction for MySqlTransaction {
    async fn commit(self) -> Result<()> {
        self.inner.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.inner.rollback().await?;
        Ok(())
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::Timeout(limit)),
        },
        None => Ok(fut.await?),
    }
}

/// Column metadata is read from the first row, so an empty result carries
/// no columns and its types are never checked against the type table.
fn into_result_set(rows: Vec<MySqlRow>) -> ResultSet<MySqlRow> {
    let columns = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| ColumnMeta::new(c.name(), c.type_info().name()))
                .collect()
        })
        .unwrap_or_default();
    ResultSet { columns, rows }
}

/// Bind expanded arguments to a sqlx query
fn bind_values_to_query<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Result<Query<'q, MySql, MySqlArguments>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::U64(u) => query.bind(*u),
            Value::F32(f) => query.bind(*f),
            Value::F64(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Json(j) => query.bind(sqlx::types::Json(j)),
            Value::DateTime(dt) => query.bind(*dt),
            Value::Array(_) => {
                return Err(Error::expansion(
                    "collection reached the driver unexpanded",
                ));
            }
        };
    }
    Ok(query)
}

fn decode_err(column: &ColumnMeta) -> impl Fn(sqlx::Error) -> Error + '_ {
    move |e| Error::decode(&column.name, e.to_string())
}

/// Text cells must be valid UTF-8; anything else is a decode error.
fn text_value(column: &ColumnMeta, bytes: Vec<u8>) -> Result<Value> {
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|e| {
            Error::decode(
                &column.name,
                format!("{} column is not valid UTF-8: {}", column.db_type, e),
            )
        })
}

impl RawRow for MySqlRow {
    fn decode(&self, index: usize, column: &ColumnMeta, kind: ValueKind) -> Result<Value> {
        let err = decode_err(column);
        let value = match kind {
            ValueKind::Text => self
                .try_get_unchecked::<Option<Vec<u8>>, _>(index)
                .map_err(err)?
                .map(|bytes| text_value(column, bytes))
                .transpose()?,
            ValueKind::Bytes => self
                .try_get_unchecked::<Option<Vec<u8>>, _>(index)
                .map_err(err)?
                .map(Value::Bytes),
            ValueKind::Int64 if column.db_type.ends_with("UNSIGNED") => {
                match self.try_get_unchecked::<Option<u64>, _>(index).map_err(err)? {
                    Some(n) => Some(Value::I64(i64::try_from(n).map_err(|_| {
                        Error::decode(&column.name, format!("{} overflows a signed 64-bit integer", n))
                    })?)),
                    None => None,
                }
            }
            ValueKind::Int64 => self
                .try_get_unchecked::<Option<i64>, _>(index)
                .map_err(err)?
                .map(Value::I64),
            ValueKind::Float64 if column.db_type == "FLOAT" => self
                .try_get_unchecked::<Option<f32>, _>(index)
                .map_err(err)?
                .map(|f| Value::F64(f64::from(f))),
            ValueKind::Float64 => self
                .try_get_unchecked::<Option<f64>, _>(index)
                .map_err(err)?
                .map(Value::F64),
            ValueKind::Timestamp => match column.db_type.as_str() {
                "DATE" => self
                    .try_get_unchecked::<Option<NaiveDate>, _>(index)
                    .map_err(err)?
                    .map(|d| Value::DateTime(d.and_time(NaiveTime::MIN))),
                "TIME" => self
                    .try_get_unchecked::<Option<NaiveTime>, _>(index)
                    .map_err(err)?
                    .map(|t| Value::DateTime(NaiveDate::default().and_time(t))),
                _ => self
                    .try_get_unchecked::<Option<NaiveDateTime>, _>(index)
                    .map_err(err)?
                    .map(Value::DateTime),
            },
        };
        Ok(value.unwrap_or(Value::Null))
    }
}
