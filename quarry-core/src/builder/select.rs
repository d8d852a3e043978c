//! SELECT statement builder

use super::{append_list, append_where, render, IntoColumns, NamedQuery, QueryBuilder};
use crate::executor::{fetch_rows, Executor};
use crate::expr::{AppendToQuery, Expr, Params};
use crate::row::{from_row, from_rows, Row};
use crate::{Error, Result};
use serde::de::DeserializeOwned;

/// SELECT statement builder
///
/// ```
/// use quarry_core::{eq, desc, QueryBuilder, SelectBuilder};
///
/// let query = SelectBuilder::new()
///     .columns(("id", "name"))
///     .from("users")
///     .where_(eq("status", 1))
///     .order_by(desc("id"))
///     .limit(10)
///     .to_sql()
///     .unwrap();
/// assert!(query.sql.starts_with("SELECT id, name FROM users WHERE status = :status_"));
/// assert!(query.sql.ends_with(" ORDER BY id DESC LIMIT 10"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectBuilder {
    columns: Vec<Expr>,
    from: Option<Expr>,
    joins: Vec<Expr>,
    where_conditions: Vec<Expr>,
    group_by: Vec<Expr>,
    order_by: Vec<Expr>,
    offset: i64,
    limit: i64,
    for_update: bool,
    alias: Option<String>,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FROM table; may be an aliased sub-select
    pub fn from(mut self, table: impl Into<Expr>) -> Self {
        self.from = Some(table.into());
        self
    }

    /// Append plain column names
    pub fn columns<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns
            .extend(columns.into_columns().into_iter().map(Expr::Raw));
        self
    }

    /// Append one column fragment (`func_as(..)`, an aliased sub-select, ...)
    pub fn column(mut self, column: impl Into<Expr>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Drop every selected column, falling back to `*`
    pub fn columns_reset(mut self) -> Self {
        self.columns.clear();
        self
    }

    pub fn join(mut self, join: impl Into<Expr>) -> Self {
        self.joins.push(join.into());
        self
    }

    /// Add a WHERE condition; conditions are ANDed in insertion order
    pub fn where_(mut self, condition: impl Into<Expr>) -> Self {
        self.where_conditions.push(condition.into());
        self
    }

    pub fn group_by<C: IntoColumns>(mut self, columns: C) -> Self {
        self.group_by
            .extend(columns.into_columns().into_iter().map(Expr::Raw));
        self
    }

    /// Add an ORDER BY term (`"id"`, `desc("id")`)
    pub fn order_by(mut self, term: impl Into<Expr>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Row limit; zero or negative means no LIMIT clause
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Row offset; only rendered together with a positive limit
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Render as `(SELECT ...) AS alias` when nested in another statement
    pub fn as_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Run the query and return every row.
    ///
    /// A WHERE clause holding an empty `IN` collection short-circuits to an
    /// empty result without touching the database.
    pub async fn rows<E: Executor>(self, conn: &mut E) -> Result<Vec<Row>> {
        let query = match self.to_sql() {
            Ok(query) => query,
            Err(e) if e.is_empty_in() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        fetch_rows(conn, &query).await
    }

    /// Run the query with `LIMIT 1` and return the first row, if any.
    pub async fn row<E: Executor>(self, conn: &mut E) -> Result<Option<Row>> {
        let rows = self.limit(1).rows(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// Run the query with `LIMIT 1` and decode the first row into `T`.
    pub async fn do_get<T, E>(self, conn: &mut E) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        E: Executor,
    {
        self.row(conn).await?.map(from_row).transpose()
    }

    /// Run the query and decode every row into `T`.
    pub async fn do_select<T, E>(self, conn: &mut E) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        E: Executor,
    {
        from_rows(self.rows(conn).await?)
    }
}

impl AppendToQuery for SelectBuilder {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        if self.alias.is_some() {
            sql.push('(');
        }

        sql.push_str("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            append_list(sql, params, &self.columns, ", ")?;
        }

        let from = self
            .from
            .as_ref()
            .ok_or_else(|| Error::invalid_query("SELECT has no FROM table"))?;
        sql.push_str(" FROM ");
        from.append_to_query(sql, params)?;

        for join in &self.joins {
            sql.push(' ');
            join.append_to_query(sql, params)?;
        }

        append_where(sql, params, &self.where_conditions)?;

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            append_list(sql, params, &self.group_by, ", ")?;
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            append_list(sql, params, &self.order_by, ", ")?;
        }

        if self.limit > 0 {
            if self.offset > 0 {
                sql.push_str(&format!(" LIMIT {}, {}", self.offset, self.limit));
            } else {
                sql.push_str(&format!(" LIMIT {}", self.limit));
            }
        }

        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }

        if let Some(alias) = &self.alias {
            sql.push_str(") AS ");
            sql.push_str(alias);
        }
        Ok(())
    }
}

impl QueryBuilder for SelectBuilder {
    fn to_sql(&self) -> Result<NamedQuery> {
        render(self)
    }
}

impl From<SelectBuilder> for Expr {
    fn from(select: SelectBuilder) -> Self {
        Expr::Select(Box::new(select))
    }
}
