//! INSERT statement builder

use super::{append_list, render, IntoColumns, NamedQuery, QueryBuilder};
use crate::executor::{exec, Executor};
use crate::expr::{AppendToQuery, Expr, Params};
use crate::{Error, Result, Value};

/// INSERT statement builder
///
/// Each call to [`values`](Self::values) adds one row. A row is a single
/// value: an array for multi-column inserts (`vec![..]`), or a scalar when
/// inserting one column. Rows render as `(:value0), (:value1), ...` and the
/// arrays are flattened into positional placeholders at execution time.
///
/// ```
/// use quarry_core::{values, InsertBuilder, QueryBuilder, Value};
///
/// let query = InsertBuilder::new("users")
///     .columns(("name", "age"))
///     .values(vec![Value::from("ann"), Value::from(31)])
///     .on_duplicate(values("age"))
///     .to_sql()
///     .unwrap();
/// assert_eq!(
///     query.sql,
///     "INSERT INTO users (name, age) VALUES (:value0) ON DUPLICATE KEY UPDATE age = VALUES(age)"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertBuilder {
    ignore: bool,
    table_name: String,
    columns: Vec<String>,
    rows: Vec<Value>,
    on_duplicate: Vec<Expr>,
}

impl InsertBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table_name: table.into(),
            ..Self::default()
        }
    }

    /// Render `INSERT IGNORE`
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    pub fn columns<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns.extend(columns.into_columns());
        self
    }

    /// Add one row
    pub fn values(mut self, row: impl Into<Value>) -> Self {
        self.rows.push(row.into());
        self
    }

    /// Add several rows at once
    pub fn values_many<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.rows.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Add an `ON DUPLICATE KEY UPDATE` assignment
    pub fn on_duplicate(mut self, assignment: impl Into<Expr>) -> Self {
        self.on_duplicate.push(assignment.into());
        self
    }

    /// Execute and return the generated id of the inserted row
    pub async fn execute_last_id<E: Executor>(self, conn: &mut E) -> Result<u64> {
        let query = self.to_sql()?;
        Ok(exec(conn, &query).await?.last_insert_id)
    }
}

impl AppendToQuery for InsertBuilder {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("INSERT has no table"));
        }
        if self.columns.is_empty() {
            return Err(Error::invalid_query("INSERT has no columns"));
        }
        if self.rows.is_empty() {
            return Err(Error::invalid_query("INSERT has no values"));
        }

        sql.push_str("INSERT ");
        if self.ignore {
            sql.push_str("IGNORE ");
        }
        sql.push_str("INTO ");
        sql.push_str(&self.table_name);
        sql.push_str(" (");
        sql.push_str(&self.columns.join(", "));
        sql.push_str(") VALUES ");

        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            let name = format!("value{}", i);
            sql.push_str("(:");
            sql.push_str(&name);
            sql.push(')');
            params.insert(name, row.clone());
        }

        if !self.on_duplicate.is_empty() {
            sql.push_str(" ON DUPLICATE KEY UPDATE ");
            append_list(sql, params, &self.on_duplicate, ", ")?;
        }
        Ok(())
    }
}

impl QueryBuilder for InsertBuilder {
    fn to_sql(&self) -> Result<NamedQuery> {
        render(self)
    }
}
