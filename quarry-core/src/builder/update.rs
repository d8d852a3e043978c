//! UPDATE statement builder

use super::{append_list, append_where, render, NamedQuery, QueryBuilder};
use crate::expr::{AppendToQuery, Expr, Params};
use crate::{Error, Result};

/// UPDATE statement builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    table_name: String,
    set_clauses: Vec<Expr>,
    where_conditions: Vec<Expr>,
}

impl UpdateBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table_name: table.into(),
            ..Self::default()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Add an assignment
    ///
    /// # Examples
    /// ```
    /// use quarry_core::{add, eq, QueryBuilder, UpdateBuilder};
    ///
    /// let query = UpdateBuilder::new("accounts")
    ///     .set(add("balance", 10))
    ///     .set(eq("note", "topup"))
    ///     .where_(eq("id", 3))
    ///     .to_sql()
    ///     .unwrap();
    /// assert!(query.sql.starts_with("UPDATE accounts SET balance = balance + :balance_"));
    /// assert_eq!(query.params.len(), 3);
    /// ```
    pub fn set(mut self, assignment: impl Into<Expr>) -> Self {
        self.set_clauses.push(assignment.into());
        self
    }

    /// Add a WHERE condition; conditions are ANDed
    pub fn where_(mut self, condition: impl Into<Expr>) -> Self {
        self.where_conditions.push(condition.into());
        self
    }
}

impl AppendToQuery for UpdateBuilder {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("UPDATE has no table"));
        }
        if self.set_clauses.is_empty() {
            return Err(Error::invalid_query("UPDATE has no SET clause"));
        }

        sql.push_str("UPDATE ");
        sql.push_str(&self.table_name);
        sql.push_str(" SET ");
        append_list(sql, params, &self.set_clauses, ", ")?;
        append_where(sql, params, &self.where_conditions)
    }
}

impl QueryBuilder for UpdateBuilder {
    fn to_sql(&self) -> Result<NamedQuery> {
        render(self)
    }
}
