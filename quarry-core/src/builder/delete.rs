//! DELETE statement builder

use super::{append_where, render, NamedQuery, QueryBuilder};
use crate::expr::{AppendToQuery, Expr, Params};
use crate::{Error, Result};

/// DELETE statement builder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteBuilder {
    table_name: String,
    where_conditions: Vec<Expr>,
}

impl DeleteBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table_name: table.into(),
            where_conditions: Vec::new(),
        }
    }

    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Add a WHERE condition; conditions are ANDed
    pub fn where_(mut self, condition: impl Into<Expr>) -> Self {
        self.where_conditions.push(condition.into());
        self
    }
}

impl AppendToQuery for DeleteBuilder {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        if self.table_name.is_empty() {
            return Err(Error::invalid_query("DELETE has no table"));
        }
        sql.push_str("DELETE FROM ");
        sql.push_str(&self.table_name);
        append_where(sql, params, &self.where_conditions)
    }
}

impl QueryBuilder for DeleteBuilder {
    fn to_sql(&self) -> Result<NamedQuery> {
        render(self)
    }
}
