//! JOIN clauses

use super::append_list;
use crate::expr::{AppendToQuery, Expr, Params};
use crate::{Error, Result};

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
        }
    }
}

/// `<TYPE> JOIN <table> ON (<cond> AND <cond> ...)`
///
/// The table may be a plain name (`"orders o"`) or an aliased sub-select.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    join_type: JoinType,
    table: Option<Expr>,
    on_conditions: Vec<Expr>,
}

impl Join {
    pub fn new(join_type: JoinType) -> Self {
        Self {
            join_type,
            table: None,
            on_conditions: Vec::new(),
        }
    }

    /// `INNER JOIN table`
    pub fn inner(table: impl Into<Expr>) -> Self {
        Self::new(JoinType::Inner).table(table)
    }

    /// `LEFT JOIN table`
    pub fn left(table: impl Into<Expr>) -> Self {
        Self::new(JoinType::Left).table(table)
    }

    /// Set the joined table
    pub fn table(mut self, table: impl Into<Expr>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add an ON condition; multiple conditions are ANDed
    pub fn on(mut self, condition: impl Into<Expr>) -> Self {
        self.on_conditions.push(condition.into());
        self
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }
}

impl AppendToQuery for Join {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| Error::invalid_query(format!("{} JOIN has no table", self.join_type)))?;
        if self.on_conditions.is_empty() {
            return Err(Error::invalid_query(format!(
                "{} JOIN has no ON condition",
                self.join_type
            )));
        }

        sql.push_str(&self.join_type.to_string());
        sql.push_str(" JOIN ");
        table.append_to_query(sql, params)?;
        sql.push_str(" ON (");
        append_list(sql, params, &self.on_conditions, " AND ")?;
        sql.push(')');
        Ok(())
    }
}

impl From<Join> for Expr {
    fn from(join: Join) -> Self {
        Expr::Join(Box::new(join))
    }
}
