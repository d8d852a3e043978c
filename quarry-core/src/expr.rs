//! SQL fragments and the append-to-query contract
//!
//! Every piece of a statement (a column, a predicate, a join, a sub-select)
//! is a fragment: it appends its text to the statement being rendered and
//! records any bound values under freshly generated placeholder names.
//! Fragments never change while being rendered; all state flows through
//! the `sql` buffer and the [`Params`] map handed to them.

use crate::builder::join::Join;
use crate::builder::select::SelectBuilder;
use crate::namer::param_name;
use crate::{Error, Result, Value};
use std::collections::BTreeMap;

/// Bound values keyed by placeholder name (without the leading `:`).
pub type Params = BTreeMap<String, Value>;

/// Anything that can render itself into an in-progress statement.
pub trait AppendToQuery {
    /// Append this fragment's SQL to `sql`, binding its values into `params`.
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()>;
}

/// A composable SQL fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Text copied verbatim
    Raw(String),
    /// `column = :p`, or `column IN (:p)` when the value is an array
    Eq { column: String, value: Value },
    /// `column = column + :p`
    Add { column: String, value: Value },
    /// `column > :p`
    Gt { column: String, value: Value },
    /// `column < :p`
    Lt { column: String, value: Value },
    /// `column = expr` with the right side left unquoted
    EqRaw { column: String, expr: String },
    /// `column DESC`
    Desc(String),
    /// `column = VALUES(column)`, for `ON DUPLICATE KEY UPDATE`
    Values(String),
    /// `(left OR right)`; both sides must be set
    Or {
        left: Option<Box<Expr>>,
        right: Option<Box<Expr>>,
    },
    /// `func(column) AS alias`
    FuncAs {
        func: String,
        column: String,
        alias: String,
    },
    /// A JOIN clause
    Join(Box<Join>),
    /// A nested SELECT
    Select(Box<SelectBuilder>),
}

/// Verbatim SQL text
pub fn raw(sql: impl Into<String>) -> Expr {
    Expr::Raw(sql.into())
}

/// `column = value`, or `column IN (...)` when `value` converts to an array
///
/// # Examples
/// ```
/// use quarry_core::{eq, AppendToQuery, Params};
///
/// let mut sql = String::new();
/// let mut params = Params::new();
/// eq("status", vec![1, 2]).append_to_query(&mut sql, &mut params).unwrap();
/// assert!(sql.starts_with("status IN (:status_"));
/// ```
pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Expr {
    Expr::Eq {
        column: column.into(),
        value: value.into(),
    }
}

/// `column = column + delta`
pub fn add(column: impl Into<String>, delta: impl Into<Value>) -> Expr {
    Expr::Add {
        column: column.into(),
        value: delta.into(),
    }
}

/// `column > value`
pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Expr {
    Expr::Gt {
        column: column.into(),
        value: value.into(),
    }
}

/// `column < value`
pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Expr {
    Expr::Lt {
        column: column.into(),
        value: value.into(),
    }
}

/// `column = expr`, typically another column (`o.user_id = u.id`)
pub fn eq_raw(column: impl Into<String>, expr: impl Into<String>) -> Expr {
    Expr::EqRaw {
        column: column.into(),
        expr: expr.into(),
    }
}

/// `column DESC`
pub fn desc(column: impl Into<String>) -> Expr {
    Expr::Desc(column.into())
}

/// `column = VALUES(column)`
pub fn values(column: impl Into<String>) -> Expr {
    Expr::Values(column.into())
}

/// `(left OR right)`
pub fn or(left: impl Into<Expr>, right: impl Into<Expr>) -> Expr {
    Expr::Or {
        left: Some(Box::new(left.into())),
        right: Some(Box::new(right.into())),
    }
}

/// `func(column) AS alias`
pub fn func_as(
    func: impl Into<String>,
    column: impl Into<String>,
    alias: impl Into<String>,
) -> Expr {
    Expr::FuncAs {
        func: func.into(),
        column: column.into(),
        alias: alias.into(),
    }
}

fn append_bound(
    sql: &mut String,
    params: &mut Params,
    column: &str,
    operator: &str,
    value: &Value,
) {
    let name = param_name(column);
    sql.push_str(column);
    sql.push_str(operator);
    sql.push(':');
    sql.push_str(&name);
    params.insert(name, value.clone());
}

impl AppendToQuery for Expr {
    fn append_to_query(&self, sql: &mut String, params: &mut Params) -> Result<()> {
        match self {
            Expr::Raw(text) => sql.push_str(text),
            Expr::Eq { column, value } => match value {
                Value::Array(items) if items.is_empty() => {
                    return Err(Error::empty_in(column.as_str()));
                }
                Value::Array(_) => {
                    let name = param_name(column);
                    sql.push_str(column);
                    sql.push_str(" IN (:");
                    sql.push_str(&name);
                    sql.push(')');
                    params.insert(name, value.clone());
                }
                _ => append_bound(sql, params, column, " = ", value),
            },
            Expr::Add { column, value } => {
                sql.push_str(column);
                sql.push_str(" = ");
                append_bound(sql, params, column, " + ", value);
            }
            Expr::Gt { column, value } => append_bound(sql, params, column, " > ", value),
            Expr::Lt { column, value } => append_bound(sql, params, column, " < ", value),
            Expr::EqRaw { column, expr } => {
                sql.push_str(column);
                sql.push_str(" = ");
                sql.push_str(expr);
            }
            Expr::Desc(column) => {
                sql.push_str(column);
                sql.push_str(" DESC");
            }
            Expr::Values(column) => {
                sql.push_str(column);
                sql.push_str(" = VALUES(");
                sql.push_str(column);
                sql.push(')');
            }
            Expr::Or { left, right } => {
                let (Some(left), Some(right)) = (left, right) else {
                    return Err(Error::invalid_query("OR requires both operands"));
                };
                sql.push('(');
                left.append_to_query(sql, params)?;
                sql.push_str(" OR ");
                right.append_to_query(sql, params)?;
                sql.push(')');
            }
            Expr::FuncAs {
                func,
                column,
                alias,
            } => {
                sql.push_str(func);
                sql.push('(');
                sql.push_str(column);
                sql.push_str(") AS ");
                sql.push_str(alias);
            }
            Expr::Join(join) => join.append_to_query(sql, params)?,
            Expr::Select(select) => select.append_to_query(sql, params)?,
        }
        Ok(())
    }
}

impl From<&str> for Expr {
    fn from(sql: &str) -> Self {
        Expr::Raw(sql.to_string())
    }
}

impl From<String> for Expr {
    fn from(sql: String) -> Self {
        Expr::Raw(sql)
    }
}

impl From<&String> for Expr {
    fn from(sql: &String) -> Self {
        Expr::Raw(sql.clone())
    }
}
