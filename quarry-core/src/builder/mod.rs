//! Statement builders
//!
//! Each builder is a plain value assembled with consuming `mut self -> Self`
//! methods. Rendering never mutates the builder, so one builder can be
//! rendered (or executed through a clone) any number of times; every render
//! draws fresh placeholder names.

pub mod delete;
pub mod insert;
pub mod join;
pub mod select;
pub mod update;

pub use delete::DeleteBuilder;
pub use insert::InsertBuilder;
pub use join::{Join, JoinType};
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::expr::{AppendToQuery, Expr, Params};
use crate::Result;

/// A rendered statement: SQL text with `:name` placeholders plus the values
/// bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQuery {
    pub sql: String,
    pub params: Params,
}

/// Core trait for all statement builders
pub trait QueryBuilder {
    /// Render the statement and its named parameters.
    fn to_sql(&self) -> Result<NamedQuery>;
}

/// Render any fragment as a standalone statement.
pub(crate) fn render(fragment: &impl AppendToQuery) -> Result<NamedQuery> {
    let mut sql = String::new();
    let mut params = Params::new();
    fragment.append_to_query(&mut sql, &mut params)?;
    Ok(NamedQuery { sql, params })
}

/// Append `items` separated by `separator`.
pub(crate) fn append_list(
    sql: &mut String,
    params: &mut Params,
    items: &[Expr],
    separator: &str,
) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            sql.push_str(separator);
        }
        item.append_to_query(sql, params)?;
    }
    Ok(())
}

/// Append ` WHERE a AND b ...`, or nothing when there are no conditions.
pub(crate) fn append_where(sql: &mut String, params: &mut Params, conditions: &[Expr]) -> Result<()> {
    if conditions.is_empty() {
        return Ok(());
    }
    sql.push_str(" WHERE ");
    append_list(sql, params, conditions, " AND ")
}

/// Plain column names accepted by `columns`, `group_by` and friends
pub trait IntoColumns {
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoColumns for &[&str] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoColumns for (&str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![self.0.to_string(), self.1.to_string(), self.2.to_string()]
    }
}

impl IntoColumns for (&str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
        ]
    }
}

impl IntoColumns for (&str, &str, &str, &str, &str) {
    fn into_columns(self) -> Vec<String> {
        vec![
            self.0.to_string(),
            self.1.to_string(),
            self.2.to_string(),
            self.3.to_string(),
            self.4.to_string(),
        ]
    }
}
