//! Quarry Core - composable SQL fragments and dynamic row mappings
//!
//! Statements are assembled from small fragments that render to SQL text
//! with `:name` placeholders. At execution time the named parameters are
//! expanded into positional ones (collections become `?, ?, ?`), the rows
//! that come back are materialized into column-keyed mappings, and the
//! [`relation`] helpers associate rows across tables with one batched
//! `IN` query per side.

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod expand;
pub mod expr;
pub mod namer;
pub mod relation;
pub mod row;
pub mod value;

#[cfg(test)]
mod testing;

// Re-export main types
pub use builder::{
    DeleteBuilder, InsertBuilder, IntoColumns, Join, JoinType, NamedQuery, QueryBuilder,
    SelectBuilder, UpdateBuilder,
};
pub use config::DbConfig;
pub use error::{Error, Result};
pub use executor::{
    exec, fetch_rows, transaction, ExecResult, ExecutableModification, Executor, Transaction,
    TransactionalPool,
};
pub use expand::{expand, rebind, Placeholder, PositionalQuery};
pub use expr::{add, desc, eq, eq_raw, func_as, gt, lt, or, raw, values, AppendToQuery, Expr, Params};
pub use relation::{
    distinct_values, distinct_values_in_groups, distinct_values_in_map, resolve_keys_many,
    resolve_keys_one, resolve_many, resolve_one, JoinTarget, ManyMap, OneMap,
};
pub use row::{column_key, from_row, from_rows, materialize, ColumnMeta, RawRow, ResultSet, Row, ValueKind};
pub use value::Value;

#[cfg(feature = "mysql")]
pub use executor::mysql::{MySqlDatabase, MySqlTransaction};
