//! Batched association of rows across tables
//!
//! Given rows from one query, collect the distinct values of a key column,
//! fetch the matching rows of another table with a single `IN` query, and
//! index them by key string so callers can stitch the two sides together
//! without a SQL JOIN.

use crate::builder::{IntoColumns, SelectBuilder};
use crate::executor::Executor;
use crate::expr::eq;
use crate::row::{column_key, Row};
use crate::{Error, Result, Value};
use std::collections::HashMap;

/// Rows indexed by key string, one row per key (last write wins)
pub type OneMap = HashMap<String, Row>;

/// Rows indexed by key string, grouped in result order
pub type ManyMap = HashMap<String, Vec<Row>>;

/// The table side of an association: which table to query, the key column
/// to match on, and the columns to fetch (empty means `*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    table: String,
    key: String,
    columns: Vec<String>,
}

impl JoinTarget {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            columns: Vec::new(),
        }
    }

    pub fn columns<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns.extend(columns.into_columns());
        self
    }

    /// `SELECT <columns> FROM <table> WHERE <key> IN (<keys>)`
    ///
    /// The key column is appended to a non-empty column list that lacks it.
    fn select(&self, keys: &[Value]) -> SelectBuilder {
        let mut columns = self.columns.clone();
        if !columns.is_empty() && !columns.iter().any(|c| c == &self.key) {
            columns.push(self.key.clone());
        }
        SelectBuilder::new()
            .columns(columns)
            .from(self.table.as_str())
            .where_(eq(self.key.as_str(), keys.to_vec()))
    }
}

fn key_of<'a>(row: &'a Row, key: &str) -> Result<&'a Value> {
    row.get(key).ok_or_else(|| Error::missing_key(key))
}

/// Distinct values of `key` across `rows`, in first-seen order.
///
/// `key` may be qualified (`o.user_id`); rows are looked up by its
/// [`column_key`].
pub fn distinct_values<'a, I>(rows: I, key: &str) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let map_key = column_key(key);
    let mut values: Vec<Value> = Vec::new();
    for row in rows {
        let value = row.get(&map_key).ok_or_else(|| Error::missing_key(key))?;
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
    Ok(values)
}

/// Distinct values of `key` across the rows of a one-to-one map
pub fn distinct_values_in_map(map: &OneMap, key: &str) -> Result<Vec<Value>> {
    distinct_values(map.values(), key)
}

/// Distinct values of `key` across every group of a one-to-many map
pub fn distinct_values_in_groups(map: &ManyMap, key: &str) -> Result<Vec<Value>> {
    distinct_values(map.values().flatten(), key)
}

/// Fetch the target rows whose key is in `keys`, one row per key.
///
/// Empty `keys` returns an empty map without querying.
pub async fn resolve_keys_one<E: Executor>(
    conn: &mut E,
    keys: &[Value],
    target: &JoinTarget,
) -> Result<OneMap> {
    let mut map = OneMap::new();
    if keys.is_empty() {
        return Ok(map);
    }

    let map_key = column_key(&target.key);
    for row in target.select(keys).rows(conn).await? {
        let k = key_of(&row, &map_key)?.to_string();
        map.insert(k, row);
    }
    Ok(map)
}

/// Fetch the target rows whose key is in `keys`, grouped by key.
///
/// Empty `keys` returns an empty map without querying.
pub async fn resolve_keys_many<E: Executor>(
    conn: &mut E,
    keys: &[Value],
    target: &JoinTarget,
) -> Result<ManyMap> {
    let mut map = ManyMap::new();
    if keys.is_empty() {
        return Ok(map);
    }

    let map_key = column_key(&target.key);
    for row in target.select(keys).rows(conn).await? {
        let k = key_of(&row, &map_key)?.to_string();
        map.entry(k).or_default().push(row);
    }
    Ok(map)
}

/// Associate each source row's `source_key` with one target row.
///
/// Returns the association map and the distinct source keys used.
///
/// ```ignore
/// let orders = from("orders").rows(&mut db).await?;
/// let (users, user_ids) =
///     resolve_one(&mut db, &orders, "user_id", &JoinTarget::new("users", "id").columns(("id", "name"))).await?;
/// for order in &orders {
///     let user = &users[&order["user_id"].to_string()];
/// }
/// ```
pub async fn resolve_one<E: Executor>(
    conn: &mut E,
    rows: &[Row],
    source_key: &str,
    target: &JoinTarget,
) -> Result<(OneMap, Vec<Value>)> {
    let keys = distinct_values(rows, source_key)?;
    let map = resolve_keys_one(conn, &keys, target).await?;
    Ok((map, keys))
}

/// Associate each source row's `source_key` with every matching target row.
pub async fn resolve_many<E: Executor>(
    conn: &mut E,
    rows: &[Row],
    source_key: &str,
    target: &JoinTarget,
) -> Result<(ManyMap, Vec<Value>)> {
    let keys = distinct_values(rows, source_key)?;
    let map = resolve_keys_many(conn, &keys, target).await?;
    Ok((map, keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::materialize;
    use crate::testing::{result_set, MockExecutor};

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn orders() -> Vec<Row> {
        vec![
            row(&[("id", Value::I64(10)), ("uid", Value::I64(1))]),
            row(&[("id", Value::I64(11)), ("uid", Value::I64(2))]),
            row(&[("id", Value::I64(12)), ("uid", Value::I64(1))]),
        ]
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let values = distinct_values(&orders(), "uid").unwrap();
        assert_eq!(values, vec![Value::I64(1), Value::I64(2)]);
    }

    #[test]
    fn test_distinct_values_missing_key() {
        let err = distinct_values(&orders(), "user_id").unwrap_err();
        assert!(matches!(err, Error::MissingKey { ref key } if key == "user_id"));
    }

    #[test]
    fn test_distinct_values_in_maps() {
        let mut one = OneMap::new();
        one.insert("a".into(), row(&[("k", Value::I64(5))]));
        one.insert("b".into(), row(&[("k", Value::I64(5))]));
        assert_eq!(distinct_values_in_map(&one, "k").unwrap(), vec![Value::I64(5)]);

        let mut many = ManyMap::new();
        many.insert(
            "a".into(),
            vec![row(&[("k", Value::I64(1))]), row(&[("k", Value::I64(2))])],
        );
        let mut values = distinct_values_in_groups(&many, "k").unwrap();
        values.sort_by_key(|v| v.as_i64());
        assert_eq!(values, vec![Value::I64(1), Value::I64(2)]);
    }

    #[test]
    fn test_distinct_values_qualified_key() {
        let rows = vec![row(&[("user_id", Value::I64(3))])];
        assert_eq!(
            distinct_values(&rows, "`o`.`user_id`").unwrap(),
            vec![Value::I64(3)]
        );

        let err = distinct_values(&rows, "o.uid").unwrap_err();
        assert!(matches!(err, Error::MissingKey { ref key } if key == "o.uid"));
    }

    #[tokio::test]
    async fn test_resolve_one_with_qualified_source_key() {
        let orders = materialize(result_set(
            &[("o.id", "BIGINT"), ("o.user_id", "BIGINT")],
            vec![
                vec![Value::I64(10), Value::I64(1)],
                vec![Value::I64(11), Value::I64(1)],
            ],
        ))
        .unwrap();
        let mut conn = MockExecutor::new().with_result(result_set(
            &[("u.id", "BIGINT"), ("u.name", "VARCHAR")],
            vec![vec![Value::I64(1), Value::from("ann")]],
        ));

        let target = JoinTarget::new("users u", "u.id").columns(("u.id", "u.name"));
        let (users, keys) = resolve_one(&mut conn, &orders, "o.user_id", &target)
            .await
            .unwrap();

        assert_eq!(keys, vec![Value::I64(1)]);
        assert_eq!(users["1"].get("name"), Some(&Value::from("ann")));
        assert_eq!(
            conn.statements[0].0,
            "SELECT u.id, u.name FROM users u WHERE u.id IN (?)"
        );
    }

    #[tokio::test]
    async fn test_resolve_one() {
        let mut conn = MockExecutor::new().with_result(result_set(
            &[("name", "VARCHAR"), ("id", "BIGINT")],
            vec![
                vec![Value::from("ann"), Value::I64(1)],
                vec![Value::from("bob"), Value::I64(2)],
            ],
        ));

        let target = JoinTarget::new("users", "id").columns("name");
        let (users, keys) = resolve_one(&mut conn, &orders(), "uid", &target).await.unwrap();

        assert_eq!(keys, vec![Value::I64(1), Value::I64(2)]);
        assert_eq!(users.len(), 2);
        assert_eq!(users["1"].get("name"), Some(&Value::from("ann")));
        assert_eq!(users["2"].get("name"), Some(&Value::from("bob")));

        assert_eq!(conn.statements.len(), 1);
        let (sql, args) = &conn.statements[0];
        assert_eq!(sql, "SELECT name, id FROM users WHERE id IN (?, ?)");
        assert_eq!(args, &vec![Value::I64(1), Value::I64(2)]);
    }

    #[tokio::test]
    async fn test_resolve_many_groups_in_result_order() {
        let mut conn = MockExecutor::new().with_result(result_set(
            &[("o.id", "BIGINT"), ("o.uid", "BIGINT")],
            vec![
                vec![Value::I64(10), Value::I64(1)],
                vec![Value::I64(11), Value::I64(2)],
                vec![Value::I64(12), Value::I64(1)],
            ],
        ));

        let users = vec![
            row(&[("id", Value::I64(1))]),
            row(&[("id", Value::I64(2))]),
        ];
        let target = JoinTarget::new("orders o", "o.uid");
        let (orders, keys) = resolve_many(&mut conn, &users, "id", &target).await.unwrap();

        assert_eq!(keys.len(), 2);
        let ids: Vec<_> = orders["1"].iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::I64(10), Value::I64(12)]);
        assert_eq!(orders["2"].len(), 1);
        assert_eq!(
            conn.statements[0].0,
            "SELECT * FROM orders o WHERE o.uid IN (?, ?)"
        );
    }

    #[tokio::test]
    async fn test_empty_keys_skip_the_query() {
        let mut conn = MockExecutor::new();
        let target = JoinTarget::new("users", "id");

        let one = resolve_keys_one(&mut conn, &[], &target).await.unwrap();
        let (many, keys) = resolve_many(&mut conn, &[], "uid", &target).await.unwrap();

        assert!(one.is_empty());
        assert!(many.is_empty());
        assert!(keys.is_empty());
        assert!(conn.statements.is_empty());
    }

    #[tokio::test]
    async fn test_one_to_one_last_write_wins() {
        let mut conn = MockExecutor::new().with_result(result_set(
            &[("id", "BIGINT"), ("v", "VARCHAR")],
            vec![
                vec![Value::I64(1), Value::from("first")],
                vec![Value::I64(1), Value::from("second")],
            ],
        ));
        let target = JoinTarget::new("t", "id").columns(("id", "v"));
        let map = resolve_keys_one(&mut conn, &[Value::I64(1)], &target).await.unwrap();

        assert_eq!(map["1"].get("v"), Some(&Value::from("second")));
        assert_eq!(conn.statements[0].0, "SELECT id, v FROM t WHERE id IN (?)");
    }

    #[tokio::test]
    async fn test_result_without_key_column_fails() {
        let mut conn = MockExecutor::new().with_result(result_set(
            &[("name", "VARCHAR")],
            vec![vec![Value::from("ann")]],
        ));
        let target = JoinTarget::new("users", "id");
        let err = resolve_keys_one(&mut conn, &[Value::I64(1)], &target)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingKey { .. }));
    }
}
