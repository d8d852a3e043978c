//! Quarry - composable SQL fragments and dynamic row mappings for MySQL
//!
//! Build statements from small fragments, bind values through named
//! placeholders, read rows back as column-keyed [`Row`] mappings, and stitch
//! rows from separate queries together with one batched `IN` lookup.
//!
//! ```
//! use quarry::{desc, eq, from, gt, or, QueryBuilder};
//!
//! let query = from("users")
//!     .columns(("id", "name"))
//!     .where_(eq("status", vec![1, 2]))
//!     .where_(or(gt("age", 18), "vip = 1"))
//!     .order_by(desc("id"))
//!     .limit(20)
//!     .to_sql()
//!     .unwrap();
//!
//! assert!(query.sql.starts_with("SELECT id, name FROM users WHERE status IN (:status_"));
//! assert_eq!(query.params.len(), 2);
//! ```

pub use quarry_core::{
    add, column_key, desc, distinct_values, distinct_values_in_groups, distinct_values_in_map, eq,
    eq_raw, exec, expand, fetch_rows, from_row, from_rows, func_as, gt, lt, materialize, or, raw,
    rebind, resolve_keys_many, resolve_keys_one, resolve_many, resolve_one, transaction, values,
    AppendToQuery, ColumnMeta, DbConfig, DeleteBuilder, Error, ExecResult, ExecutableModification,
    Executor, Expr, InsertBuilder, IntoColumns, Join, JoinTarget, JoinType, ManyMap, NamedQuery,
    OneMap, Params, Placeholder, PositionalQuery, QueryBuilder, RawRow, Result, ResultSet, Row,
    SelectBuilder, Transaction, TransactionalPool, UpdateBuilder, Value, ValueKind,
};

#[cfg(feature = "mysql")]
pub use quarry_core::{MySqlDatabase, MySqlTransaction};

/// Start a SELECT with no table yet
pub fn select() -> SelectBuilder {
    SelectBuilder::new()
}

/// Start a SELECT over `table`
pub fn from(table: impl Into<Expr>) -> SelectBuilder {
    SelectBuilder::new().from(table)
}

/// Start an INSERT into `table`
pub fn insert_into(table: &str) -> InsertBuilder {
    InsertBuilder::new(table)
}

/// Start an UPDATE of `table`
pub fn update(table: &str) -> UpdateBuilder {
    UpdateBuilder::new(table)
}

/// Start a DELETE from `table`
pub fn delete_from(table: &str) -> DeleteBuilder {
    DeleteBuilder::new(table)
}

/// `INNER JOIN table`; add conditions with [`Join::on`]
pub fn inner_join(table: impl Into<Expr>) -> Join {
    Join::inner(table)
}

/// `LEFT JOIN table`; add conditions with [`Join::on`]
pub fn left_join(table: impl Into<Expr>) -> Join {
    Join::left(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// Replaces `:name_<n>` with `:name` so rendered SQL compares exactly.
    fn normalize(sql: &str) -> String {
        let mut out = String::new();
        let mut rest = sql;
        while let Some(pos) = rest.find(':') {
            out.push_str(&rest[..=pos]);
            rest = &rest[pos + 1..];
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let name = &rest[..end];
            match name.rfind('_') {
                Some(i) if i + 1 < name.len() && name[i + 1..].chars().all(|c| c.is_ascii_digit()) => {
                    out.push_str(&name[..i])
                }
                _ => out.push_str(name),
            }
            rest = &rest[end..];
        }
        out.push_str(rest);
        out
    }

    #[test]
    fn test_entry_points() {
        assert_eq!(from("users").to_sql().unwrap().sql, "SELECT * FROM users");
        assert_eq!(
            select().columns("1").from("DUAL").to_sql().unwrap().sql,
            "SELECT 1 FROM DUAL"
        );
        assert_eq!(
            delete_from("sessions").to_sql().unwrap().sql,
            "DELETE FROM sessions"
        );
        assert_eq!(
            normalize(&update("users").set(eq("name", "x")).to_sql().unwrap().sql),
            "UPDATE users SET name = :name"
        );
        assert_eq!(
            insert_into("t").columns("a").values(1).to_sql().unwrap().sql,
            "INSERT INTO t (a) VALUES (:value0)"
        );
    }

    #[test]
    fn test_joined_select() {
        let query = from("users u")
            .columns(("u.id", "o.total"))
            .join(inner_join("orders o").on(eq_raw("o.user_id", "u.id")))
            .join(left_join("coupons c").on(eq_raw("c.order_id", "o.id")).on(gt("c.amount", 0)))
            .where_(eq("u.id", vec![1, 2, 3]))
            .to_sql()
            .unwrap();

        assert_eq!(
            normalize(&query.sql),
            "SELECT u.id, o.total FROM users u \
             INNER JOIN orders o ON (o.user_id = u.id) \
             LEFT JOIN coupons c ON (c.order_id = o.id AND c.amount > :c_amount) \
             WHERE u.id IN (:u_id)"
        );

        let positional = expand(&query.sql, &query.params).unwrap();
        assert!(positional.sql.ends_with("c.amount > ?) WHERE u.id IN (?, ?, ?)"));
        assert_eq!(positional.args.len(), 4);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("a = :a_12 AND b = :value0"), "a = :a AND b = :value0");
    }

    struct StaticRow(Vec<Value>);

    impl RawRow for StaticRow {
        fn decode(&self, index: usize, _column: &ColumnMeta, _kind: ValueKind) -> Result<Value> {
            Ok(self.0[index].clone())
        }
    }

    #[derive(Default)]
    struct Recorder {
        statements: Vec<String>,
        rows: Vec<Vec<Value>>,
    }

    impl Executor for Recorder {
        type Row = StaticRow;

        async fn execute(&mut self, sql: &str, _args: &[Value]) -> Result<ExecResult> {
            self.statements.push(sql.to_string());
            Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: 100,
            })
        }

        async fn query(&mut self, sql: &str, _args: &[Value]) -> Result<ResultSet<StaticRow>> {
            self.statements.push(sql.to_string());
            Ok(ResultSet {
                columns: vec![
                    ColumnMeta::new("id", "BIGINT"),
                    ColumnMeta::new("email", "VARCHAR"),
                ],
                rows: self.rows.drain(..).map(StaticRow).collect(),
            })
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Account {
        id: i64,
        email: String,
    }

    #[test]
    fn test_typed_select_through_custom_executor() {
        let mut conn = Recorder {
            rows: vec![vec![Value::I64(3), Value::from("a@x.io")]],
            ..Recorder::default()
        };

        let accounts: Vec<Account> = tokio_test::block_on(
            from("accounts")
                .columns(("id", "email"))
                .where_(eq("id", vec![3, 4]))
                .do_select(&mut conn),
        )
        .unwrap();

        assert_eq!(
            accounts,
            vec![Account {
                id: 3,
                email: "a@x.io".into()
            }]
        );
        assert_eq!(
            conn.statements,
            vec!["SELECT id, email FROM accounts WHERE id IN (?, ?)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_insert_then_update() {
        let mut conn = Recorder::default();

        let id = insert_into("accounts")
            .columns(("email", "plan"))
            .values(vec![Value::from("b@x.io"), Value::from("free")])
            .execute_last_id(&mut conn)
            .await
            .unwrap();
        let updated = update("accounts")
            .set(eq("plan", "pro"))
            .where_(eq("id", id))
            .execute_count(&mut conn)
            .await
            .unwrap();

        assert_eq!(id, 100);
        assert_eq!(updated, 1);
        assert_eq!(
            conn.statements,
            vec![
                "INSERT INTO accounts (email, plan) VALUES (?, ?)".to_string(),
                "UPDATE accounts SET plan = ? WHERE id = ?".to_string(),
            ]
        );
    }
}
