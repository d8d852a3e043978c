//! Shared helpers for unit tests

use crate::executor::{ExecResult, Executor};
use crate::namer::is_param_char;
use crate::row::{ColumnMeta, RawRow, ResultSet, ValueKind};
use crate::{Result, Value};
use std::collections::VecDeque;

/// Drop the `_<counter>` suffix from every named placeholder so rendered
/// SQL can be compared exactly.
pub(crate) fn strip_counters(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c != ':' {
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if !is_param_char(next) {
                break;
            }
            name.push(next);
            chars.next();
        }
        let trimmed = name.trim_end_matches(|c: char| c.is_ascii_digit());
        match trimmed.strip_suffix('_') {
            Some(base) if trimmed.len() < name.len() => out.push_str(base),
            _ => out.push_str(&name),
        }
    }
    out
}

/// A row whose cells are already values
pub(crate) struct MockRow(pub Vec<Value>);

impl RawRow for MockRow {
    fn decode(&self, index: usize, _column: &ColumnMeta, _kind: ValueKind) -> Result<Value> {
        Ok(self.0.get(index).cloned().unwrap_or(Value::Null))
    }
}

/// Build a result set from `(name, db_type)` columns and value rows.
pub(crate) fn result_set(columns: &[(&str, &str)], rows: Vec<Vec<Value>>) -> ResultSet<MockRow> {
    ResultSet {
        columns: columns
            .iter()
            .map(|(name, db_type)| ColumnMeta::new(*name, *db_type))
            .collect(),
        rows: rows.into_iter().map(MockRow).collect(),
    }
}

/// Executor that records every statement and replays canned results.
#[derive(Default)]
pub(crate) struct MockExecutor {
    pub statements: Vec<(String, Vec<Value>)>,
    pub results: VecDeque<ResultSet<MockRow>>,
    pub exec_result: ExecResult,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, result: ResultSet<MockRow>) -> Self {
        self.results.push_back(result);
        self
    }
}

impl Executor for MockExecutor {
    type Row = MockRow;

    async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.statements.push((sql.to_string(), args.to_vec()));
        Ok(self.exec_result)
    }

    async fn query(&mut self, sql: &str, args: &[Value]) -> Result<ResultSet<MockRow>> {
        self.statements.push((sql.to_string(), args.to_vec()));
        Ok(self.results.pop_front().unwrap_or_else(ResultSet::empty))
    }
}

#[test]
fn test_strip_counters() {
    assert_eq!(strip_counters("a = :a_12 AND b IN (:u_id_3)"), "a = :a AND b IN (:u_id)");
    assert_eq!(strip_counters("VALUES (:value0), (:value1)"), "VALUES (:value0), (:value1)");
    assert_eq!(strip_counters("x = :_5"), "x = :");
}
