//! Materializing driver rows into name-keyed mappings

use crate::{Error, Result, Value};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// One result row keyed by column key (see [`column_key`]).
pub type Row = BTreeMap<String, Value>;

/// The shape a column value is decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Int64,
    Bytes,
    Float64,
    Timestamp,
}

impl ValueKind {
    /// Whether `value` is a legal decoding for this kind. NULL always is.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ValueKind::Text, Value::String(_)) => true,
            (ValueKind::Int64, Value::I64(_) | Value::I32(_) | Value::U64(_)) => true,
            (ValueKind::Bytes, Value::Bytes(_)) => true,
            (ValueKind::Float64, Value::F64(_) | Value::F32(_)) => true,
            (ValueKind::Timestamp, Value::DateTime(_)) => true,
            _ => false,
        }
    }
}

/// Map a driver-reported column type name to its value kind.
pub fn value_kind(db_type: &str) -> Option<ValueKind> {
    let kind = match db_type {
        "BIT" | "TEXT" | "ENUM" | "GEOMETRY" | "JSON" | "LONGTEXT" | "MEDIUMTEXT" | "DECIMAL"
        | "SET" | "CHAR" | "TINYTEXT" | "VARCHAR" | "NULL" => ValueKind::Text,

        "BLOB" | "LONGBLOB" | "MEDIUMBLOB" | "BINARY" | "TINYBLOB" | "VARBINARY" => {
            ValueKind::Bytes
        }

        "DATETIME" | "DATE" | "TIME" | "TIMESTAMP" => ValueKind::Timestamp,

        "DOUBLE" | "FLOAT" => ValueKind::Float64,

        "MEDIUMINT" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "YEAR" | "BOOLEAN"
        | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED" | "SMALLINT UNSIGNED"
        | "TINYINT UNSIGNED" => ValueKind::Int64,

        _ => return None,
    };
    Some(kind)
}

/// Column name and driver-reported type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub db_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
        }
    }
}

/// A driver row that can decode its cells by position.
pub trait RawRow {
    /// Decode cell `index` as `kind`; SQL NULL decodes to [`Value::Null`].
    fn decode(&self, index: usize, column: &ColumnMeta, kind: ValueKind) -> Result<Value>;
}

/// Raw rows plus the column description shared by all of them
#[derive(Debug)]
pub struct ResultSet<R> {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<R>,
}

impl<R> ResultSet<R> {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

/// The key a column is stored under in a [`Row`]: backticks removed and
/// only the part after the last `.` kept, so `` `u`.`id` `` becomes `id`.
///
/// Two selected columns with the same key (`u.id`, `o.id`) collide; the
/// later one wins.
pub fn column_key(name: &str) -> String {
    let name = name.replace('`', "");
    match name.rsplit_once('.') {
        Some((_, last)) => last.to_string(),
        None => name,
    }
}

/// Turn a raw result set into rows.
///
/// Every column type is checked before any row is read: one unmapped type
/// fails the whole result with [`Error::UnknownColumnType`].
pub fn materialize<R: RawRow>(result: ResultSet<R>) -> Result<Vec<Row>> {
    let kinds = result
        .columns
        .iter()
        .map(|c| value_kind(&c.db_type).ok_or_else(|| Error::unknown_column_type(&c.name, &c.db_type)))
        .collect::<Result<Vec<_>>>()?;
    let keys: Vec<String> = result.columns.iter().map(|c| column_key(&c.name)).collect();

    let mut rows = Vec::with_capacity(result.rows.len());
    for raw in &result.rows {
        let mut row = Row::new();
        for (index, column) in result.columns.iter().enumerate() {
            let kind = kinds[index];
            let value = raw.decode(index, column, kind)?;
            if !kind.accepts(&value) {
                return Err(Error::decode(
                    &column.name,
                    format!("{:?} column decoded as {}", kind, value.type_name()),
                ));
            }
            row.insert(keys[index].clone(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Decode a row into a typed record through its JSON form.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    let json = serde_json::to_value(row)?;
    Ok(serde_json::from_value(json)?)
}

/// Decode every row; the first failure aborts.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>> {
    rows.into_iter().map(from_row).collect()
}
