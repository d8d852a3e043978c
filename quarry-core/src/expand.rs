//! Turning named statements into driver-ready positional ones
//!
//! Expansion runs in two passes over the rendered text:
//!
//! 1. every `:name` placeholder becomes `?` and its value is appended to the
//!    argument list (a name used twice binds twice);
//! 2. every `?` whose argument is an array becomes `?, ?, ...` with one
//!    placeholder per element, and the elements replace the array in the
//!    argument list.
//!
//! Quoted literals (`'..'`, `".."`, `` `..` ``) are copied untouched, and
//! `::` is an escaped literal colon.

use crate::expr::Params;
use crate::namer::is_param_char;
use crate::{Error, Result, Value};

/// Positional placeholder syntax of the target driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placeholder {
    /// `?` (MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

/// A statement with positional placeholders and its flat argument list
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

enum Piece<'a> {
    Text(&'a str),
    Quoted(&'a str),
    Named(&'a str),
    Positional,
}

fn is_param_byte(b: u8) -> bool {
    is_param_char(char::from(b))
}

/// Index just past the quote that closes the literal opened at `open`.
fn quote_end(bytes: &[u8], open: usize) -> Result<usize> {
    let quote = bytes[open];
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Ok(i + 1);
        }
        i += 1;
    }
    Err(Error::expansion(format!(
        "unterminated {} literal starting at byte {}",
        char::from(quote),
        open
    )))
}

fn push_text<'a>(pieces: &mut Vec<Piece<'a>>, sql: &'a str, from: usize, to: usize) {
    if from < to {
        pieces.push(Piece::Text(&sql[from..to]));
    }
}

/// Split `sql` into pieces. With `named` unset, colons are plain text.
fn tokenize(sql: &str, named: bool) -> Result<Vec<Piece<'_>>> {
    let bytes = sql.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                push_text(&mut pieces, sql, start, i);
                let end = quote_end(bytes, i)?;
                pieces.push(Piece::Quoted(&sql[i..end]));
                i = end;
                start = i;
            }
            b':' if named && bytes.get(i + 1) == Some(&b':') => {
                push_text(&mut pieces, sql, start, i);
                pieces.push(Piece::Text(":"));
                i += 2;
                start = i;
            }
            b':' if named && bytes.get(i + 1).is_some_and(|b| is_param_byte(*b)) => {
                push_text(&mut pieces, sql, start, i);
                let name_start = i + 1;
                let mut end = name_start;
                while end < bytes.len() && is_param_byte(bytes[end]) {
                    end += 1;
                }
                pieces.push(Piece::Named(&sql[name_start..end]));
                i = end;
                start = i;
            }
            b'?' => {
                push_text(&mut pieces, sql, start, i);
                pieces.push(Piece::Positional);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    push_text(&mut pieces, sql, start, bytes.len());
    Ok(pieces)
}

/// Replace every `:name` with `?`, collecting values in text order.
pub fn bind_named(sql: &str, params: &Params) -> Result<PositionalQuery> {
    let mut out = String::with_capacity(sql.len());
    let mut args = Vec::with_capacity(params.len());

    for piece in tokenize(sql, true)? {
        match piece {
            Piece::Text(text) | Piece::Quoted(text) => out.push_str(text),
            Piece::Named(name) => {
                let value = params
                    .get(name)
                    .ok_or_else(|| Error::expansion(format!("no value bound for :{}", name)))?;
                out.push('?');
                args.push(value.clone());
            }
            Piece::Positional => {
                return Err(Error::expansion(
                    "positional '?' placeholder in a named statement",
                ));
            }
        }
    }

    Ok(PositionalQuery { sql: out, args })
}

/// Expand each `?` bound to an array into one `?` per element.
pub fn flatten_collections(query: PositionalQuery) -> Result<PositionalQuery> {
    let pieces = tokenize(&query.sql, false)?;
    let placeholders = pieces
        .iter()
        .filter(|p| matches!(p, Piece::Positional))
        .count();
    if placeholders != query.args.len() {
        return Err(Error::expansion(format!(
            "{} placeholders but {} arguments",
            placeholders,
            query.args.len()
        )));
    }

    let mut out = String::with_capacity(query.sql.len());
    let mut args = Vec::with_capacity(query.args.len());
    let mut values = query.args.into_iter();

    for piece in pieces {
        match piece {
            Piece::Text(text) | Piece::Quoted(text) => out.push_str(text),
            Piece::Named(name) => {
                out.push(':');
                out.push_str(name);
            }
            Piece::Positional => match values.next() {
                Some(Value::Array(items)) => {
                    if items.is_empty() {
                        return Err(Error::expansion(format!(
                            "empty collection bound to placeholder {}",
                            args.len() + 1
                        )));
                    }
                    if items.iter().any(|v| matches!(v, Value::Array(_))) {
                        return Err(Error::expansion("nested collections cannot be bound"));
                    }
                    for (i, item) in items.into_iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push('?');
                        args.push(item);
                    }
                }
                Some(value) => {
                    out.push('?');
                    args.push(value);
                }
                None => return Err(Error::expansion("ran out of arguments")),
            },
        }
    }

    Ok(PositionalQuery { sql: out, args })
}

/// Both expansion passes
pub fn expand(sql: &str, params: &Params) -> Result<PositionalQuery> {
    flatten_collections(bind_named(sql, params)?)
}

/// Rewrite `?` placeholders into the given style.
pub fn rebind(sql: &str, style: Placeholder) -> Result<String> {
    if style == Placeholder::Question {
        return Ok(sql.to_string());
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    for piece in tokenize(sql, false)? {
        match piece {
            Piece::Text(text) | Piece::Quoted(text) => out.push_str(text),
            Piece::Named(name) => {
                out.push(':');
                out.push_str(name);
            }
            Piece::Positional => {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            }
        }
    }
    Ok(out)
}

/// Substitute arguments into `?` placeholders for display. Strings are
/// double-quoted. Never executed.
pub fn interpolate(sql: &str, args: &[Value]) -> String {
    let Ok(pieces) = tokenize(sql, false) else {
        return sql.to_string();
    };

    let mut out = String::with_capacity(sql.len() + args.len() * 4);
    let mut values = args.iter();
    for piece in pieces {
        match piece {
            Piece::Text(text) | Piece::Quoted(text) => out.push_str(text),
            Piece::Named(name) => {
                out.push(':');
                out.push_str(name);
            }
            Piece::Positional => match values.next() {
                Some(value) => out.push_str(&value.to_log_literal()),
                None => out.push('?'),
            },
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_named_to_positional_in_text_order() {
        let p = params(&[("b_2", Value::I64(2)), ("a_1", Value::I64(1))]);
        let query = expand("SELECT * FROM t WHERE a = :a_1 AND b = :b_2", &p).unwrap();
        assert_eq!(query.sql, "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(query.args, vec![Value::I64(1), Value::I64(2)]);
    }

    #[test]
    fn test_in_list_expansion() {
        let p = params(&[("id_1", Value::from(vec![1i64, 2, 3]))]);
        let query = expand("SELECT * FROM t WHERE id IN (:id_1)", &p).unwrap();
        assert_eq!(query.sql, "SELECT * FROM t WHERE id IN (?, ?, ?)");
        assert_eq!(query.args, vec![Value::I64(1), Value::I64(2), Value::I64(3)]);
    }

    #[test]
    fn test_insert_rows_flatten_per_row() {
        let p = params(&[
            ("value0", Value::from(vec![Value::from("a"), Value::I64(1)])),
            ("value1", Value::from(vec![Value::from("b"), Value::I64(2)])),
        ]);
        let query = expand("INSERT INTO t (n, v) VALUES (:value0), (:value1)", &p).unwrap();
        assert_eq!(query.sql, "INSERT INTO t (n, v) VALUES (?, ?), (?, ?)");
        assert_eq!(query.args.len(), 4);
        assert_eq!(query.args[2], Value::from("b"));
    }

    #[test]
    fn test_bytes_bind_as_one_value() {
        let p = params(&[("blob_1", Value::Bytes(vec![1, 2, 3]))]);
        let query = expand("UPDATE t SET blob = :blob_1", &p).unwrap();
        assert_eq!(query.sql, "UPDATE t SET blob = ?");
        assert_eq!(query.args, vec![Value::Bytes(vec![1, 2, 3])]);
    }

    #[test]
    fn test_quoted_literals_and_escaped_colon() {
        let p = params(&[("x_1", Value::I64(5))]);
        let query = expand(
            "SELECT ':nope', \"a?b\", `c:d`, 'it''s', TIME('10::30') FROM t WHERE x = :x_1",
            &p,
        )
        .unwrap();
        assert_eq!(
            query.sql,
            "SELECT ':nope', \"a?b\", `c:d`, 'it''s', TIME('10::30') FROM t WHERE x = ?"
        );
        assert_eq!(query.args, vec![Value::I64(5)]);

        let query = expand("SELECT 10::30", &Params::new()).unwrap();
        assert_eq!(query.sql, "SELECT 10:30");
    }

    #[test]
    fn test_missing_parameter_fails() {
        let err = expand("SELECT :a_1", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::Expansion { .. }));
    }

    #[test]
    fn test_empty_and_nested_collections_fail() {
        let empty = params(&[("id_1", Value::Array(vec![]))]);
        assert!(expand("id IN (:id_1)", &empty).is_err());

        let nested = params(&[("id_1", Value::from(vec![vec![1i64]]))]);
        let err = expand("id IN (:id_1)", &nested).unwrap_err();
        assert!(err.to_string().contains("nested"));
    }

    #[test]
    fn test_stray_positional_fails() {
        let err = expand("SELECT * FROM t WHERE a = ?", &Params::new()).unwrap_err();
        assert!(matches!(err, Error::Expansion { .. }));
    }

    #[test]
    fn test_unterminated_literal_fails() {
        assert!(expand("SELECT 'abc", &Params::new()).is_err());
    }

    #[test]
    fn test_rebind_dollar() {
        let sql = rebind("a = ? AND b IN (?, ?) AND c = '?'", Placeholder::Dollar).unwrap();
        assert_eq!(sql, "a = $1 AND b IN ($2, $3) AND c = '?'");
        assert_eq!(rebind("a = ?", Placeholder::Question).unwrap(), "a = ?");
    }

    #[test]
    fn test_interpolate_for_logs() {
        let sql = interpolate(
            "SELECT * FROM t WHERE name = ? AND id IN (?, ?)",
            &[Value::from("bob"), Value::I64(1), Value::I64(2)],
        );
        assert_eq!(sql, "SELECT * FROM t WHERE name = \"bob\" AND id IN (1, 2)");
    }
}
