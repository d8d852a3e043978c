//! Collision-free placeholder names

use std::sync::atomic::{AtomicU64, Ordering};

static PARAM_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Produce a placeholder name for `column`.
///
/// The name is the column with every character that cannot appear in a
/// named placeholder replaced by `_`, followed by `_` and a process-wide
/// counter. The counter is never reset, so the same column referenced twice
/// in one statement gets two distinct names (`age_1`, `age_2`).
pub fn param_name(column: &str) -> String {
    let n = PARAM_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let mut name = sanitize(column);
    name.push('_');
    name.push_str(&n.to_string());
    name
}

/// Whether `c` may appear in a placeholder name.
pub(crate) fn is_param_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn sanitize(column: &str) -> String {
    column
        .chars()
        .map(|c| if is_param_char(c) { c } else { '_' })
        .collect()
}
