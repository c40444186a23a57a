//! The result extractor (spec component 6): decodes the compiler's
//! single `zql_result` text column into a `serde_json::Value`,
//! rejecting any integer that falls outside the safe double-precision
//! range before the caller ever sees it.
//!
//! The compiler always casts its output column to text (see
//! `ivmsql-compiler::compile`), specifically so that driver-side JSON
//! decoding never runs: a driver that parsed the column as JSON itself
//! would silently round large integers through `f64` and lose exactly
//! the precision this module exists to protect. For the same reason
//! this crate parses with `serde_json`'s `arbitrary_precision` feature
//! enabled, so an oversized integer literal keeps its exact digits
//! through `serde_json::from_str` instead of becoming a lossy `f64`
//! before the range check below ever runs.

use crate::error::ExtractError;
use serde_json::Value as JsonValue;

/// One row of the driver's result set, as returned for a compiled
/// query (always exactly the single `zql_result` text column).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub zql_result: String,
}

impl Row {
    pub fn new(zql_result: impl Into<String>) -> Self {
        Self {
            zql_result: zql_result.into(),
        }
    }
}

/// Decode a compiled query's result set into a JSON value, enforcing
/// the safe-integer bound on every number in the tree.
///
/// `bound` is `CompilerConfig::safe_integer_bound` (default
/// `9_007_199_254_740_991`, i.e. 2^53 − 1); values outside
/// `-bound..=bound` raise `ValueOutOfSafeRange`.
pub fn extract(rows: &[Row], bound: i64) -> Result<JsonValue, ExtractError> {
    if rows.len() != 1 {
        return Err(ExtractError::UnexpectedRowCount { found: rows.len() });
    }
    let value: JsonValue = serde_json::from_str(&rows[0].zql_result)?;
    let mut path = Vec::new();
    check_safe_range(&value, &mut path, bound)?;
    Ok(value)
}

fn check_safe_range(value: &JsonValue, path: &mut Vec<String>, bound: i64) -> Result<(), ExtractError> {
    match value {
        JsonValue::Number(n) => {
            if let Some(raw) = out_of_range_text(n, bound) {
                return Err(ExtractError::ValueOutOfSafeRange {
                    path: path.clone(),
                    value: raw,
                });
            }
            Ok(())
        }
        JsonValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(format!("[{i}]"));
                check_safe_range(item, path, bound)?;
                path.pop();
            }
            Ok(())
        }
        JsonValue::Object(map) => {
            for (key, val) in map {
                path.push(format!("['{key}']"));
                check_safe_range(val, path, bound)?;
                path.pop();
            }
            Ok(())
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::String(_) => Ok(()),
    }
}

/// Returns the exact decimal text of `n` if it falls outside
/// `-bound..=bound`, `None` otherwise. With the `arbitrary_precision`
/// feature enabled, `serde_json::Number` keeps an integer literal's
/// original digits intact no matter how large it is, so a literal too
/// big to fit `i64`/`u64` is still judged by its exact text instead of
/// silently round-tripping through a lossy `f64`.
fn out_of_range_text(n: &serde_json::Number, bound: i64) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return (i > bound || i < -bound).then(|| n.to_string());
    }
    if let Some(u) = n.as_u64() {
        return (u > bound as u64).then(|| n.to_string());
    }
    let raw = n.to_string();
    // Doesn't fit i64 or u64 at all (bound is always <= i64::MAX), so an
    // integer-shaped literal here is certainly outside the safe range.
    // A literal with a fractional part or exponent is a genuine float,
    // already approximate, and not this check's concern.
    is_integer_literal(&raw).then_some(raw)
}

fn is_integer_literal(raw: &str) -> bool {
    !raw.contains(['.', 'e', 'E'])
}
