//! Core SQL fragment type.

use crate::param::SqlParam;
use std::fmt::Write;

/// A SQL fragment with its associated parameters.
///
/// This is the core type the whole compiler is built from. It holds a SQL
/// string with `$N` placeholders already written out, plus the parameter
/// values those placeholders reference. Appending one fragment to another
/// renumbers the appended fragment's placeholders so the combined fragment
/// stays internally consistent — callers never hand-number `$N`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlFragment {
    sql: String,
    params: Vec<SqlParam>,
}

impl SqlFragment {
    /// Create a new empty SQL fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SQL fragment from raw SQL (no parameters).
    ///
    /// # Warning
    ///
    /// Only use this for known-safe SQL strings (keywords, operators,
    /// identifiers that have already been through [`crate::escape_ident`]).
    /// Never use this with unescaped user input.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Create a SQL fragment holding a single bound parameter (`$1`).
    pub fn param(value: impl Into<SqlParam>) -> Self {
        let mut frag = Self::new();
        frag.push_param(value);
        frag
    }

    /// Get the SQL string built so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the parameters bound so far.
    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Current parameter count.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Whether this fragment has emitted no SQL text at all.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Append raw SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a single character.
    pub fn push_char(&mut self, c: char) -> &mut Self {
        self.sql.push(c);
        self
    }

    /// Push a parameter and its `$N` placeholder.
    pub fn push_param(&mut self, value: impl Into<SqlParam>) -> &mut Self {
        let param_num = self.params.len() + 1;
        write!(self.sql, "${}", param_num).unwrap();
        self.params.push(value.into());
        self
    }

    /// Push a parameter with an explicit cast, e.g. `$1::text`.
    pub fn push_typed_param(&mut self, value: impl Into<SqlParam>, pg_type: &str) -> &mut Self {
        let param_num = self.params.len() + 1;
        write!(self.sql, "${}::{}", param_num, pg_type).unwrap();
        self.params.push(value.into());
        self
    }

    /// Append another fragment, renumbering its placeholders to continue
    /// from this fragment's current parameter count.
    pub fn append(&mut self, other: SqlFragment) -> &mut Self {
        let offset = self.params.len();
        let renumbered = renumber_params(&other.sql, offset);
        self.sql.push_str(&renumbered);
        self.params.extend(other.params);
        self
    }

    /// Append another fragment, inserting `sep` between the two only if
    /// both sides are non-empty.
    pub fn append_sep(&mut self, sep: &str, other: SqlFragment) -> &mut Self {
        if !self.is_empty() && !other.is_empty() {
            self.push(sep);
        }
        self.append(other)
    }

    /// Join fragments with a separator, skipping empty ones.
    pub fn join(sep: &str, fragments: impl IntoIterator<Item = SqlFragment>) -> Self {
        let mut result = Self::new();
        let mut first = true;
        for frag in fragments {
            if frag.is_empty() {
                continue;
            }
            if !first {
                result.push(sep);
            }
            result.append(frag);
            first = false;
        }
        result
    }

    /// Wrap this fragment's SQL text in parentheses.
    pub fn parens(mut self) -> Self {
        self.sql = format!("({})", self.sql);
        self
    }

    /// Consume the fragment, returning the final `(text, params)` pair.
    pub fn build(self) -> (String, Vec<SqlParam>) {
        (self.sql, self.params)
    }
}

/// Renumber `$N` placeholders in `sql` by adding `offset` to each number.
fn renumber_params(sql: &str, offset: usize) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            let mut num_str = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    num_str.push(chars.next().unwrap());
                } else {
                    break;
                }
            }
            if let Ok(num) = num_str.parse::<usize>() {
                write!(result, "${}", num + offset).unwrap();
            } else {
                result.push('$');
                result.push_str(&num_str);
            }
        } else {
            result.push(c);
        }
    }

    result
}
