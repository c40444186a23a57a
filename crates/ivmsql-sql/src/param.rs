//! SQL parameter values.

use serde::{Deserialize, Serialize};

/// A bound SQL parameter value.
///
/// The coercer (see `ivmsql-compiler::coerce`) is responsible for deciding
/// *which* variant a literal ends up as: per the design notes, every
/// text/numeric/uuid/enum/timestamp/jsonb/array literal is bound as
/// [`SqlParam::Text`] and cast back to its real type in SQL text, so that
/// casting is reproducible across drivers instead of relying on a driver's
/// locale-dependent text-to-numeric coercion. Only booleans and `NULL`
/// bypass the text round-trip, since their wire representation is already
/// unambiguous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlParam {
    /// SQL NULL.
    Null,
    /// A boolean, bound natively (no cast).
    Bool(bool),
    /// Every other literal, pre-cast to its string form by the coercer.
    Text(String),
}

impl SqlParam {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn text_conversions() {
        let p: SqlParam = "hello".into();
        assert_eq!(p, SqlParam::Text("hello".into()));
    }

    #[test]
    fn option_none_is_null() {
        let p: SqlParam = None::<String>.into();
        assert!(p.is_null());
    }

    #[test]
    fn bool_stays_bool() {
        let p: SqlParam = true.into();
        assert_eq!(p, SqlParam::Bool(true));
    }
}
