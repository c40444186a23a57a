//! Safe SQL identifier handling.
//!
//! Every table or column name the compiler emits flows through
//! [`escape_ident`] or [`from_qi`] — never through raw string
//! concatenation — so a client- or server-controlled name that happens to
//! contain a double quote can't break out of the identifier position.

/// Quote a SQL identifier, doubling any embedded double quotes.
///
/// ```
/// use ivmsql_sql::escape_ident;
///
/// assert_eq!(escape_ident("issues"), "\"issues\"");
/// assert_eq!(escape_ident("weird\"name"), "\"weird\"\"name\"");
/// ```
pub fn escape_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A qualified identifier: an optional schema plus a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedIdentifier {
    pub schema: String,
    pub name: String,
}

impl QualifiedIdentifier {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: String::new(),
            name: name.into(),
        }
    }

    /// Parse a server name that may be schema-qualified (`alt.user`),
    /// splitting on the first `.` only — the name itself is never split
    /// further even if it contains dots.
    pub fn parse_server_name(server_name: &str) -> Self {
        match server_name.split_once('.') {
            Some((schema, name)) => Self::new(schema, name),
            None => Self::unqualified(server_name),
        }
    }
}

/// Render a qualified identifier as safely quoted SQL text.
///
/// ```
/// use ivmsql_sql::{from_qi, QualifiedIdentifier};
///
/// assert_eq!(from_qi(&QualifiedIdentifier::new("public", "issues")), "\"public\".\"issues\"");
/// assert_eq!(from_qi(&QualifiedIdentifier::unqualified("issues")), "\"issues\"");
/// ```
pub fn from_qi(qi: &QualifiedIdentifier) -> String {
    if qi.schema.is_empty() {
        escape_ident(&qi.name)
    } else {
        format!("{}.{}", escape_ident(&qi.schema), escape_ident(&qi.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escape_ident_doubles_quotes() {
        assert_eq!(escape_ident("issues"), "\"issues\"");
        assert_eq!(escape_ident("user\"name"), "\"user\"\"name\"");
        assert_eq!(escape_ident(""), "\"\"");
    }

    #[test]
    fn from_qi_qualifies_only_when_schema_present() {
        let qi = QualifiedIdentifier::new("alt", "user");
        assert_eq!(from_qi(&qi), "\"alt\".\"user\"");

        let qi = QualifiedIdentifier::unqualified("user");
        assert_eq!(from_qi(&qi), "\"user\"");
    }

    #[test]
    fn parse_server_name_splits_on_first_dot_only() {
        let qi = QualifiedIdentifier::parse_server_name("alternate_schema.user");
        assert_eq!(qi.schema, "alternate_schema");
        assert_eq!(qi.name, "user");

        let qi = QualifiedIdentifier::parse_server_name("issues");
        assert_eq!(qi.schema, "");
        assert_eq!(qi.name, "issues");

        let qi = QualifiedIdentifier::parse_server_name("s.t.weird");
        assert_eq!(qi.schema, "s");
        assert_eq!(qi.name, "t.weird");
    }
}
