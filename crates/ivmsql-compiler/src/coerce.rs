//! The literal/column type coercer (spec component 3): decides, for a
//! given server column family, how a column reference and its
//! counterpart literal must be cast and collated so PostgreSQL's
//! comparison semantics agree with the in-memory engine's.

use crate::error::CompileError;
use ivmsql_schema::ServerColumn;
use ivmsql_sql::{escape_ident, SqlFragment, SqlParam};
use serde_json::Value as JsonValue;

/// The families the coercer dispatches on. `Uuid` and `Enum` share the
/// same SQL treatment but are kept distinct so the predicate compiler
/// can additionally validate enum membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeClass {
    Text,
    Uuid,
    Enum,
    Numeric,
    Boolean,
    TimestampTz,
    Timestamp,
    Json,
}

pub fn classify(col: &ServerColumn) -> TypeClass {
    if col.is_enum {
        return TypeClass::Enum;
    }
    match col.pg_type.as_str() {
        "uuid" => TypeClass::Uuid,
        "text" | "varchar" | "character varying" | "character" | "bpchar" | "citext" | "char" => {
            TypeClass::Text
        }
        "int2" | "smallint" | "int4" | "integer" | "int8" | "bigint" | "numeric" | "decimal"
        | "float4" | "real" | "float8" | "double precision" | "smallserial" | "serial"
        | "bigserial" => TypeClass::Numeric,
        "bool" | "boolean" => TypeClass::Boolean,
        "timestamptz" | "timestamp with time zone" => TypeClass::TimestampTz,
        "timestamp" | "timestamp without time zone" => TypeClass::Timestamp,
        "json" | "jsonb" => TypeClass::Json,
        _ => TypeClass::Text,
    }
}

/// The type a bare literal (with no column counterpart) takes on, from
/// its JS-style shape. `null` has no type of its own; the caller falls
/// back to the other side, or text as a last resort.
pub fn infer_literal_type_class(value: &JsonValue) -> Option<TypeClass> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(_) => Some(TypeClass::Boolean),
        JsonValue::Number(_) => Some(TypeClass::Numeric),
        JsonValue::String(_) => Some(TypeClass::Text),
        JsonValue::Array(_) | JsonValue::Object(_) => Some(TypeClass::Json),
    }
}

/// Render an already-resolved column identifier (`alias.col`) for the
/// given comparison type class: no-op for most families, `::text` for
/// uuid/enum, `COLLATE` for text-family.
pub fn emit_column_side(type_class: TypeClass, mut ident: SqlFragment, collation: &str) -> SqlFragment {
    match type_class {
        TypeClass::Text => {
            ident.push(" COLLATE \"");
            ident.push(collation);
            ident.push_char('"');
            ident
        }
        TypeClass::Uuid | TypeClass::Enum => {
            ident.push("::text");
            ident
        }
        TypeClass::Numeric | TypeClass::Boolean | TypeClass::TimestampTz | TypeClass::Timestamp | TypeClass::Json => {
            ident
        }
    }
}

/// Render the literal side of a comparison: placeholder plus whatever
/// cast/collation the family requires. The bound parameter is `Null`
/// whenever `value` is JSON null, independent of which cast text is
/// written around the placeholder (casting NULL is always valid SQL).
pub fn emit_literal_side(
    type_class: TypeClass,
    value: &JsonValue,
    collation: &str,
    label: &str,
) -> Result<SqlFragment, CompileError> {
    let mut frag = SqlFragment::new();
    match type_class {
        TypeClass::Text => {
            frag.push_param(text_param(value, label)?);
            frag.push(" COLLATE \"");
            frag.push(collation);
            frag.push_char('"');
        }
        TypeClass::Uuid | TypeClass::Enum => {
            frag.push_param(text_param(value, label)?);
            frag.push("::text COLLATE \"");
            frag.push(collation);
            frag.push_char('"');
        }
        TypeClass::Numeric => {
            frag.push_param(number_param(value, label)?);
            frag.push("::text::double precision");
        }
        TypeClass::Boolean => {
            frag.push_param(bool_param(value, label)?);
        }
        TypeClass::TimestampTz => {
            frag.push("to_timestamp(");
            frag.push_param(number_param(value, label)?);
            frag.push("::text::bigint / 1000.0)");
        }
        TypeClass::Timestamp => {
            frag.push("to_timestamp(");
            frag.push_param(number_param(value, label)?);
            frag.push("::text::bigint / 1000.0) AT TIME ZONE 'UTC'");
        }
        TypeClass::Json => {
            frag.push_param(json_param(value, label)?);
            frag.push("::text::jsonb");
        }
    }
    Ok(frag)
}

/// The left-hand side of `IN`/`NOT IN`: every unfolded array element is
/// text (via `jsonb_array_elements_text`), so the comparable column must
/// itself be rendered as text regardless of its native family. The
/// array side already carries an explicit `COLLATE`, which is enough to
/// fix the comparison's collation (the same asymmetry as uuid/enum
/// predicates), so a text column needs no cast or COLLATE of its own —
/// only non-text families need the `::text` cast to make the types agree.
pub fn emit_column_for_in(type_class: TypeClass, mut ident: SqlFragment) -> SqlFragment {
    match type_class {
        TypeClass::Text => ident,
        _ => {
            ident.push("::text");
            ident
        }
    }
}

/// The jsonb-unfolding array on the right of `IN`/`NOT IN`.
pub fn emit_in_array(value: &JsonValue, collation: &str, label: &str) -> Result<SqlFragment, CompileError> {
    let elements = value.as_array().ok_or_else(|| CompileError::InvalidLiteral {
        column: label.to_string(),
        reason: "IN/NOT IN right-hand side must be a literal array".to_string(),
    })?;
    let encoded = serde_json::to_string(elements).map_err(|e| CompileError::InvalidLiteral {
        column: label.to_string(),
        reason: format!("failed to JSON-encode IN list: {e}"),
    })?;
    let mut frag = SqlFragment::new();
    frag.push("ARRAY(SELECT value::text COLLATE \"");
    frag.push(collation);
    frag.push("\" FROM jsonb_array_elements_text(");
    frag.push_param(SqlParam::Text(encoded));
    frag.push("::text::jsonb))");
    Ok(frag)
}

pub fn qualified_ident(sql_alias: &str, server_column: &str) -> SqlFragment {
    let mut f = SqlFragment::new();
    f.push(&escape_ident(sql_alias));
    f.push(".");
    f.push(&escape_ident(server_column));
    f
}

fn text_param(value: &JsonValue, label: &str) -> Result<SqlParam, CompileError> {
    match value {
        JsonValue::Null => Ok(SqlParam::Null),
        JsonValue::String(s) => Ok(SqlParam::Text(s.clone())),
        JsonValue::Number(n) => Ok(SqlParam::Text(n.to_string())),
        JsonValue::Bool(b) => Ok(SqlParam::Text(b.to_string())),
        other => Err(CompileError::InvalidLiteral {
            column: label.to_string(),
            reason: format!("cannot bind {other} as text"),
        }),
    }
}

fn number_param(value: &JsonValue, label: &str) -> Result<SqlParam, CompileError> {
    match value {
        JsonValue::Null => Ok(SqlParam::Null),
        JsonValue::Number(n) => Ok(SqlParam::Text(n.to_string())),
        other => Err(CompileError::InvalidLiteral {
            column: label.to_string(),
            reason: format!("cannot bind {other} as a number"),
        }),
    }
}

fn bool_param(value: &JsonValue, label: &str) -> Result<SqlParam, CompileError> {
    match value {
        JsonValue::Null => Ok(SqlParam::Null),
        JsonValue::Bool(b) => Ok(SqlParam::Bool(*b)),
        other => Err(CompileError::InvalidLiteral {
            column: label.to_string(),
            reason: format!("cannot bind {other} as a boolean"),
        }),
    }
}

fn json_param(value: &JsonValue, label: &str) -> Result<SqlParam, CompileError> {
    if value.is_null() {
        return Ok(SqlParam::Null);
    }
    serde_json::to_string(value)
        .map(SqlParam::Text)
        .map_err(|e| CompileError::InvalidLiteral {
            column: label.to_string(),
            reason: format!("failed to JSON-encode literal: {e}"),
        })
}
