//! The predicate compiler (spec component 4): dispatches on condition
//! tag, coercing each `simple` comparison's operands through the type
//! coercer and recursing into the relationship compiler for
//! `correlatedSubquery`.

use crate::ast::{Condition, ExistsOperator, SimpleOperator, ValuePosition};
use crate::coerce::{
    classify, emit_column_for_in, emit_column_side, emit_in_array, emit_literal_side, infer_literal_type_class,
    qualified_ident, TypeClass,
};
use crate::engine::{compile_exists, Ctx, TableScope};
use crate::error::CompileError;
use ivmsql_sql::SqlFragment;
use serde_json::Value as JsonValue;

enum Resolved {
    Column {
        ident: SqlFragment,
        type_class: TypeClass,
        enum_values: Vec<String>,
    },
    Literal(JsonValue),
}

fn resolve(ctx: &Ctx, scope: &TableScope, pos: &ValuePosition) -> Result<Resolved, CompileError> {
    match pos {
        ValuePosition::Column { name } => {
            let server_col = ctx.mapper.column_name(&scope.client_table, name)?;
            let table = ctx
                .client_schema
                .table(&scope.client_table)
                .ok_or_else(|| CompileError::UnknownTable {
                    table: scope.client_table.clone(),
                })?;
            let desc = ctx.server_schema.column(&table.server_name, server_col);
            let type_class = desc.map(classify).unwrap_or(TypeClass::Text);
            let enum_values = desc.map(|d| d.enum_values.clone()).unwrap_or_default();
            Ok(Resolved::Column {
                ident: qualified_ident(&scope.sql_alias, server_col),
                type_class,
                enum_values,
            })
        }
        ValuePosition::Literal { value } => Ok(Resolved::Literal(value.clone())),
        ValuePosition::Static { anchor, field } => Err(CompileError::StaticParameterNotBound {
            anchor: anchor.clone(),
            field: field.clone(),
        }),
    }
}

fn comparison_type_class(left: &Resolved, right: &Resolved) -> TypeClass {
    match (left, right) {
        (Resolved::Column { type_class, .. }, _) => *type_class,
        (_, Resolved::Column { type_class, .. }) => *type_class,
        (Resolved::Literal(l), Resolved::Literal(r)) => infer_literal_type_class(l)
            .or_else(|| infer_literal_type_class(r))
            .unwrap_or(TypeClass::Text),
    }
}

/// Emits a `tracing::trace!` for comparisons that are structurally legal
/// but surprising in practice: an array/object literal measured against
/// a scalar column, or a numeric literal measured against a text column.
fn log_surprising_coercion(left: &Resolved, right: &Resolved, label: &str) {
    for (col, lit) in [(left, right), (right, left)] {
        let (Resolved::Column { type_class: col_class, .. }, Resolved::Literal(value)) = (col, lit) else {
            continue;
        };
        let Some(lit_class) = infer_literal_type_class(value) else {
            continue;
        };
        if lit_class == TypeClass::Json && *col_class != TypeClass::Json {
            tracing::trace!(column = %label, column_type = ?col_class, "array/object literal compared against a scalar column");
        } else if lit_class == TypeClass::Numeric && *col_class == TypeClass::Text {
            tracing::trace!(column = %label, "numeric literal compared against a text column");
        }
    }
}

fn enum_values_of(left: &Resolved, right: &Resolved) -> Option<&[String]> {
    match (left, right) {
        (Resolved::Column { enum_values, .. }, _) if !enum_values.is_empty() => Some(enum_values),
        (_, Resolved::Column { enum_values, .. }) if !enum_values.is_empty() => Some(enum_values),
        _ => None,
    }
}

fn validate_enum_membership(left: &Resolved, right: &Resolved, type_class: TypeClass) -> Result<(), CompileError> {
    if type_class != TypeClass::Enum {
        return Ok(());
    }
    let Some(values) = enum_values_of(left, right) else {
        return Ok(());
    };
    for side in [left, right] {
        if let Resolved::Literal(v) = side {
            if let Some(s) = v.as_str() {
                if !values.iter().any(|x| x == s) {
                    return Err(CompileError::MismatchedEnumValue {
                        value: s.to_string(),
                        pg_type: "enum".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn emit_side(resolved: Resolved, type_class: TypeClass, collation: &str, label: &str) -> Result<SqlFragment, CompileError> {
    match resolved {
        Resolved::Column { ident, .. } => Ok(emit_column_side(type_class, ident, collation)),
        Resolved::Literal(value) => emit_literal_side(type_class, &value, collation, label),
    }
}

fn emit_side_for_in(resolved: Resolved, type_class: TypeClass, collation: &str, label: &str) -> Result<SqlFragment, CompileError> {
    match resolved {
        Resolved::Column { ident, .. } => Ok(emit_column_for_in(type_class, ident)),
        Resolved::Literal(value) => {
            // A literal-on-the-left IN is unusual but representable: bind
            // it as text to compare against the unfolded text elements.
            let mut f = emit_literal_side(TypeClass::Text, &value, collation, label)?;
            f.push("::text");
            Ok(f)
        }
    }
}

fn combine(mut left: SqlFragment, op: &str, right: SqlFragment) -> SqlFragment {
    left.push(op);
    left.append(right);
    left
}

pub(crate) fn compile_condition(ctx: &mut Ctx, scope: &TableScope, cond: &Condition) -> Result<SqlFragment, CompileError> {
    match cond {
        Condition::And { conditions } => {
            if conditions.is_empty() {
                return Ok(SqlFragment::raw("TRUE"));
            }
            let parts = conditions
                .iter()
                .map(|c| compile_condition(ctx, scope, c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SqlFragment::join(" AND ", parts).parens())
        }
        Condition::Or { conditions } => {
            if conditions.is_empty() {
                return Ok(SqlFragment::raw("FALSE"));
            }
            let parts = conditions
                .iter()
                .map(|c| compile_condition(ctx, scope, c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SqlFragment::join(" OR ", parts).parens())
        }
        Condition::Simple { op, left, right } => compile_simple(ctx, scope, *op, left, right),
        Condition::CorrelatedSubquery { op, related } => {
            let exists_op = *op;
            compile_exists(ctx, scope, exists_op, related)
        }
    }
}

fn column_label(pos: &ValuePosition) -> String {
    match pos {
        ValuePosition::Column { name } => name.clone(),
        ValuePosition::Literal { .. } => "<literal>".to_string(),
        ValuePosition::Static { anchor, field } => format!("{anchor}.{field}"),
    }
}

fn compile_simple(
    ctx: &mut Ctx,
    scope: &TableScope,
    op: SimpleOperator,
    left_pos: &ValuePosition,
    right_pos: &ValuePosition,
) -> Result<SqlFragment, CompileError> {
    let label = column_label(left_pos);
    let collation = ctx.config.collation.clone();

    if matches!(op, SimpleOperator::In | SimpleOperator::NotIn) {
        let left = resolve(ctx, scope, left_pos)?;
        let type_class = match &left {
            Resolved::Column { type_class, .. } => *type_class,
            Resolved::Literal(v) => infer_literal_type_class(v).unwrap_or(TypeClass::Text),
        };
        let right_value = match right_pos {
            ValuePosition::Literal { value } => value,
            ValuePosition::Static { anchor, field } => {
                return Err(CompileError::StaticParameterNotBound {
                    anchor: anchor.clone(),
                    field: field.clone(),
                })
            }
            ValuePosition::Column { .. } => {
                return Err(CompileError::InvalidLiteral {
                    column: label,
                    reason: "IN/NOT IN right-hand side must be a literal array".to_string(),
                })
            }
        };
        let left_frag = emit_side_for_in(left, type_class, &collation, &label)?;
        let array_frag = emit_in_array(right_value, &collation, &label)?;
        let mut in_expr = combine(left_frag, " = ANY(", array_frag);
        in_expr.push(")");
        return Ok(if op == SimpleOperator::NotIn {
            let mut f = SqlFragment::new();
            f.push("NOT (");
            f.append(in_expr);
            f.push(")");
            f
        } else {
            in_expr
        });
    }

    let left = resolve(ctx, scope, left_pos)?;
    let right = resolve(ctx, scope, right_pos)?;
    log_surprising_coercion(&left, &right, &label);
    let mut type_class = comparison_type_class(&left, &right);
    if matches!(
        op,
        SimpleOperator::Like | SimpleOperator::NotLike | SimpleOperator::ILike | SimpleOperator::NotILike
    ) {
        type_class = TypeClass::Text;
    }
    validate_enum_membership(&left, &right, type_class)?;

    let left_frag = emit_side(left, type_class, &collation, &label)?;
    let right_frag = emit_side(right, type_class, &collation, &label)?;

    let op_word = match op {
        SimpleOperator::Eq => " = ",
        SimpleOperator::Neq => " != ",
        SimpleOperator::Lt => " < ",
        SimpleOperator::Lte => " <= ",
        SimpleOperator::Gt => " > ",
        SimpleOperator::Gte => " >= ",
        SimpleOperator::Like => " LIKE ",
        SimpleOperator::NotLike => " NOT LIKE ",
        SimpleOperator::ILike => " ILIKE ",
        SimpleOperator::NotILike => " NOT ILIKE ",
        SimpleOperator::Is => " IS NOT DISTINCT FROM ",
        SimpleOperator::IsNot => " IS DISTINCT FROM ",
        SimpleOperator::In | SimpleOperator::NotIn => unreachable!("handled above"),
    };

    Ok(combine(left_frag, op_word, right_frag))
}
