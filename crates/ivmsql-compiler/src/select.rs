//! Projection, ordering, limit and cursor handling (spec component 5),
//! plus the WHERE-clause assembly shared by the root query and every
//! relationship subquery.

use crate::ast::{Condition, OrderDirection, Query, SimpleOperator, ValuePosition};
use crate::coerce::{classify, qualified_ident, TypeClass};
use crate::engine::{compile_relationship_expr, Ctx, TableScope};
use crate::error::CompileError;
use crate::output_format::OutputFormat;
use crate::predicate::compile_condition;
use ivmsql_sql::{escape_ident, SqlFragment};
use serde_json::Value as JsonValue;

fn is_top_level_empty_and(cond: &Condition) -> bool {
    matches!(cond, Condition::And { conditions } if conditions.is_empty())
}

fn compile_own_where(ctx: &mut Ctx, scope: &TableScope, query: &Query) -> Result<Option<SqlFragment>, CompileError> {
    match &query.r#where {
        None => Ok(None),
        Some(cond) if is_top_level_empty_and(cond) => Ok(None),
        Some(cond) => {
            let frag = compile_condition(ctx, scope, cond)?;
            if frag.is_empty() {
                Ok(None)
            } else {
                Ok(Some(frag))
            }
        }
    }
}

/// A table's own WHERE: its user-supplied condition plus its cursor
/// predicate, ANDed together. Does not include correlation — the
/// caller ANDs that in separately (see `engine::compile_from_where`).
pub(crate) fn compile_filters(ctx: &mut Ctx, scope: &TableScope, query: &Query) -> Result<Option<SqlFragment>, CompileError> {
    let mut parts = Vec::new();
    if let Some(w) = compile_own_where(ctx, scope, query)? {
        parts.push(w);
    }
    if let Some(c) = build_start_predicate(ctx, scope, query)? {
        parts.push(c);
    }
    if parts.is_empty() {
        Ok(None)
    } else {
        Ok(Some(SqlFragment::join(" AND ", parts)))
    }
}

pub(crate) fn build_projection(
    ctx: &mut Ctx,
    scope: &TableScope,
    query: &Query,
    output_format: &OutputFormat,
) -> Result<Vec<SqlFragment>, CompileError> {
    let table = ctx
        .client_schema
        .table(&scope.client_table)
        .ok_or_else(|| CompileError::UnknownTable {
            table: scope.client_table.clone(),
        })?
        .clone();

    let shadowed: std::collections::HashSet<String> = query
        .related
        .iter()
        .map(crate::engine::relationship_output_key_owned)
        .collect();

    let mut list = Vec::with_capacity(table.columns.len() + query.related.len());
    for col in table.columns.values() {
        if shadowed.contains(&col.name) {
            continue;
        }
        let server_col = ctx.mapper.column_name(&scope.client_table, &col.name)?.to_string();
        let desc = ctx.server_schema.column(&table.server_name, &server_col).cloned();
        let type_class = desc.as_ref().map(classify).unwrap_or(TypeClass::Text);
        let is_array = desc.as_ref().map(|d| d.is_array).unwrap_or(false);

        let ident = qualified_ident(&scope.sql_alias, &server_col);
        let mut expr = match (type_class, is_array) {
            (TypeClass::TimestampTz, false) | (TypeClass::Timestamp, false) => {
                let mut f = SqlFragment::new();
                f.push("EXTRACT(EPOCH FROM ");
                f.append(ident);
                f.push(") * 1000");
                f
            }
            (TypeClass::TimestampTz, true) | (TypeClass::Timestamp, true) => {
                let mut f = SqlFragment::new();
                f.push("ARRAY(SELECT EXTRACT(EPOCH FROM x) * 1000 FROM unnest(");
                f.append(ident);
                f.push(") x)");
                f
            }
            _ => ident,
        };
        expr.push(" AS ");
        expr.push(&escape_ident(&col.name));
        list.push(expr);
    }

    for rel in &query.related {
        list.push(compile_relationship_expr(ctx, scope, rel, output_format)?);
    }

    Ok(list)
}

pub(crate) fn build_order_by(
    ctx: &mut Ctx,
    scope: &TableScope,
    query: &Query,
    default_order: &[SqlFragment],
) -> Result<Vec<SqlFragment>, CompileError> {
    if query.order_by.is_empty() {
        return Ok(default_order.to_vec());
    }
    let table = ctx
        .client_schema
        .table(&scope.client_table)
        .ok_or_else(|| CompileError::UnknownTable {
            table: scope.client_table.clone(),
        })?
        .clone();

    let mut out = Vec::with_capacity(query.order_by.len());
    for term in &query.order_by {
        let server_col = ctx.mapper.column_name(&scope.client_table, &term.column)?.to_string();
        let desc = ctx.server_schema.column(&table.server_name, &server_col);
        let type_class = desc.map(classify).unwrap_or(TypeClass::Text);

        let mut f = qualified_ident(&scope.sql_alias, &server_col);
        match type_class {
            TypeClass::Text => {
                f.push(" COLLATE \"");
                f.push(&ctx.config.collation);
                f.push_char('"');
            }
            TypeClass::Uuid | TypeClass::Enum => {
                f.push("::text COLLATE \"");
                f.push(&ctx.config.collation);
                f.push_char('"');
            }
            _ => {}
        }
        f.push(match term.direction {
            OrderDirection::Asc => " ASC",
            OrderDirection::Desc => " DESC",
        });
        out.push(f);
    }
    Ok(out)
}

pub(crate) fn build_limit(query: &Query, output_format: &OutputFormat) -> Option<SqlFragment> {
    if output_format.singular {
        return Some(SqlFragment::raw("1"));
    }
    match query.limit {
        Some(n) if n > 0 => {
            let mut f = SqlFragment::new();
            f.push_param(ivmsql_sql::SqlParam::Text(n.to_string()));
            f.push("::text::double precision");
            Some(f)
        }
        _ => None,
    }
}

/// The cursor predicate (spec §4.5): a disjunction of lexicographic
/// groups over the ordering columns, with an equality group appended
/// when the cursor is inclusive.
fn build_start_predicate(ctx: &mut Ctx, scope: &TableScope, query: &Query) -> Result<Option<SqlFragment>, CompileError> {
    let Some(start) = &query.start else {
        return Ok(None);
    };
    if query.order_by.is_empty() {
        return Ok(None);
    }

    let mut groups = Vec::new();
    for i in 0..query.order_by.len() {
        let mut eqs = Vec::new();
        let mut skip = false;
        for term in &query.order_by[..i] {
            let Some(value) = start.row.get(&term.column) else {
                skip = true;
                break;
            };
            eqs.push(compile_value_eq(ctx, scope, &term.column, value)?);
        }
        if skip {
            continue;
        }
        let term = &query.order_by[i];
        let Some(value) = start.row.get(&term.column) else {
            continue;
        };
        let op = match term.direction {
            OrderDirection::Asc => SimpleOperator::Gt,
            OrderDirection::Desc => SimpleOperator::Lt,
        };
        eqs.push(compile_value_cmp(ctx, scope, &term.column, op, value)?);
        groups.push(SqlFragment::join(" AND ", eqs).parens());
    }

    if !start.exclusive {
        let mut eqs = Vec::new();
        for term in &query.order_by {
            if let Some(value) = start.row.get(&term.column) {
                eqs.push(compile_value_eq(ctx, scope, &term.column, value)?);
            }
        }
        if !eqs.is_empty() {
            groups.push(SqlFragment::join(" AND ", eqs).parens());
        }
    }

    if groups.is_empty() {
        Ok(None)
    } else {
        Ok(Some(SqlFragment::join(" OR ", groups).parens()))
    }
}

fn compile_value_eq(ctx: &mut Ctx, scope: &TableScope, column: &str, value: &JsonValue) -> Result<SqlFragment, CompileError> {
    compile_value_cmp(ctx, scope, column, SimpleOperator::Eq, value)
}

fn compile_value_cmp(
    ctx: &mut Ctx,
    scope: &TableScope,
    column: &str,
    op: SimpleOperator,
    value: &JsonValue,
) -> Result<SqlFragment, CompileError> {
    let cond = Condition::Simple {
        op,
        left: ValuePosition::Column { name: column.to_string() },
        right: ValuePosition::Literal { value: value.clone() },
    };
    compile_condition(ctx, scope, &cond)
}
