//! The relationship compiler (spec component 6): drives the top-down
//! recursion over the AST, opening an alias per table scope, composing
//! WHERE from the predicate compiler, joining junction edges for hidden
//! relationships, and wrapping child rows in `json_agg(row_to_json(...))`.

use crate::ast::{Query, Relationship};
use crate::coerce::qualified_ident;
use crate::error::CompileError;
use crate::output_format::OutputFormat;
use crate::select::{build_limit, build_order_by, build_projection, compile_filters};
use ivmsql_schema::{ClientSchema, NameMapper, ServerSchema};
use ivmsql_sql::{escape_ident, from_qi, SqlFragment};
use ivmsql_sql::SqlParam;

/// Per-`compile` call state: the schema views it was invoked with, plus
/// the alias counter that makes every opened table scope unique. Never
/// shared across calls — see the concurrency model in SPEC_FULL.md §5.
pub(crate) struct Ctx<'a> {
    pub client_schema: &'a ClientSchema,
    pub server_schema: &'a ServerSchema,
    pub mapper: &'a NameMapper,
    pub config: &'a crate::config::CompilerConfig,
    pub(crate) alias_counter: u32,
}

impl<'a> Ctx<'a> {
    fn next_alias(&mut self, base: &str) -> String {
        let n = self.alias_counter;
        self.alias_counter += 1;
        format!("{base}_{n}")
    }
}

/// The SQL alias and client table a chunk of the recursion is rooted at.
#[derive(Clone, Debug)]
pub(crate) struct TableScope {
    pub client_table: String,
    pub sql_alias: String,
    pub depth: u32,
}

struct FromWhere {
    from: SqlFragment,
    where_: Option<SqlFragment>,
    /// Scope whose columns are projected: the relationship's own table
    /// for a one-hop relationship, or the destination table for a
    /// two-hop junction (the junction itself is elided from output).
    scope: TableScope,
    /// Default ORDER BY when the logical query names none — the
    /// junction's primary key, for a two-hop relationship.
    default_order: Vec<SqlFragment>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompiledQuery {
    pub text: String,
    pub values: Vec<SqlParam>,
}

/// Compile an AST query against the given schemas into a single
/// parameterized PostgreSQL statement whose sole output column carries
/// the full JSON result.
pub fn compile(
    server_schema: &ServerSchema,
    client_schema: &ClientSchema,
    query: &Query,
    output_format: &OutputFormat,
    config: &crate::config::CompilerConfig,
) -> Result<CompiledQuery, CompileError> {
    let mapper = NameMapper::from_client_schema(client_schema);
    let span = tracing::info_span!("compile", table = %query.table, singular = output_format.singular);
    let _enter = span.enter();

    let mut ctx = Ctx {
        client_schema,
        server_schema,
        mapper: &mapper,
        config,
        alias_counter: 0,
    };

    match compile_inner(&mut ctx, query, output_format) {
        Ok(frag) => {
            let (text, values) = frag.build();
            Ok(CompiledQuery { text, values })
        }
        Err(err) => {
            tracing::warn!(code = err.code(), "{err}");
            Err(err)
        }
    }
}

fn compile_inner(ctx: &mut Ctx, query: &Query, output_format: &OutputFormat) -> Result<SqlFragment, CompileError> {
    let inner = compile_root_select(ctx, query, output_format)?;
    let mut frag = SqlFragment::new();
    frag.push("SELECT ");
    if output_format.singular {
        frag.push("row_to_json(\"root\")::text");
    } else {
        frag.push("COALESCE(json_agg(row_to_json(\"root\")),'[]'::json)::text");
    }
    frag.push(" AS ");
    frag.push(&escape_ident(&ctx.config.root_alias));
    frag.push(" FROM (");
    frag.append(inner);
    frag.push(") \"root\"");
    Ok(frag)
}

fn compile_root_select(ctx: &mut Ctx, query: &Query, output_format: &OutputFormat) -> Result<SqlFragment, CompileError> {
    let alias = ctx.next_alias(&query.table);
    let scope = TableScope {
        client_table: query.table.clone(),
        sql_alias: alias.clone(),
        depth: 0,
    };

    let mut from = SqlFragment::new();
    from.push(&from_qi(ctx.mapper.table_name(&query.table)?));
    from.push(" AS ");
    from.push(&escape_ident(&alias));

    let where_ = compile_filters(ctx, &scope, query)?;
    let select_list = build_projection(ctx, &scope, query, output_format)?;
    let order = build_order_by(ctx, &scope, query, &[])?;
    let limit = build_limit(query, output_format);

    Ok(assemble(select_list, from, where_, order, limit))
}

/// Owned variant of [`relationship_output_key`], for building the
/// column-shadowing set in `select::build_projection`.
pub(crate) fn relationship_output_key_owned(rel: &Relationship) -> String {
    relationship_output_key(rel).to_string()
}

fn relationship_output_key(rel: &Relationship) -> &str {
    if rel.hidden {
        rel.subquery
            .related
            .first()
            .map(|far| far.subquery.alias.as_deref().unwrap_or(far.subquery.table.as_str()))
            .unwrap_or(rel.subquery.table.as_str())
    } else {
        rel.subquery.alias.as_deref().unwrap_or(rel.subquery.table.as_str())
    }
}

pub(crate) fn build_correlation_pred(
    ctx: &Ctx,
    left: &TableScope,
    right: &TableScope,
    correlation: &crate::ast::Correlation,
) -> Result<SqlFragment, CompileError> {
    if correlation.parent_field.is_empty() || correlation.parent_field.len() != correlation.child_field.len() {
        return Err(CompileError::CorrelationArityMismatch {
            parent_len: correlation.parent_field.len(),
            child_len: correlation.child_field.len(),
        });
    }
    let mut parts = Vec::new();
    for (pf, cf) in correlation.parent_field.iter().zip(correlation.child_field.iter()) {
        let left_col = ctx.mapper.column_name(&left.client_table, pf)?;
        let right_col = ctx.mapper.column_name(&right.client_table, cf)?;
        let mut f = qualified_ident(&left.sql_alias, left_col);
        f.push(" = ");
        f.append(qualified_ident(&right.sql_alias, right_col));
        parts.push(f);
    }
    Ok(SqlFragment::join(" AND ", parts))
}

fn compile_from_where(ctx: &mut Ctx, parent: &TableScope, rel: &Relationship) -> Result<FromWhere, CompileError> {
    if rel.hidden {
        if rel.subquery.related.len() != 1 {
            return Err(CompileError::InvalidRelationship {
                name: rel.subquery.table.clone(),
                reason: format!(
                    "a hidden relationship must have exactly one child relationship, found {}",
                    rel.subquery.related.len()
                ),
            });
        }
        let far = &rel.subquery.related[0];

        let junction_table = rel.subquery.table.clone();
        let j_alias = ctx.next_alias(&junction_table);
        let j_scope = TableScope {
            client_table: junction_table.clone(),
            sql_alias: j_alias.clone(),
            depth: parent.depth + 1,
        };

        let dest_table = far.subquery.table.clone();
        let d_alias = ctx.next_alias(&dest_table);
        let d_scope = TableScope {
            client_table: dest_table.clone(),
            sql_alias: d_alias.clone(),
            depth: parent.depth + 2,
        };

        let join_cond = build_correlation_pred(ctx, &j_scope, &d_scope, &far.correlation)?;

        let mut from = SqlFragment::new();
        from.push(&from_qi(ctx.mapper.table_name(&junction_table)?));
        from.push(" AS ");
        from.push(&escape_ident(&j_alias));
        from.push(" JOIN ");
        from.push(&from_qi(ctx.mapper.table_name(&dest_table)?));
        from.push(" AS ");
        from.push(&escape_ident(&d_alias));
        from.push(" ON ");
        from.append(join_cond);

        let corr = build_correlation_pred(ctx, parent, &j_scope, &rel.correlation)?;
        let mut parts = vec![corr];
        if let Some(w) = compile_filters(ctx, &d_scope, &far.subquery)? {
            parts.push(w);
        }
        if let Some(w) = compile_filters(ctx, &j_scope, &rel.subquery)? {
            parts.push(w);
        }
        let where_ = Some(SqlFragment::join(" AND ", parts));

        let default_order = junction_primary_key_order(ctx, &j_scope)?;

        Ok(FromWhere {
            from,
            where_,
            scope: d_scope,
            default_order,
        })
    } else {
        let table = rel.subquery.table.clone();
        let alias = ctx.next_alias(&table);
        let scope = TableScope {
            client_table: table.clone(),
            sql_alias: alias.clone(),
            depth: parent.depth + 1,
        };

        let mut from = SqlFragment::new();
        from.push(&from_qi(ctx.mapper.table_name(&table)?));
        from.push(" AS ");
        from.push(&escape_ident(&alias));

        let corr = build_correlation_pred(ctx, parent, &scope, &rel.correlation)?;
        let mut parts = vec![corr];
        if let Some(w) = compile_filters(ctx, &scope, &rel.subquery)? {
            parts.push(w);
        }
        let where_ = Some(SqlFragment::join(" AND ", parts));

        Ok(FromWhere {
            from,
            where_,
            scope,
            default_order: Vec::new(),
        })
    }
}

fn junction_primary_key_order(ctx: &Ctx, j_scope: &TableScope) -> Result<Vec<SqlFragment>, CompileError> {
    let table = ctx
        .client_schema
        .table(&j_scope.client_table)
        .ok_or_else(|| CompileError::UnknownTable {
            table: j_scope.client_table.clone(),
        })?;
    let mut out = Vec::new();
    for pk in &table.primary_key {
        let server_col = ctx.mapper.column_name(&j_scope.client_table, pk)?;
        let mut f = qualified_ident(&j_scope.sql_alias, server_col);
        f.push(" ASC");
        out.push(f);
    }
    Ok(out)
}

pub(crate) fn compile_relationship_expr(
    ctx: &mut Ctx,
    parent: &TableScope,
    rel: &Relationship,
    parent_output_format: &OutputFormat,
) -> Result<SqlFragment, CompileError> {
    let span = tracing::debug_span!(
        "compile_subquery",
        alias = %parent.sql_alias,
        depth = parent.depth,
        hidden = rel.hidden
    );
    let _enter = span.enter();

    let output_key = relationship_output_key(rel).to_string();
    let rel_format = parent_output_format.child(&output_key);

    let fw = compile_from_where(ctx, parent, rel)?;
    let logical_query: &Query = if rel.hidden {
        &rel.subquery.related[0].subquery
    } else {
        &rel.subquery
    };

    let select_list = build_projection(ctx, &fw.scope, logical_query, &rel_format)?;
    let order = build_order_by(ctx, &fw.scope, logical_query, &fw.default_order)?;
    let limit = build_limit(logical_query, &rel_format);
    let inner_select = assemble(select_list, fw.from, fw.where_, order, limit);

    let inner_alias = format!("inner_{output_key}");
    let mut outer = SqlFragment::new();
    if rel_format.singular {
        outer.push("(SELECT row_to_json(");
        outer.push(&escape_ident(&inner_alias));
        outer.push(") FROM (");
        outer.append(inner_select);
        outer.push(") ");
        outer.push(&escape_ident(&inner_alias));
        outer.push(")");
    } else {
        outer.push("(SELECT COALESCE(json_agg(row_to_json(");
        outer.push(&escape_ident(&inner_alias));
        outer.push(")),'[]'::json) FROM (");
        outer.append(inner_select);
        outer.push(") ");
        outer.push(&escape_ident(&inner_alias));
        outer.push(")");
    }
    outer.push(" AS ");
    outer.push(&escape_ident(&output_key));
    Ok(outer)
}

pub(crate) fn compile_exists(
    ctx: &mut Ctx,
    parent: &TableScope,
    op: crate::ast::ExistsOperator,
    rel: &Relationship,
) -> Result<SqlFragment, CompileError> {
    let fw = compile_from_where(ctx, parent, rel)?;
    let mut inner = SqlFragment::new();
    inner.push("SELECT 1 FROM ");
    inner.append(fw.from);
    if let Some(w) = fw.where_ {
        inner.push(" WHERE ");
        inner.append(w);
    }

    let mut outer = SqlFragment::new();
    match op {
        crate::ast::ExistsOperator::Exists => outer.push("EXISTS ("),
        crate::ast::ExistsOperator::NotExists => outer.push("NOT EXISTS ("),
    };
    outer.append(inner);
    outer.push(")");
    Ok(outer)
}

pub(crate) fn assemble(
    select_list: Vec<SqlFragment>,
    from: SqlFragment,
    where_: Option<SqlFragment>,
    order: Vec<SqlFragment>,
    limit: Option<SqlFragment>,
) -> SqlFragment {
    let mut f = SqlFragment::new();
    f.push("SELECT ");
    f.append(SqlFragment::join(", ", select_list));
    f.push(" FROM ");
    f.append(from);
    if let Some(w) = where_ {
        f.push(" WHERE ");
        f.append(w);
    }
    if !order.is_empty() {
        f.push(" ORDER BY ");
        f.append(SqlFragment::join(", ", order));
    }
    if let Some(l) = limit {
        f.push(" LIMIT ");
        f.append(l);
    }
    f
}
