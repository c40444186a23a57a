//! Black-box scenarios against `ivmsql_compiler::compile`, matching the
//! concrete worked examples in the specification: a simple equality
//! filter, a junction relationship, `IS`/`IN` coercion, and an ordering
//! cursor. No database connection — these assert the emitted SQL text
//! and bound parameters only.

use indexmap::IndexMap;
use ivmsql_compiler::{
    compile, Condition, Correlation, ExistsOperator, OrderDirection, OrderTerm, OutputFormat, Query, Relationship,
    SimpleOperator, Start, ValuePosition,
};
use ivmsql_schema::{ClientColumn, ClientSchema, ClientTable, ServerColumn, ServerSchema};
use pretty_assertions::assert_eq;
use serde_json::json;

fn client_table(name: &str, server_name: &str, columns: &[(&str, &str)], primary_key: &[&str]) -> ClientTable {
    let mut cols = IndexMap::new();
    for (client, server) in columns {
        cols.insert((*client).to_string(), ClientColumn::new(*client, *server));
    }
    ClientTable {
        name: name.to_string(),
        server_name: server_name.to_string(),
        columns: cols,
        primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
        relationships: IndexMap::new(),
    }
}

fn server_table(columns: &[(&str, &str)]) -> IndexMap<String, ServerColumn> {
    columns
        .iter()
        .map(|(name, pg_type)| (name.to_string(), ServerColumn::new(*pg_type)))
        .collect()
}

fn bare_query(table: &str) -> Query {
    Query {
        table: table.to_string(),
        alias: None,
        r#where: None,
        order_by: Vec::new(),
        limit: None,
        start: None,
        related: Vec::new(),
        system: None,
    }
}

/// Scenario A: a simple equality filter on the root table.
#[test]
fn scenario_a_simple_equality_returns_parameterized_filter() {
    let mut client_tables = IndexMap::new();
    client_tables.insert(
        "issue".to_string(),
        client_table("issue", "issue", &[("id", "id"), ("title", "title")], &["id"]),
    );
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("issue".to_string(), server_table(&[("id", "text"), ("title", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("issue");
    query.r#where = Some(Condition::Simple {
        op: SimpleOperator::Eq,
        left: ValuePosition::Column { name: "id".into() },
        right: ValuePosition::Literal { value: json!("i1") },
    });

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    assert!(compiled.text.starts_with(
        "SELECT COALESCE(json_agg(row_to_json(\"root\")),'[]'::json)::text AS \"zql_result\" FROM (SELECT "
    ));
    assert!(compiled
        .text
        .contains("\"issue_0\".\"id\" COLLATE \"ucs_basic\" = $1 COLLATE \"ucs_basic\""));
    assert!(compiled.text.contains("FROM \"issue\" AS \"issue_0\""));
    assert_eq!(compiled.values, vec![ivmsql_sql::SqlParam::Text("i1".into())]);
}

/// Scenario C: a junction relationship (`playlist.related('tracks')`)
/// joins flat, correlates by the junction's own fields, orders by the
/// junction's primary key by default, and projects only destination
/// columns.
#[test]
fn scenario_c_junction_relationship_joins_flat_and_orders_by_junction_key() {
    let mut client_tables = IndexMap::new();
    client_tables.insert(
        "playlist".to_string(),
        client_table("playlist", "playlist", &[("id", "playlist_id"), ("name", "name")], &["id"]),
    );
    client_tables.insert(
        "playlist_track".to_string(),
        client_table(
            "playlist_track",
            "playlist_track",
            &[("playlistId", "playlist_id"), ("trackId", "track_id")],
            &["playlistId", "trackId"],
        ),
    );
    client_tables.insert(
        "track".to_string(),
        client_table("track", "track", &[("id", "track_id"), ("name", "name")], &["id"]),
    );
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert(
        "playlist".to_string(),
        server_table(&[("playlist_id", "text"), ("name", "text")]),
    );
    server_tables.insert(
        "playlist_track".to_string(),
        server_table(&[("playlist_id", "text"), ("track_id", "text")]),
    );
    server_tables.insert("track".to_string(), server_table(&[("track_id", "text"), ("name", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut destination = bare_query("track");
    destination.limit = Some(10);

    let far = Relationship {
        correlation: Correlation {
            parent_field: vec!["trackId".into()],
            child_field: vec!["id".into()],
        },
        subquery: destination,
        hidden: false,
    };

    let mut junction = bare_query("playlist_track");
    junction.related = vec![far];

    let hidden = Relationship {
        correlation: Correlation {
            parent_field: vec!["id".into()],
            child_field: vec!["playlistId".into()],
        },
        subquery: junction,
        hidden: true,
    };

    let mut query = bare_query("playlist");
    query.related = vec![hidden];

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    let expected = "SELECT COALESCE(json_agg(row_to_json(\"root\")),'[]'::json)::text AS \"zql_result\" FROM (\
SELECT \"playlist_0\".\"playlist_id\" AS \"id\", \"playlist_0\".\"name\" AS \"name\", \
(SELECT COALESCE(json_agg(row_to_json(\"inner_track\")),'[]'::json) FROM (\
SELECT \"track_2\".\"track_id\" AS \"id\", \"track_2\".\"name\" AS \"name\" \
FROM \"playlist_track\" AS \"playlist_track_1\" JOIN \"track\" AS \"track_2\" \
ON \"playlist_track_1\".\"track_id\" = \"track_2\".\"track_id\" \
WHERE \"playlist_0\".\"playlist_id\" = \"playlist_track_1\".\"playlist_id\" \
ORDER BY \"playlist_track_1\".\"playlist_id\" ASC, \"playlist_track_1\".\"track_id\" ASC \
LIMIT $1::text::double precision) \"inner_track\") AS \"track\" \
FROM \"playlist\" AS \"playlist_0\") \"root\"";

    assert_eq!(compiled.text, expected);
    assert_eq!(compiled.values, vec![ivmsql_sql::SqlParam::Text("10".into())]);
}

/// Scenario D: `IS` against a null literal compiles to `IS NOT DISTINCT
/// FROM` so NULL participates in equality rather than propagating it.
#[test]
fn scenario_d_is_against_null_uses_not_distinct_from() {
    let mut client_tables = IndexMap::new();
    client_tables.insert(
        "t".to_string(),
        client_table("t", "t", &[("name", "name")], &["name"]),
    );
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("name", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("t");
    query.r#where = Some(Condition::Simple {
        op: SimpleOperator::Is,
        left: ValuePosition::Column { name: "name".into() },
        right: ValuePosition::Literal { value: serde_json::Value::Null },
    });

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    assert!(compiled
        .text
        .contains("\"t_0\".\"name\" COLLATE \"ucs_basic\" IS NOT DISTINCT FROM $1 COLLATE \"ucs_basic\""));
    assert_eq!(compiled.values, vec![ivmsql_sql::SqlParam::Null]);
}

/// Scenario E: `IN` against an integer literal list unfolds through
/// `jsonb_array_elements_text` regardless of the column's own family.
#[test]
fn scenario_e_in_list_unfolds_via_any_array() {
    let mut client_tables = IndexMap::new();
    client_tables.insert("t".to_string(), client_table("t", "t", &[("id", "id")], &["id"]));
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("id", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("t");
    query.r#where = Some(Condition::Simple {
        op: SimpleOperator::In,
        left: ValuePosition::Column { name: "id".into() },
        right: ValuePosition::Literal { value: json!([1, 2, 3]) },
    });

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    assert!(compiled.text.contains(
        "\"t_0\".\"id\" = ANY(ARRAY(SELECT value::text COLLATE \"ucs_basic\" FROM jsonb_array_elements_text($1::text::jsonb)))"
    ));
    assert_eq!(compiled.values, vec![ivmsql_sql::SqlParam::Text("[1,2,3]".into())]);
}

/// An `EXISTS` correlated subquery reuses the same FROM/WHERE assembly
/// as a projected relationship, but emits `SELECT 1` instead of a row
/// aggregation.
#[test]
fn exists_condition_emits_select_1_subquery() {
    let mut client_tables = IndexMap::new();
    client_tables.insert(
        "issue".to_string(),
        client_table("issue", "issue", &[("id", "id")], &["id"]),
    );
    client_tables.insert(
        "comment".to_string(),
        client_table("comment", "comment", &[("issueId", "issue_id")], &["issueId"]),
    );
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("issue".to_string(), server_table(&[("id", "text")]));
    server_tables.insert("comment".to_string(), server_table(&[("issue_id", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("issue");
    query.r#where = Some(Condition::CorrelatedSubquery {
        op: ExistsOperator::Exists,
        related: Box::new(Relationship {
            correlation: Correlation {
                parent_field: vec!["id".into()],
                child_field: vec!["issueId".into()],
            },
            subquery: bare_query("comment"),
            hidden: false,
        }),
    });

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    assert!(compiled
        .text
        .contains("WHERE EXISTS (SELECT 1 FROM \"comment\" AS \"comment_1\" WHERE \"issue_0\".\"id\" = \"comment_1\".\"issue_id\")"));
}

/// A cursor with one ordering column compiles to a single `>` group; an
/// inclusive cursor (the default) also ORs in the equality group.
#[test]
fn cursor_with_inclusive_start_ors_in_the_equality_group() {
    let mut client_tables = IndexMap::new();
    client_tables.insert("t".to_string(), client_table("t", "t", &[("id", "id")], &["id"]));
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("id", "int8")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut row = IndexMap::new();
    row.insert("id".to_string(), json!(5));

    let mut query = bare_query("t");
    query.order_by = vec![OrderTerm {
        column: "id".into(),
        direction: OrderDirection::Asc,
    }];
    query.start = Some(Start { row, exclusive: false });

    let compiled = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap();

    assert!(compiled.text.contains(
        "WHERE ((\"t_0\".\"id\" > $1::text::double precision) OR (\"t_0\".\"id\" = $2::text::double precision))"
    ));
    assert_eq!(
        compiled.values,
        vec![
            ivmsql_sql::SqlParam::Text("5".into()),
            ivmsql_sql::SqlParam::Text("5".into()),
        ]
    );
}

/// A singular output format forces `LIMIT 1` and a `row_to_json` (not
/// `json_agg`) wrapper at the root.
#[test]
fn singular_output_format_wraps_root_in_row_to_json() {
    let mut client_tables = IndexMap::new();
    client_tables.insert("t".to_string(), client_table("t", "t", &[("id", "id")], &["id"]));
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("id", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let query = bare_query("t");
    let format = OutputFormat {
        singular: true,
        relationships: Default::default(),
    };

    let compiled = compile(&server_schema, &client_schema, &query, &format, &Default::default()).unwrap();

    assert!(compiled.text.starts_with("SELECT row_to_json(\"root\")::text AS \"zql_result\""));
    assert!(compiled.text.ends_with("LIMIT 1) \"root\""));
}

/// An unknown column reference is a fatal `UnknownColumn` error, not a
/// best-effort emission.
#[test]
fn unknown_column_reference_is_a_fatal_error() {
    let mut client_tables = IndexMap::new();
    client_tables.insert("t".to_string(), client_table("t", "t", &[("id", "id")], &["id"]));
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("id", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("t");
    query.r#where = Some(Condition::Simple {
        op: SimpleOperator::Eq,
        left: ValuePosition::Column { name: "nope".into() },
        right: ValuePosition::Literal { value: json!(1) },
    });

    let err = compile(
        &server_schema,
        &client_schema,
        &query,
        &OutputFormat::default(),
        &Default::default(),
    )
    .unwrap_err();

    assert_eq!(err.code(), "IVMC105");
}

/// `compile`'s spans and the predicate compiler's `trace!` coercion
/// notices actually fire; this crate depends on `tracing` only, so
/// capture is wired up here with a scoped subscriber rather than a
/// global one, matching the manual span-capture approach the spec
/// calls for instead of pulling in a runtime `tracing-subscriber`
/// dependency.
#[test]
fn compile_span_and_surprising_coercion_trace_fire() {
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturingWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturingWriter {
        type Writer = Self;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    let captured = CapturingWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(captured.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::ENTER)
        .finish();

    let mut client_tables = IndexMap::new();
    client_tables.insert("t".to_string(), client_table("t", "t", &[("name", "name")], &["name"]));
    let client_schema = ClientSchema { tables: client_tables };

    let mut server_tables = IndexMap::new();
    server_tables.insert("t".to_string(), server_table(&[("name", "text")]));
    let server_schema = ServerSchema::new(server_tables);

    let mut query = bare_query("t");
    query.r#where = Some(Condition::Simple {
        op: SimpleOperator::Eq,
        left: ValuePosition::Column { name: "name".into() },
        right: ValuePosition::Literal { value: json!(42) },
    });

    tracing::subscriber::with_default(subscriber, || {
        compile(&server_schema, &client_schema, &query, &OutputFormat::default(), &Default::default()).unwrap();
    });

    let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(log.contains("compile"), "compile span did not fire:\n{log}");
    assert!(
        log.contains("numeric literal compared against a text column"),
        "surprising-coercion trace did not fire:\n{log}"
    );
}
