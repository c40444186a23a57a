//! Server-side schema: the physical PostgreSQL shape the compiler targets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A physical column descriptor as seen by PostgreSQL.
///
/// `pg_type` is the physical type name (`text`, `uuid`, `timestamp with
/// time zone`, `numeric`, `int8`, `jsonb`, or an enum type name) — the
/// coercer (`ivmsql-compiler::coerce`) dispatches on this string to decide
/// how a literal compared against the column must be cast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerColumn {
    pub pg_type: String,
    #[serde(default)]
    pub is_enum: bool,
    #[serde(default)]
    pub is_array: bool,
    /// Valid labels when `is_enum`; empty means membership isn't checked
    /// at compile time (left to PostgreSQL's own enum cast to reject).
    #[serde(default)]
    pub enum_values: Vec<String>,
}

impl ServerColumn {
    pub fn new(pg_type: impl Into<String>) -> Self {
        Self {
            pg_type: pg_type.into(),
            is_enum: false,
            is_array: false,
            enum_values: Vec::new(),
        }
    }

    pub fn enum_type(pg_type: impl Into<String>, enum_values: Vec<String>) -> Self {
        Self {
            pg_type: pg_type.into(),
            is_enum: true,
            is_array: false,
            enum_values,
        }
    }

    pub fn array_of(pg_type: impl Into<String>) -> Self {
        Self {
            pg_type: pg_type.into(),
            is_enum: false,
            is_array: true,
            enum_values: Vec::new(),
        }
    }
}

/// `table -> column -> descriptor`, keyed by the exact server table name
/// a [`crate::client::ClientTable::server_name`] resolves to.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerSchema {
    tables: IndexMap<String, IndexMap<String, ServerColumn>>,
}

impl ServerSchema {
    pub fn new(tables: IndexMap<String, IndexMap<String, ServerColumn>>) -> Self {
        Self { tables }
    }

    /// Look up a column descriptor by server table and column name.
    pub fn column(&self, server_table: &str, server_column: &str) -> Option<&ServerColumn> {
        self.tables.get(server_table)?.get(server_column)
    }

    pub fn has_table(&self, server_table: &str) -> bool {
        self.tables.contains_key(server_table)
    }
}
