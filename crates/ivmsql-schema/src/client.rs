//! Client-side schema: the names and relationships the query AST is
//! expressed against, before the name mapper rewrites them to physical
//! server identifiers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Relationship cardinality, as declared by the client schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    One,
    Many,
}

/// A declared relationship from one client table to another.
///
/// `source_field`/`dest_field` are equal-length, order-zipped lists of
/// client column names — the same shape as an AST `Correlation` — because
/// a relationship's correlation in the AST is expected to match one of
/// these declarations (the compiler does not invent correlations).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientRelationship {
    pub source_field: Vec<String>,
    pub dest_field: Vec<String>,
    pub dest_table: String,
    pub cardinality: Cardinality,
}

/// A client-visible column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientColumn {
    pub name: String,
    pub server_name: String,
}

impl ClientColumn {
    pub fn new(name: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_name: server_name.into(),
        }
    }

    /// A column whose client and server names are identical.
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            server_name: name.clone(),
            name,
        }
    }
}

/// A client-visible table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientTable {
    pub name: String,
    /// Physical server name; may be schema-qualified (`alt.user`).
    pub server_name: String,
    pub columns: IndexMap<String, ClientColumn>,
    pub primary_key: Vec<String>,
    pub relationships: IndexMap<String, ClientRelationship>,
}

impl ClientTable {
    pub fn column(&self, client_name: &str) -> Option<&ClientColumn> {
        self.columns.get(client_name)
    }

    pub fn relationship(&self, name: &str) -> Option<&ClientRelationship> {
        self.relationships.get(name)
    }
}

/// The full client-visible schema: every table the AST may reference.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClientSchema {
    pub tables: IndexMap<String, ClientTable>,
}

impl ClientSchema {
    pub fn table(&self, client_name: &str) -> Option<&ClientTable> {
        self.tables.get(client_name)
    }
}
