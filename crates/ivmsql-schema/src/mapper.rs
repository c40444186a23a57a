//! Bidirectional client <-> server identifier translation.
//!
//! Every identifier the compiler emits flows through a [`NameMapper`] —
//! the compiler never writes a raw client name into SQL text, and the
//! result extractor never has to guess a server name back into a client
//! one because the mapper already carries the inverse lookup.

use crate::client::ClientSchema;
use crate::error::MapperError;
use indexmap::IndexMap;
use ivmsql_sql::QualifiedIdentifier;

/// A precomputed client<->server lookup built once per [`ClientSchema`].
///
/// Building this is the only "cache derived from read-only input" the
/// compiler keeps (see the concurrency model): it never mutates after
/// construction, so a single `NameMapper` can be shared across threads
/// compiling different queries against the same schema concurrently.
#[derive(Debug)]
pub struct NameMapper {
    table_to_server: IndexMap<String, QualifiedIdentifier>,
    column_to_server: IndexMap<(String, String), String>,
    server_table_to_client: IndexMap<String, String>,
    server_column_to_client: IndexMap<(String, String), String>,
}

impl NameMapper {
    /// Build the mapper from a client schema.
    pub fn from_client_schema(schema: &ClientSchema) -> Self {
        let mut table_to_server = IndexMap::new();
        let mut column_to_server = IndexMap::new();
        let mut server_table_to_client = IndexMap::new();
        let mut server_column_to_client = IndexMap::new();

        for table in schema.tables.values() {
            let qi = QualifiedIdentifier::parse_server_name(&table.server_name);
            server_table_to_client.insert(table.server_name.clone(), table.name.clone());
            table_to_server.insert(table.name.clone(), qi);

            for column in table.columns.values() {
                column_to_server.insert(
                    (table.name.clone(), column.name.clone()),
                    column.server_name.clone(),
                );
                server_column_to_client.insert(
                    (table.name.clone(), column.server_name.clone()),
                    column.name.clone(),
                );
            }
        }

        Self {
            table_to_server,
            column_to_server,
            server_table_to_client,
            server_column_to_client,
        }
    }

    /// Resolve a client table name to its physical server identifier.
    pub fn table_name(&self, client_table: &str) -> Result<&QualifiedIdentifier, MapperError> {
        self.table_to_server
            .get(client_table)
            .ok_or_else(|| MapperError::UnknownTable(client_table.to_string()))
    }

    /// Resolve a client column name (within a client table) to its
    /// physical server column name.
    pub fn column_name(&self, client_table: &str, client_column: &str) -> Result<&str, MapperError> {
        self.column_to_server
            .get(&(client_table.to_string(), client_column.to_string()))
            .map(|s| s.as_str())
            .ok_or_else(|| MapperError::UnknownColumn {
                table: client_table.to_string(),
                column: client_column.to_string(),
            })
    }

    /// Inverse of [`Self::table_name`]: map a server table name back to
    /// its client name. Used by the result extractor's roundtrip checks.
    pub fn server_to_client_table(&self, server_table_name: &str) -> Option<&str> {
        self.server_table_to_client
            .get(server_table_name)
            .map(|s| s.as_str())
    }

    /// Inverse of [`Self::column_name`].
    pub fn server_to_client_column(&self, client_table: &str, server_column: &str) -> Option<&str> {
        self.server_column_to_client
            .get(&(client_table.to_string(), server_column.to_string()))
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Cardinality, ClientColumn, ClientRelationship, ClientTable};
    use pretty_assertions::assert_eq;

    fn sample_schema() -> ClientSchema {
        let mut columns = IndexMap::new();
        columns.insert("id".into(), ClientColumn::same("id"));
        columns.insert("issueId".into(), ClientColumn::new("issueId", "issue_id"));

        let mut relationships = IndexMap::new();
        relationships.insert(
            "comments".into(),
            ClientRelationship {
                source_field: vec!["id".into()],
                dest_field: vec!["issueId".into()],
                dest_table: "comment".into(),
                cardinality: Cardinality::Many,
            },
        );

        let table = ClientTable {
            name: "issue".into(),
            server_name: "alt.issues".into(),
            columns,
            primary_key: vec!["id".into()],
            relationships,
        };

        let mut tables = IndexMap::new();
        tables.insert("issue".into(), table);
        ClientSchema { tables }
    }

    #[test]
    fn table_name_resolves_schema_qualified_server_name() {
        let mapper = NameMapper::from_client_schema(&sample_schema());
        let qi = mapper.table_name("issue").unwrap();
        assert_eq!(qi.schema, "alt");
        assert_eq!(qi.name, "issues");
    }

    #[test]
    fn column_name_resolves_renamed_column() {
        let mapper = NameMapper::from_client_schema(&sample_schema());
        assert_eq!(mapper.column_name("issue", "issueId").unwrap(), "issue_id");
    }

    #[test]
    fn unknown_table_is_an_error() {
        let mapper = NameMapper::from_client_schema(&sample_schema());
        let err = mapper.table_name("nope").unwrap_err();
        assert_eq!(err, MapperError::UnknownTable("nope".into()));
    }

    #[test]
    fn server_to_client_roundtrips() {
        let mapper = NameMapper::from_client_schema(&sample_schema());
        assert_eq!(mapper.server_to_client_table("alt.issues"), Some("issue"));
        assert_eq!(
            mapper.server_to_client_column("issue", "issue_id"),
            Some("issueId")
        );
    }
}
