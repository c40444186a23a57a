//! The query AST the compiler consumes.
//!
//! Every node is a tagged variant (`#[serde(tag = "type")]`) matched
//! exhaustively by the compiler — no node is ever downcast or probed by
//! field presence.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A query against one client table, possibly with nested relationships.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Query {
    pub table: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "where", default)]
    pub r#where: Option<Condition>,
    #[serde(rename = "orderBy", default)]
    pub order_by: Vec<OrderTerm>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub start: Option<Start>,
    #[serde(default)]
    pub related: Vec<Relationship>,
    /// Opaque caller metadata; never inspected by the compiler.
    #[serde(default)]
    pub system: Option<JsonValue>,
}

/// A correlated subquery reference hanging off a parent [`Query`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Relationship {
    pub correlation: Correlation,
    pub subquery: Query,
    /// True when this relationship exists only to reach a further one
    /// (a junction hop); its own rows never surface in the output.
    #[serde(default)]
    pub hidden: bool,
}

/// Equal-length, positionally zipped field lists relating a parent row
/// to a child row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Correlation {
    #[serde(rename = "parentField")]
    pub parent_field: Vec<String>,
    #[serde(rename = "childField")]
    pub child_field: Vec<String>,
}

/// A filter condition, tagged by kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    #[serde(rename = "and")]
    And { conditions: Vec<Condition> },
    #[serde(rename = "or")]
    Or { conditions: Vec<Condition> },
    #[serde(rename = "simple")]
    Simple {
        op: SimpleOperator,
        left: ValuePosition,
        right: ValuePosition,
    },
    #[serde(rename = "correlatedSubquery")]
    CorrelatedSubquery {
        op: ExistsOperator,
        related: Box<Relationship>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExistsOperator {
    #[serde(rename = "EXISTS")]
    Exists,
    #[serde(rename = "NOT EXISTS")]
    NotExists,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "ILIKE")]
    ILike,
    #[serde(rename = "NOT ILIKE")]
    NotILike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "IS NOT")]
    IsNot,
}

/// One side of a `simple` condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ValuePosition {
    #[serde(rename = "column")]
    Column { name: String },
    #[serde(rename = "literal")]
    Literal { value: JsonValue },
    /// A parameter that must be bound by the caller before compilation;
    /// reaching this in the compiler is always a caller bug.
    #[serde(rename = "static")]
    Static { anchor: String, field: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: String,
    pub direction: OrderDirection,
}

/// A cursor: a partial row plus whether the boundary row itself matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Start {
    pub row: indexmap::IndexMap<String, JsonValue>,
    pub exclusive: bool,
}
