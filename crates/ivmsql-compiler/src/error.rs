//! Compiler errors: structural AST problems and coercion failures.
//!
//! `UnrecognizedOperator` from the wire protocol never reaches a
//! [`CompileError`] variant here — `SimpleOperator`/`ExistsOperator` are
//! closed Rust enums, so serde rejects an unknown operator string at
//! deserialization, before the compiler ever sees the AST. See
//! DESIGN.md for why this is a deliberate narrowing rather than a gap.

use ivmsql_schema::MapperError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("static parameter not bound: anchor={anchor} field={field}")]
    StaticParameterNotBound { anchor: String, field: String },

    #[error("invalid relationship `{name}`: {reason}")]
    InvalidRelationship { name: String, reason: String },

    #[error("correlation arity mismatch: parent has {parent_len} field(s), child has {child_len}")]
    CorrelationArityMismatch { parent_len: usize, child_len: usize },

    #[error("unknown table `{table}`")]
    UnknownTable { table: String },

    #[error("unknown column `{column}` on table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("invalid literal for `{column}`: {reason}")]
    InvalidLiteral { column: String, reason: String },

    #[error("value `{value}` is not a member of enum type `{pg_type}`")]
    MismatchedEnumValue { value: String, pg_type: String },
}

impl CompileError {
    /// Stable machine-readable code, in the teacher's `PGRST###` style.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StaticParameterNotBound { .. } => "IVMC101",
            Self::InvalidRelationship { .. } => "IVMC102",
            Self::CorrelationArityMismatch { .. } => "IVMC103",
            Self::UnknownTable { .. } => "IVMC104",
            Self::UnknownColumn { .. } => "IVMC105",
            Self::InvalidLiteral { .. } => "IVMC106",
            Self::MismatchedEnumValue { .. } => "IVMC107",
        }
    }
}

impl From<MapperError> for CompileError {
    fn from(err: MapperError) -> Self {
        match err {
            MapperError::UnknownTable(table) => Self::UnknownTable { table },
            MapperError::UnknownColumn { table, column } => Self::UnknownColumn { table, column },
        }
    }
}
