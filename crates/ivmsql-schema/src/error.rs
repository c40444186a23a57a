//! Name-mapper errors.

use thiserror::Error;

/// Errors raised while translating client identifiers to server ones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("unknown column: {table}.{column}")]
    UnknownColumn { table: String, column: String },
}

impl MapperError {
    /// Stable machine-readable code, in the teacher's `PGRST###` style.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTable(_) => "IVMC301",
            Self::UnknownColumn { .. } => "IVMC302",
        }
    }
}
