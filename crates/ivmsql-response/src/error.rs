//! Extractor errors (`IVMX###`), mirroring the compiler's `IVMC###`
//! scheme (spec §7).

/// Errors raised while decoding a compiled query's result.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("expected exactly one result row, found {found}")]
    UnexpectedRowCount { found: usize },

    #[error("malformed zql_result JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{} = {value}", format_path(path))]
    ValueOutOfSafeRange { path: Vec<String>, value: String },
}

/// Renders a path as `[2]['comments'][1]['hash']`: array indices and
/// object keys concatenated with no separator between segments.
pub(crate) fn format_path(path: &[String]) -> String {
    path.concat()
}

impl ExtractError {
    /// The stable, machine-readable error code (spec §7/§11).
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedRowCount { .. } => "IVMX101",
            Self::Json(_) => "IVMX102",
            Self::ValueOutOfSafeRange { .. } => "IVMX103",
        }
    }
}
