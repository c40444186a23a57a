//! Knobs owned by the compiler itself, as opposed to a deployment.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Collation used for every text/uuid/enum comparison and ORDER BY.
    pub collation: String,
    /// Name of the single output column.
    pub root_alias: String,
    /// The extractor's bigint safety threshold (2^53 - 1 by default).
    pub safe_integer_bound: i64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            collation: "ucs_basic".to_string(),
            root_alias: "zql_result".to_string(),
            safe_integer_bound: 9_007_199_254_740_991,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_matches_spec_constants() {
        let cfg = CompilerConfig::default();
        assert_eq!(cfg.collation, "ucs_basic");
        assert_eq!(cfg.root_alias, "zql_result");
        assert_eq!(cfg.safe_integer_bound, 9_007_199_254_740_991);
    }

    #[test]
    fn deserializes_with_partial_overrides() {
        let cfg: CompilerConfig = serde_json::from_str(r#"{"root_alias":"result"}"#).unwrap();
        assert_eq!(cfg.root_alias, "result");
        assert_eq!(cfg.collation, "ucs_basic");
    }
}
