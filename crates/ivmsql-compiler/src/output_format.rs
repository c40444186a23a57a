//! Per-alias recursion shape: singular object vs. array, for the root
//! and for every nested relationship.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OutputFormat {
    #[serde(default)]
    pub singular: bool,
    #[serde(default)]
    pub relationships: HashMap<String, OutputFormat>,
}

impl OutputFormat {
    /// The format for a named nested relationship, defaulting to plural
    /// (a `json_agg` array) when the caller hasn't described it.
    pub fn child(&self, alias: &str) -> OutputFormat {
        self.relationships.get(alias).cloned().unwrap_or_default()
    }
}
