//! Result extraction (spec component 6): turns the compiler's raw
//! `zql_result` text column into a `serde_json::Value`, guaranteeing
//! that no integer silently loses precision on the way out.

mod error;
mod extract;

pub use error::ExtractError;
pub use extract::{extract, Row};
