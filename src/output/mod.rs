//! Output formatting for analysis results.

mod json;
mod report;

pub use json::{to_json, to_json_pretty};
pub use report::{format_report, format_table};
